pub mod in_memory_timeline;
pub mod json_file_timeline;
