pub mod json_file_cache_persistence;
