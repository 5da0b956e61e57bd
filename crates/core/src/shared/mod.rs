pub mod cancellation;
pub mod constants;
pub mod lenient_json;
pub mod settings;
pub mod time_range;
pub mod worker_pool;
