pub mod cache_persistence;
pub mod highlight_cache;
