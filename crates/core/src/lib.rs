pub mod cache;
pub mod pipeline;
pub mod scoring;
pub mod selection;
pub mod shared;
pub mod timeline;
pub mod transcript;
