pub mod directory_thumbnail_source;
pub mod openai_compatible_provider;
