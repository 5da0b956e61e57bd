pub mod transcript;
pub mod transcript_chunk;
pub mod transcript_chunker;
pub mod transcript_source;
