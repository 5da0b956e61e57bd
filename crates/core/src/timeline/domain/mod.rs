pub mod fingerprint;
pub mod range_algebra;
pub mod range_edit_engine;
pub mod timeline;
pub mod timeline_port;
