/// Tolerance used when comparing timeline positions, in seconds.
pub const TIME_EPSILON: f64 = 1e-3;

pub const DEFAULT_SEGMENT_MIN_SECONDS: f64 = 4.0;
pub const DEFAULT_SEGMENT_MAX_SECONDS: f64 = 20.0;
pub const SEGMENT_MIN_SECONDS_RANGE: (f64, f64) = (0.5, 30.0);
pub const SEGMENT_MAX_SECONDS_RANGE: (f64, f64) = (2.0, 120.0);

pub const DEFAULT_TARGET_DURATION: f64 = 60.0;
pub const DEFAULT_TOLERANCE: f64 = 0.15;
pub const MAX_TOLERANCE: f64 = 0.5;

/// A hook must beat the opening segment's hook potential by at least this much.
pub const HOOK_PROMOTION_MARGIN: f64 = 2.0;

pub const DEFAULT_BLOCK_SPEECH_SECONDS: f64 = 90.0;
pub const DEFAULT_BLOCK_SPAN_SECONDS: f64 = 180.0;
pub const MAX_FAILED_SAMPLES: usize = 3;

pub const DEFAULT_VISUAL_TOP_N: usize = 5;
pub const MAX_VISUAL_TOP_N: usize = 20;
pub const DEFAULT_FRAME_CONCURRENCY: usize = 4;
pub const FRAME_CONCURRENCY_RANGE: (usize, usize) = (1, 8);

pub const DEFAULT_SILENCE_GAP_SECONDS: f64 = 0.6;
pub const TRIM_WORD_PADDING: f64 = 0.02;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_AVAILABILITY_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

pub const WHISPER_BINARY: &str = "whisper";
pub const THUMBNAIL_EXTENSIONS: &[&str] = &["jpg", "jpeg"];
