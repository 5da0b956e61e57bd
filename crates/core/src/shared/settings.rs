use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::constants::{
    DEFAULT_AVAILABILITY_TIMEOUT_SECS, DEFAULT_BLOCK_SPAN_SECONDS, DEFAULT_BLOCK_SPEECH_SECONDS,
    DEFAULT_FRAME_CONCURRENCY, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SEGMENT_MAX_SECONDS,
    DEFAULT_SEGMENT_MIN_SECONDS, DEFAULT_SILENCE_GAP_SECONDS, DEFAULT_TARGET_DURATION,
    DEFAULT_TEMPERATURE, DEFAULT_TOLERANCE, DEFAULT_VISUAL_TOP_N,
};
use crate::scoring::domain::score_fusion::WeightProfile;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write settings to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine config directory")]
    NoConfigDir,
}

/// Connection details for an OpenAI-compatible chat endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub base_url: String,
    pub model: String,
    /// Model used for frame scoring; falls back to `model` when empty.
    pub vision_model: String,
    /// Environment variable holding the API key. Local providers need none.
    pub api_key_env: Option<String>,
    pub request_timeout_secs: u64,
    pub availability_timeout_secs: u64,
    pub temperature: f32,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434/v1".to_string(),
            model: "qwen2.5:7b-instruct".to_string(),
            vision_model: "qwen2.5vl:7b".to_string(),
            api_key_env: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            availability_timeout_secs: DEFAULT_AVAILABILITY_TIMEOUT_SECS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightSettings {
    pub provider: ProviderSettings,
    pub weights: WeightProfile,
    pub segment_min_seconds: f64,
    pub segment_max_seconds: f64,
    pub block_speech_seconds: f64,
    pub block_span_seconds: f64,
    pub visual_top_n: usize,
    pub frame_concurrency: usize,
    pub target_duration: f64,
    pub tolerance: f64,
    pub include_hook: bool,
    pub silence_gap_seconds: f64,
    pub cache_dir: Option<PathBuf>,
}

impl Default for HighlightSettings {
    fn default() -> Self {
        Self {
            provider: ProviderSettings::default(),
            weights: WeightProfile::default(),
            segment_min_seconds: DEFAULT_SEGMENT_MIN_SECONDS,
            segment_max_seconds: DEFAULT_SEGMENT_MAX_SECONDS,
            block_speech_seconds: DEFAULT_BLOCK_SPEECH_SECONDS,
            block_span_seconds: DEFAULT_BLOCK_SPAN_SECONDS,
            visual_top_n: DEFAULT_VISUAL_TOP_N,
            frame_concurrency: DEFAULT_FRAME_CONCURRENCY,
            target_duration: DEFAULT_TARGET_DURATION,
            tolerance: DEFAULT_TOLERANCE,
            include_hook: true,
            silence_gap_seconds: DEFAULT_SILENCE_GAP_SECONDS,
            cache_dir: None,
        }
    }
}

impl HighlightSettings {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("HighlightCut").join("settings.json"))
    }

    /// Loads settings from the default location, falling back to defaults
    /// when the file is missing or unreadable.
    pub fn load() -> Self {
        Self::default_path()
            .and_then(|path| match Self::load_from(&path) {
                Ok(settings) => Some(settings),
                Err(SettingsError::Read { .. }) => None,
                Err(e) => {
                    log::warn!("{e}; using default settings");
                    None
                }
            })
            .unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path).map_err(|e| SettingsError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&json).map_err(|e| SettingsError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let write_err = |e| SettingsError::Write {
            path: path.to_path_buf(),
            source: e,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| SettingsError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        fs::write(path, json).map_err(write_err)
    }

    pub fn resolved_cache_dir(&self) -> Option<PathBuf> {
        self.cache_dir
            .clone()
            .or_else(|| dirs::cache_dir().map(|d| d.join("HighlightCut")))
    }
}
