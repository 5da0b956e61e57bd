use std::fs;
use std::path::{Path, PathBuf};

use crate::scoring::domain::thumbnail_source::ThumbnailSource;
use crate::shared::constants::THUMBNAIL_EXTENSIONS;

const DEFAULT_MAX_DISTANCE_SECONDS: f64 = 2.0;

/// Reads frames pre-extracted to `<root>/<asset_id>/<milliseconds>.jpg`.
pub struct DirectoryThumbnailSource {
    root: PathBuf,
    max_distance_seconds: f64,
}

impl DirectoryThumbnailSource {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            max_distance_seconds: DEFAULT_MAX_DISTANCE_SECONDS,
        }
    }

    pub fn with_max_distance(mut self, seconds: f64) -> Self {
        self.max_distance_seconds = seconds.max(0.0);
        self
    }

    /// Frames available for `asset_id`, as (timestamp in seconds, path).
    fn frames(&self, asset_id: &str) -> std::io::Result<Vec<(f64, PathBuf)>> {
        let dir = self.root.join(asset_id);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut frames = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            let is_jpeg = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| THUMBNAIL_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
            if !is_jpeg {
                continue;
            }
            let millis = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<u64>().ok());
            if let Some(ms) = millis {
                frames.push((ms as f64 / 1000.0, path));
            }
        }
        Ok(frames)
    }
}

impl ThumbnailSource for DirectoryThumbnailSource {
    fn thumbnail(
        &self,
        asset_id: &str,
        time_seconds: f64,
    ) -> Result<Option<Vec<u8>>, Box<dyn std::error::Error + Send + Sync>> {
        let nearest = self
            .frames(asset_id)?
            .into_iter()
            .map(|(t, path)| ((t - time_seconds).abs(), path))
            .filter(|(distance, _)| *distance <= self.max_distance_seconds)
            .min_by(|a, b| a.0.total_cmp(&b.0));

        match nearest {
            Some((_, path)) => Ok(Some(fs::read(&path)?)),
            None => {
                log::debug!("No frame for {asset_id} near {time_seconds:.2}s");
                Ok(None)
            }
        }
    }
}
