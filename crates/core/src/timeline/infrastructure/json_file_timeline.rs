use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::timeline::domain::timeline::Track;
use crate::timeline::domain::timeline_port::TimelinePort;

/// On-disk project: identity, source asset and the editable timeline.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDocument {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    #[serde(default)]
    pub tracks: Vec<Track>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selection: Vec<String>,
}

impl ProjectDocument {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let json = fs::read_to_string(path)
            .map_err(|e| format!("failed to read project {}: {e}", path.display()))?;
        let doc = serde_json::from_str(&json)
            .map_err(|e| format!("failed to parse project {}: {e}", path.display()))?;
        Ok(doc)
    }

    /// Writes through a sibling temp file so a crash never truncates the
    /// project.
    pub fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

/// Timeline backed by a [`ProjectDocument`] file. Every read goes to disk so
/// external edits are picked up by the fingerprint check.
#[derive(Debug, Clone)]
pub struct JsonFileTimeline {
    path: PathBuf,
}

impl JsonFileTimeline {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TimelinePort for JsonFileTimeline {
    fn tracks(&self) -> Result<Vec<Track>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(ProjectDocument::load(&self.path)?.tracks)
    }

    fn replace_tracks(
        &self,
        tracks: Vec<Track>,
        selection: Vec<String>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut doc = ProjectDocument::load(&self.path)?;
        doc.tracks = tracks;
        doc.selection = selection;
        doc.save(&self.path)?;
        log::info!("Saved timeline to {}", self.path.display());
        Ok(())
    }
}
