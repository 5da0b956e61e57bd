use std::sync::Mutex;

use crate::timeline::domain::timeline::Track;
use crate::timeline::domain::timeline_port::TimelinePort;

/// Timeline held in memory, for embedding and tests.
#[derive(Debug, Default)]
pub struct InMemoryTimeline {
    tracks: Mutex<Vec<Track>>,
    selection: Mutex<Vec<String>>,
    commits: Mutex<usize>,
}

impl InMemoryTimeline {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self {
            tracks: Mutex::new(tracks),
            ..Default::default()
        }
    }

    pub fn selection(&self) -> Vec<String> {
        self.selection
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Number of successful `replace_tracks` calls.
    pub fn commit_count(&self) -> usize {
        self.commits.lock().map(|c| *c).unwrap_or_default()
    }

    /// Replaces tracks directly, bypassing the commit counter.
    pub fn set_tracks(&self, tracks: Vec<Track>) {
        if let Ok(mut guard) = self.tracks.lock() {
            *guard = tracks;
        }
    }
}

impl TimelinePort for InMemoryTimeline {
    fn tracks(&self) -> Result<Vec<Track>, Box<dyn std::error::Error + Send + Sync>> {
        let guard = self.tracks.lock().map_err(|_| "timeline lock poisoned")?;
        Ok(guard.clone())
    }

    fn replace_tracks(
        &self,
        tracks: Vec<Track>,
        selection: Vec<String>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        *self.tracks.lock().map_err(|_| "timeline lock poisoned")? = tracks;
        *self.selection.lock().map_err(|_| "selection lock poisoned")? = selection;
        *self.commits.lock().map_err(|_| "commit lock poisoned")? += 1;
        Ok(())
    }
}
