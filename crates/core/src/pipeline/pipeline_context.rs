use crate::cache::domain::highlight_cache::{CacheCheck, HighlightCacheState, HighlightCacheStore};
use crate::scoring::domain::chat_provider::ChatProvider;
use crate::scoring::domain::thumbnail_source::ThumbnailSource;
use crate::shared::cancellation::CancellationToken;
use crate::shared::settings::HighlightSettings;
use crate::timeline::domain::fingerprint::tracks_fingerprint;
use crate::timeline::domain::timeline::Track;
use crate::timeline::domain::timeline_port::TimelinePort;
use crate::transcript::domain::transcript::TranscriptContext;
use crate::transcript::domain::transcript_source::TranscriptSource;

use super::highlight_error::HighlightError;

/// Collaborators shared by every highlight use case for one project.
#[derive(Clone, Copy)]
pub struct PipelineContext<'a> {
    pub project_id: &'a str,
    pub default_asset_id: Option<&'a str>,
    pub timeline: &'a dyn TimelinePort,
    pub transcripts: &'a dyn TranscriptSource,
    pub provider: Option<&'a dyn ChatProvider>,
    pub thumbnails: Option<&'a dyn ThumbnailSource>,
    pub cache: &'a HighlightCacheStore,
    pub settings: &'a HighlightSettings,
}

/// Tracks read at the start of a request, with their fingerprint.
#[derive(Clone, Debug)]
pub struct TimelineSnapshot {
    pub tracks: Vec<Track>,
    pub fingerprint: String,
}

impl<'a> PipelineContext<'a> {
    pub fn snapshot(&self) -> Result<TimelineSnapshot, HighlightError> {
        let tracks = self.timeline.tracks().map_err(HighlightError::timeline)?;
        let fingerprint = tracks_fingerprint(&tracks);
        Ok(TimelineSnapshot {
            tracks,
            fingerprint,
        })
    }

    /// Requested asset, then the project default, then the first media
    /// element on the timeline.
    pub fn resolve_asset(
        &self,
        requested: Option<&str>,
        tracks: &[Track],
    ) -> Result<String, HighlightError> {
        requested
            .filter(|id| !id.trim().is_empty())
            .or(self.default_asset_id)
            .map(str::to_string)
            .or_else(|| {
                tracks
                    .iter()
                    .flat_map(|t| &t.elements)
                    .find_map(|e| e.media_id.clone())
            })
            .ok_or(HighlightError::MissingAsset)
    }

    /// Cached state for the live fingerprint. Stale state has already been
    /// dropped when this returns `Invalidated`.
    pub fn cached_state(&self, snapshot: &TimelineSnapshot) -> CacheCheck {
        self.cache.check(self.project_id, &snapshot.fingerprint)
    }

    /// Fresh state that already holds scored segments.
    pub fn scored_state(
        &self,
        snapshot: &TimelineSnapshot,
    ) -> Result<HighlightCacheState, HighlightError> {
        match self.cached_state(snapshot) {
            CacheCheck::Fresh(state) if state.scored_segments.is_some() => Ok(state),
            CacheCheck::Invalidated => Err(HighlightError::ScoresStale),
            _ => Err(HighlightError::NotScored),
        }
    }

    /// Transcript for `asset_id`, served from the cache when the same asset
    /// was transcribed for this timeline.
    pub fn transcript(
        &self,
        asset_id: &str,
        fingerprint: &str,
        cancel: &CancellationToken,
    ) -> Result<TranscriptContext, HighlightError> {
        if let Some(cached) = self.cache.transcript(self.project_id, fingerprint, asset_id) {
            log::debug!("Using cached transcript for asset {asset_id}");
            return Ok(cached);
        }
        cancel.check()?;
        let transcript = self.transcripts.transcribe(asset_id, cancel).map_err(|e| {
            if cancel.is_cancelled() {
                HighlightError::Cancelled
            } else {
                HighlightError::TranscriptionFailed(e.to_string())
            }
        })?;
        cancel.check()?;
        self.cache
            .store_transcript(self.project_id, fingerprint, asset_id, transcript.clone());
        Ok(transcript)
    }
}
