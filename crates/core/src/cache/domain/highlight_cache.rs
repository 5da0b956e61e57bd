use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use super::cache_persistence::{CachePersistence, NullCachePersistence};
use crate::scoring::domain::scores::ScoredSegment;
use crate::scoring::domain::semantic_scorer::SemanticDiagnostics;
use crate::selection::domain::highlight_plan::HighlightPlan;
use crate::transcript::domain::transcript::TranscriptContext;

/// How the cached ranking was produced.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringRecord {
    pub segment_min_seconds: f64,
    pub segment_max_seconds: f64,
    pub used_llm: bool,
    pub degraded: bool,
    pub visual_validated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_diagnostics: Option<SemanticDiagnostics>,
}

/// Per-project highlight artifacts.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightCacheState {
    #[serde(default)]
    pub scored_segments: Option<Vec<ScoredSegment>>,
    #[serde(default)]
    pub highlight_plan: Option<HighlightPlan>,
    #[serde(default)]
    pub asset_id: Option<String>,
    #[serde(default)]
    pub timeline_fingerprint: Option<String>,
    #[serde(default)]
    pub scoring: Option<ScoringRecord>,
    /// Unix epoch milliseconds of the last write.
    #[serde(default)]
    pub updated_at: u64,
}

/// Result of comparing the stored fingerprint with the live timeline.
#[derive(Clone, Debug, PartialEq)]
pub enum CacheCheck {
    Fresh(HighlightCacheState),
    /// A state existed for another timeline and has been dropped.
    Invalidated,
    Empty,
}

#[derive(Default)]
struct Inner {
    states: HashMap<String, HighlightCacheState>,
    /// Projects already looked up in persistence.
    loaded: HashSet<String>,
    transcripts: HashMap<TranscriptKey, TranscriptContext>,
}

/// `(project, timeline fingerprint, asset)`.
type TranscriptKey = (String, String, String);

/// Fingerprint-keyed cache of scored segments, plans and transcripts.
///
/// Every read-modify-write happens under one lock, so callers never observe
/// a half-applied update.
pub struct HighlightCacheStore {
    inner: Mutex<Inner>,
    persistence: Box<dyn CachePersistence>,
}

impl Default for HighlightCacheStore {
    fn default() -> Self {
        Self::new(Box::new(NullCachePersistence))
    }
}

impl HighlightCacheStore {
    pub fn new(persistence: Box<dyn CachePersistence>) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            persistence,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_loaded(&self, inner: &mut Inner, project_id: &str) {
        if !inner.loaded.insert(project_id.to_string()) {
            return;
        }
        match self.persistence.load(project_id) {
            Ok(Some(state)) => {
                log::debug!("Restored highlight cache for project {project_id}");
                inner.states.insert(project_id.to_string(), state);
            }
            Ok(None) => {}
            Err(e) => log::warn!("Failed to restore highlight cache for {project_id}: {e}"),
        }
    }

    /// Compares the stored fingerprint against `fingerprint`, dropping the
    /// stored state on mismatch.
    pub fn check(&self, project_id: &str, fingerprint: &str) -> CacheCheck {
        let mut inner = self.lock();
        self.ensure_loaded(&mut inner, project_id);

        let Some(state) = inner.states.get(project_id) else {
            return CacheCheck::Empty;
        };
        if state.timeline_fingerprint.as_deref() == Some(fingerprint) {
            return CacheCheck::Fresh(state.clone());
        }

        log::info!("Timeline changed for project {project_id}; dropping cached highlights");
        inner.states.remove(project_id);
        inner
            .transcripts
            .retain(|(p, f, _), _| p != project_id || f == fingerprint);
        self.persistence.remove(project_id);
        CacheCheck::Invalidated
    }

    pub fn get(&self, project_id: &str) -> Option<HighlightCacheState> {
        let mut inner = self.lock();
        self.ensure_loaded(&mut inner, project_id);
        inner.states.get(project_id).cloned()
    }

    /// Applies `mutate` to the project's state (created if absent), stamps
    /// it and schedules persistence.
    pub fn update<F>(&self, project_id: &str, mutate: F) -> HighlightCacheState
    where
        F: FnOnce(&mut HighlightCacheState),
    {
        let mut inner = self.lock();
        self.ensure_loaded(&mut inner, project_id);
        let state = inner.states.entry(project_id.to_string()).or_default();
        mutate(state);
        state.updated_at = now_millis();
        let snapshot = state.clone();
        self.persistence.save(project_id, &snapshot);
        snapshot
    }

    pub fn clear(&self, project_id: &str) {
        let mut inner = self.lock();
        inner.states.remove(project_id);
        inner.loaded.insert(project_id.to_string());
        inner.transcripts.retain(|(p, _, _), _| p != project_id);
        self.persistence.remove(project_id);
    }

    pub fn transcript(
        &self,
        project_id: &str,
        fingerprint: &str,
        asset_id: &str,
    ) -> Option<TranscriptContext> {
        let key = (
            project_id.to_string(),
            fingerprint.to_string(),
            asset_id.to_string(),
        );
        self.lock().transcripts.get(&key).cloned()
    }

    /// Stores the asset's transcript for this timeline. Entries the project
    /// held for an older fingerprint are dropped; other assets on the same
    /// timeline are kept.
    pub fn store_transcript(
        &self,
        project_id: &str,
        fingerprint: &str,
        asset_id: &str,
        context: TranscriptContext,
    ) {
        let mut inner = self.lock();
        inner
            .transcripts
            .retain(|(p, f, _), _| p != project_id || f == fingerprint);
        inner.transcripts.insert(
            (
                project_id.to_string(),
                fingerprint.to_string(),
                asset_id.to_string(),
            ),
            context,
        );
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
