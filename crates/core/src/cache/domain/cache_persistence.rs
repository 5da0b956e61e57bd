use super::highlight_cache::HighlightCacheState;

/// Durable backing for the highlight cache.
///
/// Writes are best effort: an implementation may queue them and report
/// failures through logging only. The in-memory cache stays authoritative.
pub trait CachePersistence: Send + Sync {
    fn load(
        &self,
        project_id: &str,
    ) -> Result<Option<HighlightCacheState>, Box<dyn std::error::Error + Send + Sync>>;

    fn save(&self, project_id: &str, state: &HighlightCacheState);

    fn remove(&self, project_id: &str);
}

/// Keeps nothing; the cache lives only as long as the process.
pub struct NullCachePersistence;

impl CachePersistence for NullCachePersistence {
    fn load(
        &self,
        _project_id: &str,
    ) -> Result<Option<HighlightCacheState>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(None)
    }

    fn save(&self, _project_id: &str, _state: &HighlightCacheState) {}

    fn remove(&self, _project_id: &str) {}
}
