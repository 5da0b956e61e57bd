use super::timeline::Track;

/// The editor timeline as seen by the highlight pipeline.
///
/// `replace_tracks` is the only mutation surface: edits are computed on a
/// snapshot from `tracks` and committed in one call. `selection` lists the
/// element ids the editor should select afterwards.
pub trait TimelinePort: Send + Sync {
    fn tracks(&self) -> Result<Vec<Track>, Box<dyn std::error::Error + Send + Sync>>;

    fn replace_tracks(
        &self,
        tracks: Vec<Track>,
        selection: Vec<String>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
