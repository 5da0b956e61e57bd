/// Supplies pre-extracted frames for visual scoring.
///
/// Returns `Ok(None)` when no frame exists near `time_seconds`; frame
/// capture itself happens elsewhere.
pub trait ThumbnailSource: Send + Sync {
    fn thumbnail(
        &self,
        asset_id: &str,
        time_seconds: f64,
    ) -> Result<Option<Vec<u8>>, Box<dyn std::error::Error + Send + Sync>>;
}
