use super::transcript::TranscriptContext;
use crate::shared::cancellation::CancellationToken;

/// Domain interface for obtaining a transcript for a media asset.
///
/// Implementations may run long external processes; they must honour
/// `cancel` and release any abort listener before returning.
pub trait TranscriptSource: Send + Sync {
    fn transcribe(
        &self,
        asset_id: &str,
        cancel: &CancellationToken,
    ) -> Result<TranscriptContext, Box<dyn std::error::Error + Send + Sync>>;
}
