use thiserror::Error;

use crate::shared::cancellation::Cancelled;
use crate::timeline::domain::range_edit_engine::EditError;

/// Pipeline-level failures. Each maps to a stable code for tool callers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HighlightError {
    #[error("no video asset to analyse")]
    MissingAsset,
    #[error("the video has no usable transcript")]
    NoTranscript,
    #[error("transcription failed: {0}")]
    TranscriptionFailed(String),
    #[error("highlights have not been scored yet; run score_highlights first")]
    NotScored,
    #[error("the timeline changed since highlights were scored; run score_highlights again")]
    ScoresStale,
    #[error("no highlight plan yet; run generate_highlight_plan first")]
    PlanMissing,
    #[error("the timeline changed since the plan was generated; score and plan again")]
    PlanStale,
    #[error("no segments could be selected for the highlight plan")]
    EmptyPlan,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("timeline unavailable: {0}")]
    Timeline(String),
    #[error(transparent)]
    Edit(#[from] EditError),
    #[error("execution cancelled")]
    Cancelled,
}

impl HighlightError {
    pub fn code(&self) -> &'static str {
        match self {
            HighlightError::MissingAsset => "MISSING_ASSET",
            HighlightError::NoTranscript => "NO_TRANSCRIPT",
            HighlightError::TranscriptionFailed(_) => "TRANSCRIPTION_FAILED",
            HighlightError::NotScored => "HIGHLIGHTS_NOT_SCORED",
            HighlightError::ScoresStale => "HIGHLIGHTS_STALE",
            HighlightError::PlanMissing => "PLAN_NOT_GENERATED",
            HighlightError::PlanStale => "PLAN_STALE",
            HighlightError::EmptyPlan => "EMPTY_PLAN",
            HighlightError::InvalidArgument(_) => "INVALID_ARGUMENT",
            HighlightError::Timeline(_) => "TIMELINE_UNAVAILABLE",
            HighlightError::Edit(EditError::NoOp) => "NO_OP_MUTATION",
            HighlightError::Edit(EditError::EmptyTimeline) => "EMPTY_TIMELINE",
            HighlightError::Edit(EditError::InvalidRange(_)) => "INVALID_ARGUMENT",
            HighlightError::Edit(EditError::DurationMismatch { .. }) => "EDIT_VERIFICATION_FAILED",
            HighlightError::Cancelled => "EXECUTION_CANCELLED",
        }
    }

    pub fn timeline(e: impl std::fmt::Display) -> Self {
        HighlightError::Timeline(e.to_string())
    }
}

impl From<Cancelled> for HighlightError {
    fn from(_: Cancelled) -> Self {
        HighlightError::Cancelled
    }
}
