use serde::Serialize;

use crate::shared::cancellation::CancellationToken;
use crate::shared::constants::{TIME_EPSILON, TRIM_WORD_PADDING};
use crate::shared::time_range::TimeRange;
use crate::timeline::domain::range_algebra::merge_ranges;
use crate::timeline::domain::range_edit_engine::{RangeEditEngine, TimelineDiff};

use super::highlight_error::HighlightError;
use super::pipeline_context::PipelineContext;
use super::pipeline_logger::{timed, PipelineLogger};

#[derive(Clone, Debug, Default)]
pub struct TrimRequest {
    pub video_asset_id: Option<String>,
    /// Indices into the transcript's word list.
    pub word_indices: Vec<usize>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrimResponse {
    pub diff: TimelineDiff,
    pub words_removed: usize,
}

/// Deletes the selected transcript words from the timeline.
pub struct TrimTranscriptUseCase<'a> {
    ctx: PipelineContext<'a>,
    engine: RangeEditEngine,
}

impl<'a> TrimTranscriptUseCase<'a> {
    pub fn new(ctx: PipelineContext<'a>) -> Self {
        Self {
            ctx,
            engine: RangeEditEngine::default(),
        }
    }

    pub fn run(
        &self,
        request: &TrimRequest,
        cancel: &CancellationToken,
        logger: &mut dyn PipelineLogger,
    ) -> Result<TrimResponse, HighlightError> {
        cancel.check()?;
        if request.word_indices.is_empty() {
            return Err(HighlightError::InvalidArgument(
                "no words selected".to_string(),
            ));
        }
        let snapshot = self.ctx.snapshot()?;
        let asset_id = self
            .ctx
            .resolve_asset(request.video_asset_id.as_deref(), &snapshot.tracks)?;
        let transcript = self
            .ctx
            .transcript(&asset_id, &snapshot.fingerprint, cancel)?;

        let words = &transcript.words;
        let mut ranges = Vec::with_capacity(request.word_indices.len());
        for &index in &request.word_indices {
            let word = words.get(index).ok_or_else(|| {
                HighlightError::InvalidArgument(format!(
                    "word index {index} out of range (transcript has {} words)",
                    words.len()
                ))
            })?;
            ranges.push(TimeRange::new(
                (word.start_time - TRIM_WORD_PADDING).max(0.0),
                word.end_time + TRIM_WORD_PADDING,
            ));
        }
        let deletes = merge_ranges(&ranges, TIME_EPSILON);

        cancel.check()?;
        let outcome = timed(logger, "edit", || {
            self.engine.apply_deletions(&snapshot.tracks, &deletes)
        })?;
        self.ctx
            .timeline
            .replace_tracks(outcome.tracks, Vec::new())
            .map_err(HighlightError::timeline)?;
        logger.info(&format!(
            "Trimmed {} words, {:.2}s removed",
            request.word_indices.len(),
            outcome.diff.removed_duration
        ));

        Ok(TrimResponse {
            diff: outcome.diff,
            words_removed: request.word_indices.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use crate::pipeline::test_fixtures::{hundred_second_transcript, Fixture};
    use crate::timeline::domain::timeline::timeline_duration;
    use crate::timeline::domain::timeline_port::TimelinePort;
    use approx::assert_relative_eq;

    fn trim(fixture: &Fixture, indices: Vec<usize>) -> Result<TrimResponse, HighlightError> {
        TrimTranscriptUseCase::new(fixture.context()).run(
            &TrimRequest {
                word_indices: indices,
                ..Default::default()
            },
            &CancellationToken::new(),
            &mut NullPipelineLogger,
        )
    }

    #[test]
    fn test_trims_padded_words() {
        let fixture = Fixture::new();
        let words = hundred_second_transcript().words;
        let expected: f64 = [0, 1]
            .iter()
            .map(|&i| words[i].duration() + 2.0 * TRIM_WORD_PADDING)
            .sum::<f64>()
            - TRIM_WORD_PADDING;

        let response = trim(&fixture, vec![1, 0]).unwrap();

        assert_eq!(response.words_removed, 2);
        assert_relative_eq!(response.diff.removed_duration, expected, epsilon = 1e-6);
        let tracks = fixture.timeline.tracks().unwrap();
        assert_relative_eq!(timeline_duration(&tracks), 100.0 - expected, epsilon = 1e-6);
        assert!(fixture.timeline.selection().is_empty());
    }

    #[test]
    fn test_empty_selection_is_invalid() {
        let fixture = Fixture::new();
        let err = trim(&fixture, vec![]).unwrap_err();
        assert_eq!(err.code(), "INVALID_ARGUMENT");
        assert_eq!(fixture.transcripts.calls(), 0);
    }

    #[test]
    fn test_out_of_range_index_is_invalid() {
        let fixture = Fixture::new();
        let err = trim(&fixture, vec![0, 10_000]).unwrap_err();
        assert!(matches!(err, HighlightError::InvalidArgument(m) if m.contains("10000")));
        assert_eq!(fixture.timeline.commit_count(), 0);
    }
}
