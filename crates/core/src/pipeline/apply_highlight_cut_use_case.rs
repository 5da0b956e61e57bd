use serde::Serialize;

use crate::cache::domain::highlight_cache::CacheCheck;
use crate::selection::domain::highlight_plan::HighlightPlan;
use crate::shared::cancellation::CancellationToken;
use crate::shared::constants::TIME_EPSILON;
use crate::shared::time_range::TimeRange;
use crate::timeline::domain::range_algebra::{merge_ranges, ripple_position, total_duration};
use crate::timeline::domain::range_edit_engine::{RangeEditEngine, TimelineDiff};
use crate::timeline::domain::timeline::{TimelineElement, Track, TrackKind};
use crate::transcript::domain::transcript::TranscriptWord;

use super::highlight_error::HighlightError;
use super::pipeline_context::{PipelineContext, TimelineSnapshot};
use super::pipeline_logger::{timed, PipelineLogger};

pub const CAPTION_TRACK_ID: &str = "highlight-captions";

#[derive(Clone, Debug, Default)]
pub struct ApplyRequest {
    pub add_captions: Option<bool>,
    pub remove_silence: Option<bool>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyResponse {
    pub diff: TimelineDiff,
    pub plan_duration: f64,
    pub silence_removed_seconds: f64,
    pub captions_added: usize,
    #[serde(skip)]
    pub warnings: Vec<String>,
}

/// Cuts the timeline down to the cached plan and commits the result.
pub struct ApplyHighlightCutUseCase<'a> {
    ctx: PipelineContext<'a>,
    engine: RangeEditEngine,
}

impl<'a> ApplyHighlightCutUseCase<'a> {
    pub fn new(ctx: PipelineContext<'a>) -> Self {
        Self {
            ctx,
            engine: RangeEditEngine::default(),
        }
    }

    pub fn run(
        &self,
        request: &ApplyRequest,
        cancel: &CancellationToken,
        logger: &mut dyn PipelineLogger,
    ) -> Result<ApplyResponse, HighlightError> {
        cancel.check()?;
        let snapshot = self.ctx.snapshot()?;
        let (plan, asset_id) = match self.ctx.cached_state(&snapshot) {
            CacheCheck::Fresh(state) => match state.highlight_plan {
                Some(plan) => (plan, state.asset_id),
                None => return Err(HighlightError::PlanMissing),
            },
            CacheCheck::Invalidated => return Err(HighlightError::PlanStale),
            CacheCheck::Empty => return Err(HighlightError::PlanMissing),
        };
        if plan.is_empty() {
            return Err(HighlightError::EmptyPlan);
        }

        let mut warnings = Vec::new();
        let plan_keep = merge_ranges(&plan.keep_ranges(), TIME_EPSILON);
        let keep = if request.remove_silence.unwrap_or(false) {
            self.without_silences(&plan_keep, asset_id.as_deref(), &snapshot, cancel, &mut warnings)?
        } else {
            plan_keep.clone()
        };
        let silence_removed_seconds = (total_duration(&plan_keep) - total_duration(&keep)).max(0.0);

        cancel.check()?;
        let outcome = timed(logger, "edit", || {
            self.engine.apply_keep_ranges(&snapshot.tracks, &keep)
        })?;
        let mut tracks = outcome.tracks;

        let mut selection = Vec::new();
        if request.add_captions.unwrap_or(false) {
            let captions = caption_track(&plan, &outcome.diff.deleted_ranges);
            selection = captions.elements.iter().map(|e| e.id.clone()).collect();
            tracks.retain(|t| t.id != CAPTION_TRACK_ID);
            tracks.push(captions);
        }
        let captions_added = selection.len();

        cancel.check()?;
        self.ctx
            .timeline
            .replace_tracks(tracks, selection)
            .map_err(HighlightError::timeline)?;
        logger.info(&format!(
            "Applied highlight cut: {:.1}s -> {:.1}s",
            outcome.diff.original_duration, outcome.diff.final_duration
        ));

        Ok(ApplyResponse {
            diff: outcome.diff,
            plan_duration: plan.actual_duration,
            silence_removed_seconds,
            captions_added,
            warnings,
        })
    }

    fn without_silences(
        &self,
        keep: &[TimeRange],
        asset_id: Option<&str>,
        snapshot: &TimelineSnapshot,
        cancel: &CancellationToken,
        warnings: &mut Vec<String>,
    ) -> Result<Vec<TimeRange>, HighlightError> {
        let asset_id = match asset_id {
            Some(id) => id.to_string(),
            None => self.ctx.resolve_asset(None, &snapshot.tracks)?,
        };
        let transcript = self
            .ctx
            .transcript(&asset_id, &snapshot.fingerprint, cancel)?;
        if !transcript.has_word_timings() {
            warnings.push("Transcript has no word timings; silence was kept".to_string());
            return Ok(keep.to_vec());
        }
        Ok(remove_silences(
            keep,
            &transcript.words,
            self.ctx.settings.silence_gap_seconds,
        ))
    }
}

/// Splits each keep range around word gaps longer than `min_gap`. Ranges
/// with no words inside are kept whole.
pub fn remove_silences(keep: &[TimeRange], words: &[TranscriptWord], min_gap: f64) -> Vec<TimeRange> {
    let mut result = Vec::new();
    for range in keep {
        let mut voiced: Vec<TimeRange> = words
            .iter()
            .filter_map(|w| w.range().intersection(range))
            .collect();
        if voiced.is_empty() {
            result.push(*range);
            continue;
        }
        voiced.sort_by(|a, b| a.start.total_cmp(&b.start));

        let mut cursor = range.start;
        let mut piece_start = range.start;
        for word in &voiced {
            if word.start - cursor > min_gap {
                if cursor > piece_start {
                    result.push(TimeRange::new(piece_start, cursor));
                }
                piece_start = word.start;
            }
            cursor = cursor.max(word.end);
        }
        if range.end - cursor > min_gap {
            result.push(TimeRange::new(piece_start, cursor));
        } else {
            result.push(TimeRange::new(piece_start, range.end));
        }
    }
    merge_ranges(&result, TIME_EPSILON)
}

/// One caption per plan segment, placed where the segment lands after the
/// cut.
fn caption_track(plan: &HighlightPlan, deleted: &[TimeRange]) -> Track {
    let elements = plan
        .segments
        .iter()
        .filter_map(|segment| {
            let start = ripple_position(segment.start_time, deleted);
            let end = ripple_position(segment.end_time, deleted);
            (end - start > TIME_EPSILON).then(|| {
                TimelineElement::caption(
                    &format!("caption-{}", segment.chunk_index),
                    &segment.text,
                    start,
                    end - start,
                )
            })
        })
        .collect();
    Track::new(CAPTION_TRACK_ID, TrackKind::Text, elements)
}
