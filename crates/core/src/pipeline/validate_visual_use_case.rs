use serde::Serialize;

use crate::scoring::domain::score_fusion::{rank, refuse};
use crate::scoring::domain::scores::ScoredSegment;
use crate::scoring::domain::visual_scorer::{VisualCandidate, VisualScorer};
use crate::shared::cancellation::CancellationToken;
use crate::shared::constants::MAX_VISUAL_TOP_N;

use super::highlight_error::HighlightError;
use super::pipeline_context::PipelineContext;
use super::pipeline_logger::{timed, PipelineLogger};

#[derive(Clone, Debug, Default)]
pub struct VisualRequest {
    pub video_asset_id: Option<String>,
    /// Clamped to `1..=20`.
    pub top_n: Option<usize>,
    /// Clamped to `1..=8`.
    pub frame_concurrency: Option<usize>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualResponse {
    pub asset_id: String,
    pub segments: Vec<ScoredSegment>,
    pub candidates: usize,
    pub valid_frames: usize,
    #[serde(skip)]
    pub degraded: bool,
    #[serde(skip)]
    pub warnings: Vec<String>,
}

/// Scores the top-ranked candidates' frames and re-ranks the whole list.
pub struct ValidateVisualUseCase<'a> {
    ctx: PipelineContext<'a>,
}

impl<'a> ValidateVisualUseCase<'a> {
    pub fn new(ctx: PipelineContext<'a>) -> Self {
        Self { ctx }
    }

    pub fn run(
        &self,
        request: &VisualRequest,
        cancel: &CancellationToken,
        logger: &mut dyn PipelineLogger,
    ) -> Result<VisualResponse, HighlightError> {
        cancel.check()?;
        let settings = self.ctx.settings;
        let snapshot = self.ctx.snapshot()?;
        let state = self.ctx.scored_state(&snapshot)?;
        let asset_id = match request.video_asset_id.as_deref().or(state.asset_id.as_deref()) {
            Some(id) => id.to_string(),
            None => self.ctx.resolve_asset(None, &snapshot.tracks)?,
        };
        let mut segments = state.scored_segments.unwrap_or_default();
        let top_n = request
            .top_n
            .unwrap_or(settings.visual_top_n)
            .clamp(1, MAX_VISUAL_TOP_N)
            .min(segments.len());

        let unchanged = |segments: Vec<ScoredSegment>, warning: &str| VisualResponse {
            asset_id: asset_id.clone(),
            segments,
            candidates: 0,
            valid_frames: 0,
            degraded: true,
            warnings: vec![warning.to_string()],
        };
        let (provider, thumbnails) = match (self.ctx.provider, self.ctx.thumbnails) {
            (Some(p), _) if !p.is_available() => {
                return Ok(unchanged(segments, "Vision provider is unavailable; ranking unchanged"))
            }
            (None, _) => {
                return Ok(unchanged(segments, "No vision provider configured; ranking unchanged"))
            }
            (_, None) => {
                return Ok(unchanged(segments, "No thumbnail source configured; ranking unchanged"))
            }
            (Some(p), Some(t)) => (p, t),
        };

        // 1. Frames at each candidate's midpoint
        let mut candidates = Vec::with_capacity(top_n);
        for (i, segment) in segments.iter().take(top_n).enumerate() {
            cancel.check()?;
            let chunk = &segment.chunk;
            let midpoint = (chunk.start_time + chunk.end_time) / 2.0;
            let thumbnail = match thumbnails.thumbnail(&asset_id, midpoint) {
                Ok(t) => t,
                Err(e) => {
                    log::warn!("Thumbnail at {midpoint:.2}s unavailable: {e}");
                    None
                }
            };
            cancel.check()?;
            logger.progress("thumbnail", i + 1, top_n);
            candidates.push(VisualCandidate {
                chunk_index: chunk.index,
                text: chunk.text.clone(),
                thumbnail,
            });
        }

        // 2. Vision scores, bounded concurrency
        let scorer = VisualScorer::new(provider)
            .with_concurrency(request.frame_concurrency.unwrap_or(settings.frame_concurrency))
            .with_temperature(settings.provider.temperature);
        let scores = timed(logger, "visual_score", || scorer.score(&candidates, cancel))?;
        for (segment, visual) in segments.iter_mut().zip(scores) {
            segment.visual_scores = Some(visual);
        }

        // 3. Re-fuse and re-rank everything
        timed(logger, "fuse", || {
            refuse(&mut segments, &settings.weights);
            rank(&mut segments);
        });

        let valid_frames = segments
            .iter()
            .filter(|s| s.visual_scores.is_some_and(|v| v.has_valid_frame))
            .count();
        logger.metric("valid_frames", valid_frames as f64);
        let mut warnings = Vec::new();
        let missing = candidates.iter().filter(|c| c.thumbnail.is_none()).count();
        if missing > 0 {
            warnings.push(format!("{missing} of {top_n} candidates had no thumbnail"));
        }
        let degraded = top_n > 0 && valid_frames == 0;
        if degraded {
            warnings.push("No candidate produced a usable frame score".to_string());
        }

        self.ctx.cache.update(self.ctx.project_id, |state| {
            state.scored_segments = Some(segments.clone());
            state.highlight_plan = None;
            if let Some(record) = state.scoring.as_mut() {
                record.visual_validated = true;
            }
        });

        Ok(VisualResponse {
            asset_id,
            segments,
            candidates: top_n,
            valid_frames,
            degraded,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use crate::pipeline::score_highlights_use_case::{ScoreHighlightsUseCase, ScoreRequest};
    use crate::pipeline::test_fixtures::{Fixture, StubProvider};
    use crate::timeline::domain::timeline::{TimelineElement, Track, TrackKind};

    fn score(fixture: &Fixture) {
        ScoreHighlightsUseCase::new(fixture.context())
            .run(
                &ScoreRequest::default(),
                &CancellationToken::new(),
                &mut NullPipelineLogger,
            )
            .unwrap();
    }

    fn validate(fixture: &Fixture, request: &VisualRequest) -> Result<VisualResponse, HighlightError> {
        ValidateVisualUseCase::new(fixture.context()).run(
            request,
            &CancellationToken::new(),
            &mut NullPipelineLogger,
        )
    }

    #[test]
    fn test_not_scored() {
        let fixture = Fixture::new();
        let err = validate(&fixture, &VisualRequest::default()).unwrap_err();
        assert_eq!(err.code(), "HIGHLIGHTS_NOT_SCORED");
    }

    #[test]
    fn test_stale_scores() {
        let fixture = Fixture::new();
        score(&fixture);
        fixture.timeline.set_tracks(vec![Track::new(
            "main",
            TrackKind::Video,
            vec![TimelineElement::media("a", "clip", 0.0, 90.0)],
        )]);

        let err = validate(&fixture, &VisualRequest::default()).unwrap_err();
        assert_eq!(err, HighlightError::ScoresStale);
    }

    #[test]
    fn test_top_n_candidates_get_visual_scores() {
        let fixture = Fixture::new();
        score(&fixture);

        let response = validate(
            &fixture,
            &VisualRequest {
                top_n: Some(3),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(response.candidates, 3);
        assert_eq!(response.valid_frames, 3);
        assert_eq!(fixture.provider.vision_calls(), 3);
        assert_eq!(
            response
                .segments
                .iter()
                .filter(|s| s.visual_scores.is_some())
                .count(),
            3
        );
        for (i, segment) in response.segments.iter().enumerate() {
            assert_eq!(segment.rank, i + 1);
        }
        let cached = fixture.cache.get("project").unwrap();
        assert!(cached.scoring.unwrap().visual_validated);
        assert!(cached.highlight_plan.is_none());
    }

    #[test]
    fn test_top_n_is_clamped() {
        let fixture = Fixture::new();
        score(&fixture);

        let response = validate(
            &fixture,
            &VisualRequest {
                top_n: Some(0),
                frame_concurrency: Some(99),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(response.candidates, 1);
    }

    #[test]
    fn test_unavailable_provider_is_degraded_success() {
        let mut fixture = Fixture::new();
        score(&fixture);
        fixture.provider = StubProvider::unavailable();

        let response = validate(&fixture, &VisualRequest::default()).unwrap();

        assert!(response.degraded);
        assert!(response.segments.iter().all(|s| s.visual_scores.is_none()));
        assert_eq!(fixture.provider.vision_calls(), 0);
    }
}
