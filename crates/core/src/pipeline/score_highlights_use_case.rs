use std::collections::HashMap;

use serde::Serialize;

use crate::cache::domain::highlight_cache::{CacheCheck, HighlightCacheState, ScoringRecord};
use crate::scoring::domain::rule_scorer::score_chunk;
use crate::scoring::domain::score_fusion::{fuse, rank};
use crate::scoring::domain::scores::{RuleScores, ScoredSegment, SemanticScores};
use crate::scoring::domain::semantic_scorer::{SemanticDiagnostics, SemanticScorer};
use crate::shared::cancellation::CancellationToken;
use crate::shared::constants::TIME_EPSILON;
use crate::shared::settings::HighlightSettings;
use crate::transcript::domain::transcript_chunk::TranscriptChunk;
use crate::transcript::domain::transcript_chunker::TranscriptChunker;

use super::highlight_error::HighlightError;
use super::pipeline_context::PipelineContext;
use super::pipeline_logger::{timed, PipelineLogger};

#[derive(Clone, Debug, Default)]
pub struct ScoreRequest {
    pub video_asset_id: Option<String>,
    pub segment_min_seconds: Option<f64>,
    pub segment_max_seconds: Option<f64>,
    /// Defaults to true.
    pub use_llm: Option<bool>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResponse {
    pub asset_id: String,
    pub segments: Vec<ScoredSegment>,
    pub from_cache: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<SemanticDiagnostics>,
    #[serde(skip)]
    pub degraded: bool,
    #[serde(skip)]
    pub warnings: Vec<String>,
}

/// Chunks the transcript, scores every chunk and stores the ranking.
pub struct ScoreHighlightsUseCase<'a> {
    ctx: PipelineContext<'a>,
}

impl<'a> ScoreHighlightsUseCase<'a> {
    pub fn new(ctx: PipelineContext<'a>) -> Self {
        Self { ctx }
    }

    pub fn run(
        &self,
        request: &ScoreRequest,
        cancel: &CancellationToken,
        logger: &mut dyn PipelineLogger,
    ) -> Result<ScoreResponse, HighlightError> {
        cancel.check()?;
        let settings = self.ctx.settings;
        let snapshot = self.ctx.snapshot()?;
        let asset_id = self
            .ctx
            .resolve_asset(request.video_asset_id.as_deref(), &snapshot.tracks)?;
        let chunker = TranscriptChunker::new(
            Some(request.segment_min_seconds.unwrap_or(settings.segment_min_seconds)),
            Some(request.segment_max_seconds.unwrap_or(settings.segment_max_seconds)),
        );
        let use_llm = request.use_llm.unwrap_or(true);

        // 1. Reuse a fresh ranking produced with the same options
        if let CacheCheck::Fresh(state) = self.ctx.cached_state(&snapshot) {
            if let Some(response) = reusable(&state, &asset_id, &chunker, use_llm) {
                logger.info(&format!(
                    "Reusing {} cached scored segments for {asset_id}",
                    response.segments.len()
                ));
                return Ok(response);
            }
        }

        // 2. Transcript and chunks
        let transcript = self
            .ctx
            .transcript(&asset_id, &snapshot.fingerprint, cancel)?;
        if transcript.is_empty() {
            return Err(HighlightError::NoTranscript);
        }
        let chunks = timed(logger, "chunk", || chunker.chunk(&transcript));
        if chunks.is_empty() {
            return Err(HighlightError::NoTranscript);
        }
        logger.metric("chunks", chunks.len() as f64);

        // 3. Rule features
        let rule_scores: Vec<_> = timed(logger, "rule_score", || {
            chunks
                .iter()
                .map(|c| score_chunk(c, &transcript.words))
                .collect()
        });

        // 4. Semantic scores, degrading to rule-only on any provider trouble
        let mut warnings = Vec::new();
        let mut degraded = false;
        let mut diagnostics = None;
        let mut semantic = HashMap::new();
        if use_llm {
            match self.ctx.provider {
                Some(provider) if provider.is_available() => {
                    let scorer = SemanticScorer::new(provider)
                        .with_budgets(settings.block_speech_seconds, settings.block_span_seconds)
                        .with_temperature(settings.provider.temperature);
                    let outcome = timed(logger, "semantic_score", || scorer.score(&chunks, cancel))?;
                    let d = &outcome.diagnostics;
                    logger.metric("semantic_failed_blocks", d.failed_blocks as f64);
                    if d.all_failed {
                        degraded = true;
                        warnings.push(format!(
                            "Semantic scoring failed for all {} blocks; ranking uses rule scores only",
                            d.total_blocks
                        ));
                    } else if d.failed_blocks > 0 {
                        warnings.push(format!(
                            "Semantic scoring failed for {} of {} blocks",
                            d.failed_blocks, d.total_blocks
                        ));
                    }
                    semantic = outcome.scores;
                    diagnostics = Some(outcome.diagnostics);
                }
                Some(_) => {
                    degraded = true;
                    warnings.push(
                        "LLM provider is unavailable; ranking uses rule scores only".to_string(),
                    );
                }
                None => {
                    degraded = true;
                    warnings.push(
                        "No LLM provider configured; ranking uses rule scores only".to_string(),
                    );
                }
            }
        }
        cancel.check()?;

        // 5. Fuse and rank
        let segments = timed(logger, "fuse", || {
            fuse_all(chunks, rule_scores, &semantic, settings)
        });

        // 6. Store; any previous plan was built from another ranking
        let record = ScoringRecord {
            segment_min_seconds: chunker.min_seconds(),
            segment_max_seconds: chunker.max_seconds(),
            used_llm: use_llm,
            degraded,
            visual_validated: false,
            semantic_diagnostics: diagnostics.clone(),
        };
        self.ctx.cache.update(self.ctx.project_id, |state| {
            state.scored_segments = Some(segments.clone());
            state.highlight_plan = None;
            state.asset_id = Some(asset_id.clone());
            state.timeline_fingerprint = Some(snapshot.fingerprint.clone());
            state.scoring = Some(record);
        });
        logger.info(&format!(
            "Scored {} segments for {asset_id}{}",
            segments.len(),
            if degraded { " (degraded)" } else { "" }
        ));

        Ok(ScoreResponse {
            asset_id,
            segments,
            from_cache: false,
            diagnostics,
            degraded,
            warnings,
        })
    }
}

fn fuse_all(
    chunks: Vec<TranscriptChunk>,
    rule_scores: Vec<RuleScores>,
    semantic: &HashMap<usize, SemanticScores>,
    settings: &HighlightSettings,
) -> Vec<ScoredSegment> {
    let mut segments: Vec<ScoredSegment> = chunks
        .into_iter()
        .zip(rule_scores)
        .map(|(chunk, rule_scores)| {
            let semantic_scores = semantic.get(&chunk.index).copied();
            let combined_score = fuse(
                &rule_scores,
                semantic_scores.as_ref(),
                None,
                &settings.weights,
            );
            ScoredSegment {
                chunk,
                rule_scores,
                semantic_scores,
                visual_scores: None,
                combined_score,
                rank: 0,
            }
        })
        .collect();
    rank(&mut segments);
    segments
}

/// A cached ranking is reused when it came from the same asset and chunk
/// bounds, and from the same LLM choice without having degraded.
fn reusable(
    state: &HighlightCacheState,
    asset_id: &str,
    chunker: &TranscriptChunker,
    use_llm: bool,
) -> Option<ScoreResponse> {
    let segments = state.scored_segments.as_ref()?;
    let record = state.scoring.as_ref()?;
    let same_options = state.asset_id.as_deref() == Some(asset_id)
        && (record.segment_min_seconds - chunker.min_seconds()).abs() < TIME_EPSILON
        && (record.segment_max_seconds - chunker.max_seconds()).abs() < TIME_EPSILON
        && record.used_llm == use_llm;
    if !same_options || record.degraded {
        return None;
    }
    Some(ScoreResponse {
        asset_id: asset_id.to_string(),
        segments: segments.clone(),
        from_cache: true,
        diagnostics: record.semantic_diagnostics.clone(),
        degraded: false,
        warnings: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::pipeline_logger::{NullPipelineLogger, StdoutPipelineLogger};
    use crate::pipeline::test_fixtures::{Fixture, StubProvider, StubTranscriptSource};
    use crate::timeline::domain::timeline::{TimelineElement, Track, TrackKind};
    use crate::transcript::domain::transcript::TranscriptContext;

    fn run(fixture: &Fixture, request: &ScoreRequest) -> Result<ScoreResponse, HighlightError> {
        ScoreHighlightsUseCase::new(fixture.context()).run(
            request,
            &CancellationToken::new(),
            &mut NullPipelineLogger,
        )
    }

    #[test]
    fn test_scores_and_ranks_every_chunk() {
        let fixture = Fixture::new();
        let mut logger = StdoutPipelineLogger::new();

        let response = ScoreHighlightsUseCase::new(fixture.context())
            .run(&ScoreRequest::default(), &CancellationToken::new(), &mut logger)
            .unwrap();

        assert_eq!(response.asset_id, "clip");
        assert_eq!(response.segments.len(), 10);
        assert!(!response.degraded);
        assert!(!response.from_cache);
        for (i, segment) in response.segments.iter().enumerate() {
            assert_eq!(segment.rank, i + 1);
            assert!(segment.semantic_scores.is_some());
            assert!((0.0..=100.0).contains(&segment.combined_score));
        }
        for pair in response.segments.windows(2) {
            assert!(pair[0].combined_score >= pair[1].combined_score);
        }
        for stage in ["chunk", "rule_score", "semantic_score", "fuse"] {
            assert!(logger.timings_for(stage).is_some(), "missing {stage}");
        }
        let diagnostics = response.diagnostics.unwrap();
        assert_eq!(diagnostics.failed_blocks, 0);
    }

    #[test]
    fn test_rescoring_unchanged_timeline_reuses_cache() {
        let fixture = Fixture::new();
        run(&fixture, &ScoreRequest::default()).unwrap();
        let calls = fixture.provider.text_calls();
        assert!(calls > 0);

        let again = run(&fixture, &ScoreRequest::default()).unwrap();

        assert!(again.from_cache);
        assert_eq!(fixture.provider.text_calls(), calls);
        assert_eq!(fixture.transcripts.calls(), 1);
    }

    #[test]
    fn test_second_asset_on_same_timeline_is_transcribed() {
        let fixture = Fixture::new();
        let rule_only = |asset: &str| ScoreRequest {
            video_asset_id: Some(asset.to_string()),
            use_llm: Some(false),
            ..Default::default()
        };
        run(&fixture, &rule_only("clip")).unwrap();

        let other = run(&fixture, &rule_only("other-video")).unwrap();

        assert_eq!(other.asset_id, "other-video");
        assert!(!other.from_cache);
        assert_eq!(fixture.transcripts.assets(), vec!["clip", "other-video"]);

        run(&fixture, &rule_only("clip")).unwrap();
        assert_eq!(fixture.transcripts.calls(), 2);
    }

    #[test]
    fn test_timeline_mutation_forces_rescore() {
        let fixture = Fixture::new();
        run(&fixture, &ScoreRequest::default()).unwrap();
        let calls = fixture.provider.text_calls();

        fixture.timeline.set_tracks(vec![Track::new(
            "main",
            TrackKind::Video,
            vec![TimelineElement::media("a", "clip", 0.0, 100.0)],
        )]);
        let again = run(&fixture, &ScoreRequest::default()).unwrap();

        assert!(!again.from_cache);
        assert!(fixture.provider.text_calls() > calls);
    }

    #[test]
    fn test_changed_chunk_bounds_bypass_cache() {
        let fixture = Fixture::new();
        run(&fixture, &ScoreRequest::default()).unwrap();

        let again = run(
            &fixture,
            &ScoreRequest {
                segment_max_seconds: Some(5.0),
                ..Default::default()
            },
        )
        .unwrap();

        assert!(!again.from_cache);
        assert!(again.segments.len() > 10);
        assert!(again.segments.iter().all(|s| s.chunk.duration() <= 5.0 + 1e-6));
    }

    #[test]
    fn test_unavailable_provider_degrades_to_rule_only() {
        let mut fixture = Fixture::new();
        fixture.provider = StubProvider::unavailable();

        let response = run(&fixture, &ScoreRequest::default()).unwrap();

        assert!(response.degraded);
        assert_eq!(response.warnings.len(), 1);
        assert!(response.segments.iter().all(|s| s.semantic_scores.is_none()));
        assert_eq!(fixture.provider.text_calls(), 0);
    }

    #[test]
    fn test_use_llm_false_is_not_degraded() {
        let fixture = Fixture::new();
        let response = run(
            &fixture,
            &ScoreRequest {
                use_llm: Some(false),
                ..Default::default()
            },
        )
        .unwrap();

        assert!(!response.degraded);
        assert!(response.warnings.is_empty());
        assert_eq!(fixture.provider.text_calls(), 0);
    }

    #[test]
    fn test_degraded_ranking_is_retried() {
        let mut fixture = Fixture::new();
        fixture.provider = StubProvider::unavailable();
        run(&fixture, &ScoreRequest::default()).unwrap();

        fixture.provider = StubProvider::new();
        let again = run(&fixture, &ScoreRequest::default()).unwrap();

        assert!(!again.from_cache);
        assert!(!again.degraded);
        assert!(fixture.provider.text_calls() > 0);
    }

    #[test]
    fn test_missing_asset() {
        let fixture = Fixture::new();
        fixture.timeline.set_tracks(vec![Track::new(
            "captions",
            TrackKind::Text,
            vec![TimelineElement::caption("t", "hi", 0.0, 5.0)],
        )]);

        let err = run(&fixture, &ScoreRequest::default()).unwrap_err();
        assert_eq!(err, HighlightError::MissingAsset);
    }

    #[test]
    fn test_empty_transcript() {
        let mut fixture = Fixture::new();
        fixture.transcripts = StubTranscriptSource::new(TranscriptContext::default());

        let err = run(&fixture, &ScoreRequest::default()).unwrap_err();
        assert_eq!(err.code(), "NO_TRANSCRIPT");
    }

    #[test]
    fn test_transcription_failure() {
        let mut fixture = Fixture::new();
        fixture.transcripts = StubTranscriptSource::failing();

        let err = run(&fixture, &ScoreRequest::default()).unwrap_err();
        assert!(matches!(err, HighlightError::TranscriptionFailed(m) if m.contains("whisper")));
    }

    #[test]
    fn test_cancelled_during_semantic_scoring() {
        let fixture = Fixture::new();
        let cancel = CancellationToken::new();
        *fixture.provider.cancel_on_call.lock().unwrap() = Some(cancel.clone());

        let err = ScoreHighlightsUseCase::new(fixture.context())
            .run(&ScoreRequest::default(), &cancel, &mut NullPipelineLogger)
            .unwrap_err();

        assert_eq!(err, HighlightError::Cancelled);
        assert!(fixture.cache.get("project").is_none());
    }
}
