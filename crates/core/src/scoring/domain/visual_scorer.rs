use super::chat_provider::{ChatMessage, ChatProvider, ChatRequest, ModelHint};
use super::scores::VisualScores;
use crate::shared::cancellation::{CancellationToken, Cancelled};
use crate::shared::constants::{
    DEFAULT_FRAME_CONCURRENCY, DEFAULT_TEMPERATURE, FRAME_CONCURRENCY_RANGE,
};
use crate::shared::lenient_json::{decode_object, number_field};
use crate::shared::worker_pool::run_bounded;

const SYSTEM_PROMPT: &str = "You judge video frames for a highlight reel. Reply with a JSON \
object {\"frameQuality\": number, \"visualInterest\": number}, both between 0 and 1. \
frameQuality covers focus, exposure and framing; visualInterest covers how engaging the \
moment looks.";

/// One segment queued for frame scoring.
#[derive(Clone, Debug, PartialEq)]
pub struct VisualCandidate {
    pub chunk_index: usize,
    pub text: String,
    /// JPEG bytes, if a frame could be extracted.
    pub thumbnail: Option<Vec<u8>>,
}

/// Scores candidate frames with a VLM on a bounded worker pool.
pub struct VisualScorer<'a> {
    provider: &'a dyn ChatProvider,
    concurrency: usize,
    temperature: f32,
}

impl<'a> VisualScorer<'a> {
    pub fn new(provider: &'a dyn ChatProvider) -> Self {
        Self {
            provider,
            concurrency: DEFAULT_FRAME_CONCURRENCY,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    /// Sets the worker count, clamped into the supported range.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        let (min, max) = FRAME_CONCURRENCY_RANGE;
        self.concurrency = concurrency.clamp(min, max);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Scores every candidate, returning results in input order.
    ///
    /// A candidate never drops out: a missing frame or an unusable response
    /// yields [`VisualScores::invalid`].
    pub fn score(
        &self,
        candidates: &[VisualCandidate],
        cancel: &CancellationToken,
    ) -> Result<Vec<VisualScores>, Cancelled> {
        cancel.check()?;
        let results = run_bounded(candidates, self.concurrency, cancel, |_, candidate| {
            self.score_one(candidate)
        });
        cancel.check()?;

        Ok(results
            .into_iter()
            .map(|r| r.unwrap_or_else(VisualScores::invalid))
            .collect())
    }

    fn score_one(&self, candidate: &VisualCandidate) -> VisualScores {
        let Some(jpeg) = &candidate.thumbnail else {
            log::debug!("Chunk {} has no thumbnail", candidate.chunk_index);
            return VisualScores::invalid();
        };

        let request = ChatRequest {
            messages: vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user_with_image(
                    format!("Transcript at this moment: {}", candidate.text),
                    jpeg.clone(),
                ),
            ],
            tools: Vec::new(),
            temperature: Some(self.temperature),
            model_hint: ModelHint::Vision,
        };

        let content = match self.provider.chat(&request) {
            Ok(response) => response.content.unwrap_or_default(),
            Err(e) => {
                log::warn!("Visual scoring failed for chunk {}: {e}", candidate.chunk_index);
                return VisualScores::invalid();
            }
        };

        match parse_visual_scores(&content) {
            Some(scores) => scores,
            None => {
                log::warn!(
                    "Unusable visual scores for chunk {}: {content:?}",
                    candidate.chunk_index
                );
                VisualScores::invalid()
            }
        }
    }
}

fn parse_visual_scores(content: &str) -> Option<VisualScores> {
    let object: serde_json::Value = decode_object(content).ok()?;
    VisualScores::checked(
        number_field(&object, &["frameQuality", "frame_quality"])?,
        number_field(&object, &["visualInterest", "visual_interest"])?,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::domain::chat_provider::{ChatResponse, ContentPart};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    /// Answers based on the first byte of the attached image.
    struct ByteKeyedProvider {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl ByteKeyedProvider {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    impl ChatProvider for ByteKeyedProvider {
        fn chat(
            &self,
            request: &ChatRequest,
        ) -> Result<ChatResponse, Box<dyn std::error::Error + Send + Sync>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(5));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            assert_eq!(request.model_hint, ModelHint::Vision);
            let key = request
                .messages
                .iter()
                .flat_map(|m| m.parts.iter())
                .find_map(|p| match p {
                    ContentPart::JpegImage(bytes) => bytes.first().copied(),
                    _ => None,
                })
                .unwrap_or(0);
            let content = match key {
                1 => r#"{"frameQuality": 0.8, "visualInterest": 0.6}"#,
                2 => "```json\n{\"frame_quality\": \"0.5\", \"visual_interest\": 0.5}\n```",
                3 => r#"{"frameQuality": 1.7, "visualInterest": 0.2}"#,
                4 => return Err("vlm timed out".into()),
                _ => "I cannot see anything",
            };
            Ok(ChatResponse {
                content: Some(content.to_string()),
                ..Default::default()
            })
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    fn candidate(index: usize, key: Option<u8>) -> VisualCandidate {
        VisualCandidate {
            chunk_index: index,
            text: format!("segment {index}"),
            thumbnail: key.map(|k| vec![k, 0xD8]),
        }
    }

    #[test]
    fn test_valid_and_invalid_responses() {
        let provider = ByteKeyedProvider::new();
        let scorer = VisualScorer::new(&provider);
        let candidates = vec![
            candidate(0, Some(1)),
            candidate(1, Some(2)),
            candidate(2, Some(3)),
            candidate(3, Some(4)),
            candidate(4, Some(9)),
            candidate(5, None),
        ];

        let scores = scorer.score(&candidates, &CancellationToken::new()).unwrap();

        assert_eq!(scores.len(), 6);
        assert!(scores[0].has_valid_frame);
        assert_eq!(scores[0].frame_quality, 0.8);
        assert!(scores[1].has_valid_frame);
        assert_eq!(scores[1].frame_quality, 0.5);
        for s in &scores[2..] {
            assert!(!s.has_valid_frame);
            assert_eq!(s.frame_quality, 0.0);
            assert_eq!(s.visual_interest, 0.0);
        }
        // Candidate without a thumbnail never reaches the provider.
        assert_eq!(provider.calls.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_each_candidate_scored_once_within_concurrency() {
        let provider = ByteKeyedProvider::new();
        let scorer = VisualScorer::new(&provider).with_concurrency(2);
        let candidates: Vec<_> = (0..9).map(|i| candidate(i, Some(1))).collect();

        let scores = scorer.score(&candidates, &CancellationToken::new()).unwrap();

        assert_eq!(scores.len(), 9);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 9);
        assert!(provider.peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn test_concurrency_is_clamped() {
        let provider = ByteKeyedProvider::new();
        assert_eq!(VisualScorer::new(&provider).with_concurrency(0).concurrency(), 1);
        assert_eq!(VisualScorer::new(&provider).with_concurrency(64).concurrency(), 8);
        assert_eq!(VisualScorer::new(&provider).concurrency(), 4);
    }

    #[test]
    fn test_cancelled_returns_err() {
        let provider = ByteKeyedProvider::new();
        let scorer = VisualScorer::new(&provider);
        let token = CancellationToken::new();
        token.cancel();

        assert!(scorer.score(&[candidate(0, Some(1))], &token).is_err());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }
}
