use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::chat_provider::{ChatMessage, ChatProvider, ChatRequest, ModelHint};
use super::scores::SemanticScores;
use crate::shared::cancellation::{CancellationToken, Cancelled};
use crate::shared::constants::{
    DEFAULT_BLOCK_SPAN_SECONDS, DEFAULT_BLOCK_SPEECH_SECONDS, DEFAULT_TEMPERATURE,
    MAX_FAILED_SAMPLES,
};
use crate::shared::lenient_json::{decode_array, number_field};
use crate::transcript::domain::transcript_chunk::TranscriptChunk;

const SYSTEM_PROMPT: &str = "You rate transcript excerpts of a long video for use in a short \
highlight reel. For every numbered excerpt return one JSON object with the integer fields \
\"index\", \"importance\", \"emotionalIntensity\", \"hookPotential\" and \"standalone\", each \
score between 1 and 10. Respond with a JSON array only.";

/// Outcome counters for one semantic scoring pass.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticDiagnostics {
    pub total_blocks: usize,
    pub failed_blocks: usize,
    /// First few failure descriptions, for surfacing to the user.
    pub failed_samples: Vec<String>,
    pub all_failed: bool,
}

impl SemanticDiagnostics {
    fn record_failure(&mut self, sample: String) {
        log::warn!("Semantic scoring block failed: {sample}");
        self.failed_blocks += 1;
        if self.failed_samples.len() < MAX_FAILED_SAMPLES {
            self.failed_samples.push(sample);
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SemanticOutcome {
    /// Sparse: a missing chunk index means no semantic opinion.
    pub scores: HashMap<usize, SemanticScores>,
    pub diagnostics: SemanticDiagnostics,
}

/// Scores chunks with an LLM, one sequential request per block.
pub struct SemanticScorer<'a> {
    provider: &'a dyn ChatProvider,
    block_speech_seconds: f64,
    block_span_seconds: f64,
    temperature: f32,
}

impl<'a> SemanticScorer<'a> {
    pub fn new(provider: &'a dyn ChatProvider) -> Self {
        Self {
            provider,
            block_speech_seconds: DEFAULT_BLOCK_SPEECH_SECONDS,
            block_span_seconds: DEFAULT_BLOCK_SPAN_SECONDS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_budgets(mut self, speech_seconds: f64, span_seconds: f64) -> Self {
        if speech_seconds.is_finite() && speech_seconds > 0.0 {
            self.block_speech_seconds = speech_seconds;
        }
        if span_seconds.is_finite() && span_seconds > 0.0 {
            self.block_span_seconds = span_seconds;
        }
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Greedy forward grouping. A block closes before a chunk that would push
    /// either its speech total or its wall-clock span past the budget; a
    /// single oversized chunk still forms its own block.
    pub fn blocks<'c>(&self, chunks: &'c [TranscriptChunk]) -> Vec<&'c [TranscriptChunk]> {
        let mut blocks = Vec::new();
        let mut start = 0;
        let mut speech = 0.0;
        for (i, chunk) in chunks.iter().enumerate() {
            if i > start {
                let span = chunk.end_time - chunks[start].start_time;
                if speech + chunk.duration() > self.block_speech_seconds
                    || span > self.block_span_seconds
                {
                    blocks.push(&chunks[start..i]);
                    start = i;
                    speech = 0.0;
                }
            }
            speech += chunk.duration();
        }
        if start < chunks.len() {
            blocks.push(&chunks[start..]);
        }
        blocks
    }

    pub fn score(
        &self,
        chunks: &[TranscriptChunk],
        cancel: &CancellationToken,
    ) -> Result<SemanticOutcome, Cancelled> {
        cancel.check()?;
        let blocks = self.blocks(chunks);
        let mut outcome = SemanticOutcome::default();
        outcome.diagnostics.total_blocks = blocks.len();

        for (block_index, block) in blocks.iter().enumerate() {
            cancel.check()?;
            let result = self.provider.chat(&self.request_for(block));
            cancel.check()?;

            let label = block_label(block_index, block);
            let content = match result {
                Ok(response) => response.content.unwrap_or_default(),
                Err(e) => {
                    outcome.diagnostics.record_failure(format!("{label}: {e}"));
                    continue;
                }
            };
            match parse_block_scores(&content, block) {
                Ok(scores) => {
                    log::debug!("{label}: {} chunks scored", scores.len());
                    outcome.scores.extend(scores);
                }
                Err(reason) => outcome.diagnostics.record_failure(format!("{label}: {reason}")),
            }
        }

        let d = &mut outcome.diagnostics;
        d.all_failed = d.total_blocks > 0 && d.failed_blocks == d.total_blocks;
        Ok(outcome)
    }

    fn request_for(&self, block: &[TranscriptChunk]) -> ChatRequest {
        let excerpts: Vec<String> = block
            .iter()
            .map(|c| {
                format!(
                    "[{}] ({:.1}s-{:.1}s) {}",
                    c.index, c.start_time, c.end_time, c.text
                )
            })
            .collect();
        ChatRequest {
            messages: vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(excerpts.join("\n")),
            ],
            tools: Vec::new(),
            temperature: Some(self.temperature),
            model_hint: ModelHint::Text,
        }
    }
}

fn block_label(block_index: usize, block: &[TranscriptChunk]) -> String {
    match (block.first(), block.last()) {
        (Some(first), Some(last)) => format!(
            "block {block_index} ({:.1}s-{:.1}s)",
            first.start_time, last.end_time
        ),
        _ => format!("block {block_index}"),
    }
}

/// Extracts per-chunk scores, keeping only indices that belong to `block`.
fn parse_block_scores(
    content: &str,
    block: &[TranscriptChunk],
) -> Result<HashMap<usize, SemanticScores>, String> {
    let entries: Vec<serde_json::Value> = decode_array(content).map_err(|e| e.to_string())?;

    let mut scores = HashMap::new();
    for entry in &entries {
        let Some(index) = number_field(entry, &["index", "chunkIndex", "chunk_index"]) else {
            continue;
        };
        if index < 0.0 || index.fract() != 0.0 {
            continue;
        }
        let index = index as usize;
        if !block.iter().any(|c| c.index == index) {
            continue;
        }
        let axes = (
            number_field(entry, &["importance"]),
            number_field(entry, &["emotionalIntensity", "emotional_intensity"]),
            number_field(entry, &["hookPotential", "hook_potential"]),
            number_field(entry, &["standalone"]),
        );
        if let (Some(i), Some(e), Some(h), Some(s)) = axes {
            scores.insert(index, SemanticScores::clamped(i, e, h, s));
        }
    }

    if scores.is_empty() {
        return Err("no usable scores in response".to_string());
    }
    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::domain::chat_provider::ChatResponse;
    use std::sync::Mutex;

    /// Replays canned responses in order and counts calls.
    struct ScriptedProvider {
        responses: Mutex<Vec<Result<String, String>>>,
        calls: Mutex<usize>,
    }

    impl ScriptedProvider {
        fn new(responses: Vec<Result<&str, &str>>) -> Self {
            Self {
                responses: Mutex::new(
                    responses
                        .into_iter()
                        .rev()
                        .map(|r| r.map(str::to_string).map_err(str::to_string))
                        .collect(),
                ),
                calls: Mutex::new(0),
            }
        }
    }

    impl ChatProvider for ScriptedProvider {
        fn chat(
            &self,
            _: &ChatRequest,
        ) -> Result<ChatResponse, Box<dyn std::error::Error + Send + Sync>> {
            *self.calls.lock().unwrap() += 1;
            match self.responses.lock().unwrap().pop() {
                Some(Ok(content)) => Ok(ChatResponse {
                    content: Some(content),
                    ..Default::default()
                }),
                Some(Err(e)) => Err(e.into()),
                None => Err("no scripted response".into()),
            }
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    fn chunk(index: usize, start: f64, end: f64) -> TranscriptChunk {
        TranscriptChunk {
            index,
            start_time: start,
            end_time: end,
            text: format!("chunk {index}"),
            word_count: 2,
        }
    }

    fn entry(index: usize, hook: u32) -> String {
        format!(
            r#"{{"index": {index}, "importance": 5, "emotionalIntensity": 6, "hookPotential": {hook}, "standalone": 7}}"#
        )
    }

    #[test]
    fn test_blocks_close_on_speech_budget() {
        let provider = ScriptedProvider::new(vec![]);
        let scorer = SemanticScorer::new(&provider).with_budgets(25.0, 1000.0);
        let chunks: Vec<_> = (0..5)
            .map(|i| chunk(i, i as f64 * 10.0, i as f64 * 10.0 + 10.0))
            .collect();

        let blocks = scorer.blocks(&chunks);

        let sizes: Vec<usize> = blocks.iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn test_blocks_close_on_span_budget() {
        let provider = ScriptedProvider::new(vec![]);
        let scorer = SemanticScorer::new(&provider).with_budgets(1000.0, 50.0);
        // Short chunks far apart: speech stays small but span grows.
        let chunks = vec![chunk(0, 0.0, 5.0), chunk(1, 30.0, 35.0), chunk(2, 60.0, 65.0)];

        let blocks = scorer.blocks(&chunks);

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].len(), 2);
    }

    #[test]
    fn test_oversized_chunk_forms_own_block() {
        let provider = ScriptedProvider::new(vec![]);
        let scorer = SemanticScorer::new(&provider).with_budgets(10.0, 10.0);
        let chunks = vec![chunk(0, 0.0, 30.0)];
        assert_eq!(scorer.blocks(&chunks).len(), 1);
    }

    #[test]
    fn test_scores_parsed_and_clamped() {
        let response = format!("[{}, {}]", entry(0, 12), entry(1, 3));
        let provider = ScriptedProvider::new(vec![Ok(response.as_str())]);
        let scorer = SemanticScorer::new(&provider);
        let chunks = vec![chunk(0, 0.0, 5.0), chunk(1, 5.0, 10.0)];

        let outcome = scorer.score(&chunks, &CancellationToken::new()).unwrap();

        assert_eq!(outcome.scores.len(), 2);
        assert_eq!(outcome.scores[&0].hook_potential, 10.0);
        assert_eq!(outcome.scores[&1].hook_potential, 3.0);
        assert_eq!(outcome.diagnostics.failed_blocks, 0);
        assert!(!outcome.diagnostics.all_failed);
    }

    #[test]
    fn test_indices_outside_block_are_ignored() {
        let response = format!("[{}, {}]", entry(0, 5), entry(42, 5));
        let provider = ScriptedProvider::new(vec![Ok(response.as_str())]);
        let scorer = SemanticScorer::new(&provider);

        let outcome = scorer
            .score(&[chunk(0, 0.0, 5.0)], &CancellationToken::new())
            .unwrap();

        assert_eq!(outcome.scores.len(), 1);
        assert!(!outcome.scores.contains_key(&42));
    }

    #[test]
    fn test_failed_block_is_skipped_not_fatal() {
        let good = format!("Here you go:\n```json\n[{}]\n```", entry(1, 8));
        let provider = ScriptedProvider::new(vec![Err("timeout"), Ok(good.as_str())]);
        let scorer = SemanticScorer::new(&provider).with_budgets(5.0, 1000.0);
        let chunks = vec![chunk(0, 0.0, 5.0), chunk(1, 5.0, 10.0)];

        let outcome = scorer.score(&chunks, &CancellationToken::new()).unwrap();

        assert_eq!(outcome.diagnostics.total_blocks, 2);
        assert_eq!(outcome.diagnostics.failed_blocks, 1);
        assert!(outcome.diagnostics.failed_samples[0].contains("timeout"));
        assert!(!outcome.scores.contains_key(&0));
        assert_eq!(outcome.scores[&1].hook_potential, 8.0);
    }

    #[test]
    fn test_all_failed_and_samples_capped() {
        let provider = ScriptedProvider::new(vec![Ok(""), Ok("no json here"), Err("x"), Ok("[]")]);
        let scorer = SemanticScorer::new(&provider).with_budgets(5.0, 1000.0);
        let chunks: Vec<_> = (0..4)
            .map(|i| chunk(i, i as f64 * 5.0, i as f64 * 5.0 + 5.0))
            .collect();

        let outcome = scorer.score(&chunks, &CancellationToken::new()).unwrap();

        assert!(outcome.scores.is_empty());
        assert_eq!(outcome.diagnostics.failed_blocks, 4);
        assert_eq!(outcome.diagnostics.failed_samples.len(), MAX_FAILED_SAMPLES);
        assert!(outcome.diagnostics.all_failed);
    }

    #[test]
    fn test_cancelled_before_any_call() {
        let provider = ScriptedProvider::new(vec![Ok("[]")]);
        let scorer = SemanticScorer::new(&provider);
        let token = CancellationToken::new();
        token.cancel();

        assert!(scorer.score(&[chunk(0, 0.0, 5.0)], &token).is_err());
        assert_eq!(*provider.calls.lock().unwrap(), 0);
    }

    #[test]
    fn test_blocks_are_sequential_one_call_each() {
        let responses: Vec<String> = (0..3).map(|i| format!("[{}]", entry(i, 5))).collect();
        let provider =
            ScriptedProvider::new(responses.iter().map(|s| Ok(s.as_str())).collect());
        let scorer = SemanticScorer::new(&provider).with_budgets(5.0, 1000.0);
        let chunks: Vec<_> = (0..3)
            .map(|i| chunk(i, i as f64 * 5.0, i as f64 * 5.0 + 5.0))
            .collect();

        let outcome = scorer.score(&chunks, &CancellationToken::new()).unwrap();

        assert_eq!(*provider.calls.lock().unwrap(), 3);
        assert_eq!(outcome.scores.len(), 3);
    }
}
