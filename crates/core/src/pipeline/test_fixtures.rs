//! Stub collaborators shared by the pipeline use case tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::cache::domain::highlight_cache::HighlightCacheStore;
use crate::scoring::domain::chat_provider::{ChatProvider, ChatRequest, ChatResponse, ModelHint};
use crate::scoring::domain::thumbnail_source::ThumbnailSource;
use crate::shared::cancellation::CancellationToken;
use crate::shared::settings::HighlightSettings;
use crate::timeline::domain::timeline::{TimelineElement, Track, TrackKind};
use crate::timeline::infrastructure::in_memory_timeline::InMemoryTimeline;
use crate::transcript::domain::transcript::{
    TranscriptContext, TranscriptSegment, TranscriptSourceKind, TranscriptWord,
};
use crate::transcript::domain::transcript_source::TranscriptSource;

use super::pipeline_context::PipelineContext;

pub struct StubTranscriptSource {
    pub transcript: Option<TranscriptContext>,
    pub calls: AtomicUsize,
    pub assets: Mutex<Vec<String>>,
}

impl StubTranscriptSource {
    pub fn new(transcript: TranscriptContext) -> Self {
        Self {
            transcript: Some(transcript),
            calls: AtomicUsize::new(0),
            assets: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            transcript: None,
            calls: AtomicUsize::new(0),
            assets: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Asset ids passed to `transcribe`, in call order.
    pub fn assets(&self) -> Vec<String> {
        self.assets.lock().unwrap().clone()
    }
}

impl TranscriptSource for StubTranscriptSource {
    fn transcribe(
        &self,
        asset_id: &str,
        _: &CancellationToken,
    ) -> Result<TranscriptContext, Box<dyn std::error::Error + Send + Sync>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.assets.lock().unwrap().push(asset_id.to_string());
        self.transcript.clone().ok_or_else(|| "whisper crashed".into())
    }
}

/// Gives every chunk the same semantic scores, except `hook_index` which
/// gets a high hook potential but a low overall score, so the greedy pass
/// leaves it out. Vision requests get a fixed valid frame.
pub struct StubProvider {
    pub available: bool,
    pub hook_index: Option<usize>,
    pub text_calls: AtomicUsize,
    pub vision_calls: AtomicUsize,
    pub cancel_on_call: Mutex<Option<CancellationToken>>,
}

impl StubProvider {
    pub fn new() -> Self {
        Self {
            available: true,
            hook_index: None,
            text_calls: AtomicUsize::new(0),
            vision_calls: AtomicUsize::new(0),
            cancel_on_call: Mutex::new(None),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    pub fn text_calls(&self) -> usize {
        self.text_calls.load(Ordering::SeqCst)
    }

    pub fn vision_calls(&self) -> usize {
        self.vision_calls.load(Ordering::SeqCst)
    }
}

impl ChatProvider for StubProvider {
    fn chat(
        &self,
        request: &ChatRequest,
    ) -> Result<ChatResponse, Box<dyn std::error::Error + Send + Sync>> {
        if let Some(token) = self.cancel_on_call.lock().unwrap().as_ref() {
            token.cancel();
        }
        let content = match request.model_hint {
            ModelHint::Vision => {
                self.vision_calls.fetch_add(1, Ordering::SeqCst);
                r#"{"frameQuality": 0.9, "visualInterest": 0.7}"#.to_string()
            }
            ModelHint::Text => {
                self.text_calls.fetch_add(1, Ordering::SeqCst);
                let entries: Vec<String> = (0..64)
                    .map(|i| {
                        let (importance, hook) = if Some(i) == self.hook_index {
                            (1, 10)
                        } else {
                            (6, 3)
                        };
                        format!(
                            r#"{{"index": {i}, "importance": {importance}, "emotionalIntensity": 5, "hookPotential": {hook}, "standalone": {importance}}}"#
                        )
                    })
                    .collect();
                format!("```json\n[{}]\n```", entries.join(","))
            }
        };
        Ok(ChatResponse {
            content: Some(content),
            ..Default::default()
        })
    }

    fn is_available(&self) -> bool {
        self.available
    }
}

/// Returns a one-byte JPEG stand-in for every request.
pub struct StubThumbnails {
    pub calls: AtomicUsize,
}

impl StubThumbnails {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

impl ThumbnailSource for StubThumbnails {
    fn thumbnail(
        &self,
        _: &str,
        _: f64,
    ) -> Result<Option<Vec<u8>>, Box<dyn std::error::Error + Send + Sync>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(vec![0xFF]))
    }
}

/// Ten 10 s segments covering 0-100 s, each with word timings.
pub fn hundred_second_transcript() -> TranscriptContext {
    let topics = [
        "Welcome back everyone to the channel today",
        "We are going to build a tiny robot from scratch",
        "First we need a motor and a battery pack",
        "This is the most important step so pay attention",
        "Wow the robot actually moved on the first try",
        "Now let us add a sensor to the front panel",
        "The sensor detects walls and turns the robot around",
        "Here is a secret trick that saves you hours",
        "Let us test it in the maze we built last week",
        "Thanks for watching and see you next time",
    ];
    let mut segments = Vec::new();
    let mut words = Vec::new();
    for (i, text) in topics.iter().enumerate() {
        let start = i as f64 * 10.0;
        segments.push(TranscriptSegment {
            start_time: start,
            end_time: start + 10.0,
            text: text.to_string(),
        });
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let step = 10.0 / tokens.len() as f64;
        for (j, token) in tokens.iter().enumerate() {
            let word_start = start + j as f64 * step;
            words.push(TranscriptWord {
                start_time: word_start,
                end_time: word_start + step * 0.9,
                text: token.to_string(),
            });
        }
    }
    TranscriptContext {
        segments,
        words,
        source: TranscriptSourceKind::Whisper,
    }
}

/// A 100 s video track split at 40 s and 70 s.
pub fn three_clip_timeline() -> InMemoryTimeline {
    InMemoryTimeline::new(vec![Track::new(
        "main",
        TrackKind::Video,
        vec![
            TimelineElement::media("a", "clip", 0.0, 40.0),
            TimelineElement::media("b", "clip", 40.0, 30.0),
            TimelineElement::media("c", "clip", 70.0, 30.0),
        ],
    )])
}

/// Owns everything a [`PipelineContext`] borrows.
pub struct Fixture {
    pub timeline: InMemoryTimeline,
    pub transcripts: StubTranscriptSource,
    pub provider: StubProvider,
    pub thumbnails: StubThumbnails,
    pub cache: HighlightCacheStore,
    pub settings: HighlightSettings,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            timeline: three_clip_timeline(),
            transcripts: StubTranscriptSource::new(hundred_second_transcript()),
            provider: StubProvider::new(),
            thumbnails: StubThumbnails::new(),
            cache: HighlightCacheStore::default(),
            settings: HighlightSettings::default(),
        }
    }

    pub fn context(&self) -> PipelineContext<'_> {
        PipelineContext {
            project_id: "project",
            default_asset_id: None,
            timeline: &self.timeline,
            transcripts: &self.transcripts,
            provider: Some(&self.provider),
            thumbnails: Some(&self.thumbnails),
            cache: &self.cache,
            settings: &self.settings,
        }
    }
}
