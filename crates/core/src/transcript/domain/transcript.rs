use serde::{Deserialize, Serialize};

use crate::shared::time_range::TimeRange;

/// Where the transcript text came from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptSourceKind {
    Whisper,
    Captions,
    Mixed,
    #[default]
    None,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptSegment {
    pub start_time: f64,
    pub end_time: f64,
    pub text: String,
}

impl TranscriptSegment {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptWord {
    pub start_time: f64,
    pub end_time: f64,
    pub text: String,
}

impl TranscriptWord {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.start_time, self.end_time)
    }
}

/// Read-only transcript handed to the highlight pipeline.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptContext {
    pub segments: Vec<TranscriptSegment>,
    #[serde(default)]
    pub words: Vec<TranscriptWord>,
    #[serde(default)]
    pub source: TranscriptSourceKind,
}

impl TranscriptContext {
    /// True when no segment carries any non-blank text.
    pub fn is_empty(&self) -> bool {
        self.segments.iter().all(|s| s.text.trim().is_empty())
    }

    pub fn span(&self) -> Option<TimeRange> {
        let start = self
            .segments
            .iter()
            .map(|s| s.start_time)
            .fold(f64::INFINITY, f64::min);
        let end = self
            .segments
            .iter()
            .map(|s| s.end_time)
            .fold(f64::NEG_INFINITY, f64::max);
        (end > start).then_some(TimeRange::new(start, end))
    }

    pub fn has_word_timings(&self) -> bool {
        !self.words.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn segment(start: f64, end: f64, text: &str) -> TranscriptSegment {
        TranscriptSegment {
            start_time: start,
            end_time: end,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_word_duration() {
        let w = TranscriptWord {
            start_time: 2.0,
            end_time: 2.8,
            text: "test".to_string(),
        };
        assert_relative_eq!(w.duration(), 0.8, epsilon = 0.001);
    }

    #[test]
    fn test_blank_segments_are_empty() {
        let ctx = TranscriptContext {
            segments: vec![segment(0.0, 1.0, "   "), segment(1.0, 2.0, "")],
            ..Default::default()
        };
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_span_covers_all_segments() {
        let ctx = TranscriptContext {
            segments: vec![segment(5.0, 9.0, "b"), segment(1.0, 3.0, "a")],
            ..Default::default()
        };
        assert_eq!(ctx.span(), Some(TimeRange::new(1.0, 9.0)));
    }

    #[test]
    fn test_source_serializes_lowercase() {
        let json = serde_json::to_string(&TranscriptSourceKind::Whisper).unwrap();
        assert_eq!(json, "\"whisper\"");
    }

    #[test]
    fn test_deserializes_without_words() {
        let json = r#"{ "segments": [{ "startTime": 0.0, "endTime": 1.5, "text": "hi" }] }"#;
        let ctx: TranscriptContext = serde_json::from_str(json).unwrap();
        assert_eq!(ctx.segments.len(), 1);
        assert!(!ctx.has_word_timings());
        assert_eq!(ctx.source, TranscriptSourceKind::None);
    }
}
