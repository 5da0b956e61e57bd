use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::shared::cancellation::CancellationToken;
use crate::transcript::domain::transcript::{
    TranscriptContext, TranscriptSegment, TranscriptSourceKind, TranscriptWord,
};
use crate::transcript::domain::transcript_source::TranscriptSource;

/// Whisper's `--output_format json` layout.
#[derive(Debug, Deserialize)]
struct WhisperOutput {
    segments: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    text: String,
    #[serde(default)]
    words: Vec<WhisperWord>,
}

#[derive(Debug, Deserialize)]
struct WhisperWord {
    word: String,
    start: f64,
    end: f64,
}

/// Parses either a serialized [`TranscriptContext`] or raw whisper JSON.
pub fn parse_transcript_json(json: &str) -> Result<TranscriptContext, serde_json::Error> {
    if let Ok(context) = serde_json::from_str::<TranscriptContext>(json) {
        return Ok(context);
    }
    let whisper: WhisperOutput = serde_json::from_str(json)?;
    Ok(from_whisper(whisper))
}

fn from_whisper(output: WhisperOutput) -> TranscriptContext {
    let mut words = Vec::new();
    let segments = output
        .segments
        .into_iter()
        .map(|s| {
            words.extend(s.words.into_iter().map(|w| TranscriptWord {
                start_time: w.start,
                end_time: w.end,
                text: w.word.trim().to_string(),
            }));
            TranscriptSegment {
                start_time: s.start,
                end_time: s.end,
                text: s.text.trim().to_string(),
            }
        })
        .collect();

    TranscriptContext {
        segments,
        words,
        source: TranscriptSourceKind::Whisper,
    }
}

/// Loads pre-computed transcripts stored as `<dir>/<asset_id>.json`.
#[derive(Debug, Clone)]
pub struct JsonTranscriptSource {
    directory: PathBuf,
}

impl JsonTranscriptSource {
    pub fn new(directory: &Path) -> Self {
        Self {
            directory: directory.to_path_buf(),
        }
    }

    pub fn path_for(&self, asset_id: &str) -> PathBuf {
        self.directory.join(format!("{asset_id}.json"))
    }
}

impl TranscriptSource for JsonTranscriptSource {
    fn transcribe(
        &self,
        asset_id: &str,
        cancel: &CancellationToken,
    ) -> Result<TranscriptContext, Box<dyn std::error::Error + Send + Sync>> {
        cancel.check()?;
        let path = self.path_for(asset_id);
        let json = fs::read_to_string(&path)
            .map_err(|e| format!("failed to read transcript {}: {e}", path.display()))?;
        let context = parse_transcript_json(&json)
            .map_err(|e| format!("failed to parse transcript {}: {e}", path.display()))?;
        log::debug!(
            "Loaded transcript for {asset_id}: {} segments, {} words",
            context.segments.len(),
            context.words.len()
        );
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHISPER_JSON: &str = r#"{
        "text": " Hello there. General Kenobi.",
        "segments": [
            { "id": 0, "start": 0.0, "end": 1.5, "text": " Hello there.",
              "words": [
                { "word": " Hello", "start": 0.0, "end": 0.6 },
                { "word": " there.", "start": 0.7, "end": 1.4 }
              ] },
            { "id": 1, "start": 1.5, "end": 3.0, "text": " General Kenobi." }
        ],
        "language": "en"
    }"#;

    #[test]
    fn test_parses_whisper_output() {
        let ctx = parse_transcript_json(WHISPER_JSON).unwrap();
        assert_eq!(ctx.source, TranscriptSourceKind::Whisper);
        assert_eq!(ctx.segments.len(), 2);
        assert_eq!(ctx.segments[0].text, "Hello there.");
        assert_eq!(ctx.words.len(), 2);
        assert_eq!(ctx.words[1].text, "there.");
    }

    #[test]
    fn test_parses_native_context() {
        let json = r#"{ "segments": [{ "startTime": 0.0, "endTime": 2.0, "text": "Hi" }],
                        "words": [], "source": "captions" }"#;
        let ctx = parse_transcript_json(json).unwrap();
        assert_eq!(ctx.source, TranscriptSourceKind::Captions);
    }

    #[test]
    fn test_rejects_unknown_layout() {
        assert!(parse_transcript_json(r#"{ "foo": 1 }"#).is_err());
    }

    #[test]
    fn test_source_reads_asset_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("clip-1.json"), WHISPER_JSON).unwrap();
        let source = JsonTranscriptSource::new(dir.path());

        let ctx = source
            .transcribe("clip-1", &CancellationToken::new())
            .unwrap();

        assert_eq!(ctx.segments.len(), 2);
    }

    #[test]
    fn test_source_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonTranscriptSource::new(dir.path());
        assert!(source.transcribe("nope", &CancellationToken::new()).is_err());
    }

    #[test]
    fn test_source_respects_cancellation() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("clip-1.json"), WHISPER_JSON).unwrap();
        let source = JsonTranscriptSource::new(dir.path());
        let token = CancellationToken::new();
        token.cancel();
        assert!(source.transcribe("clip-1", &token).is_err());
    }
}
