use super::transcript::{TranscriptContext, TranscriptSegment};
use super::transcript_chunk::{count_words, is_cjk, normalize_whitespace, TranscriptChunk};
use crate::shared::constants::{
    DEFAULT_SEGMENT_MAX_SECONDS, DEFAULT_SEGMENT_MIN_SECONDS, SEGMENT_MAX_SECONDS_RANGE,
    SEGMENT_MIN_SECONDS_RANGE,
};

const LATIN_TERMINATORS: &[char] = &['.', '!', '?', ';', '…'];
const CJK_TERMINATORS: &[char] = &['。', '！', '？', '；'];

/// A timed piece of text before re-indexing.
#[derive(Clone, Debug, PartialEq)]
struct Piece {
    start: f64,
    end: f64,
    text: String,
}

impl Piece {
    fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Splits a transcript into bounded scoring units.
///
/// Segments are broken at sentence boundaries, short sentences are merged
/// into their successor, and anything longer than `max_seconds` is cut
/// into equal-count parts.
#[derive(Debug, Clone)]
pub struct TranscriptChunker {
    min_seconds: f64,
    max_seconds: f64,
}

impl TranscriptChunker {
    /// Bounds are clamped to sane ranges; `max_seconds` never drops below
    /// `min_seconds`.
    pub fn new(min_seconds: Option<f64>, max_seconds: Option<f64>) -> Self {
        let min_seconds = sanitize(
            min_seconds,
            DEFAULT_SEGMENT_MIN_SECONDS,
            SEGMENT_MIN_SECONDS_RANGE,
        );
        let max_seconds = sanitize(
            max_seconds,
            DEFAULT_SEGMENT_MAX_SECONDS,
            SEGMENT_MAX_SECONDS_RANGE,
        )
        .max(min_seconds);
        Self {
            min_seconds,
            max_seconds,
        }
    }

    pub fn min_seconds(&self) -> f64 {
        self.min_seconds
    }

    pub fn max_seconds(&self) -> f64 {
        self.max_seconds
    }

    pub fn chunk(&self, transcript: &TranscriptContext) -> Vec<TranscriptChunk> {
        let sentences: Vec<Piece> = normalize_segments(&transcript.segments)
            .iter()
            .flat_map(split_sentences)
            .collect();

        merge_short(sentences, self.min_seconds)
            .into_iter()
            .flat_map(|piece| split_long(piece, self.max_seconds))
            .filter(|piece| piece.duration() > 0.0 && !piece.text.is_empty())
            .enumerate()
            .map(|(index, piece)| TranscriptChunk {
                index,
                start_time: piece.start,
                end_time: piece.end,
                word_count: count_words(&piece.text),
                text: piece.text,
            })
            .collect()
    }
}

impl Default for TranscriptChunker {
    fn default() -> Self {
        Self::new(None, None)
    }
}

fn sanitize(value: Option<f64>, default: f64, (lo, hi): (f64, f64)) -> f64 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v.clamp(lo, hi),
        _ => default,
    }
}

/// Trims text, drops empty and zero-length segments, sorts by start.
fn normalize_segments(segments: &[TranscriptSegment]) -> Vec<Piece> {
    let mut pieces: Vec<Piece> = segments
        .iter()
        .filter(|s| s.start_time.is_finite() && s.end_time.is_finite())
        .map(|s| Piece {
            start: s.start_time,
            end: s.end_time,
            text: normalize_whitespace(&s.text),
        })
        .filter(|p| !p.text.is_empty() && p.duration() > 0.0)
        .collect();
    pieces.sort_by(|a, b| a.start.total_cmp(&b.start));

    // Overlapping input segments are clipped so chunks never overlap.
    let mut previous_end = f64::NEG_INFINITY;
    pieces.retain_mut(|p| {
        p.start = p.start.max(previous_end);
        if p.duration() <= 0.0 {
            return false;
        }
        previous_end = p.end;
        true
    });
    pieces
}

fn is_terminator(c: char, next: Option<char>) -> bool {
    if CJK_TERMINATORS.contains(&c) {
        return true;
    }
    if !LATIN_TERMINATORS.contains(&c) {
        return false;
    }
    match next {
        None => true,
        Some(n) => n.is_whitespace() || is_cjk(n),
    }
}

fn sentence_texts(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut sentences = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        current.push(c);
        let next = chars.get(i + 1).copied();
        let run_continues = next.is_some_and(|n| {
            CJK_TERMINATORS.contains(&n) || LATIN_TERMINATORS.contains(&n)
        });
        if is_terminator(c, next) && !run_continues {
            let sentence = current.trim().to_string();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            current.clear();
        }
    }

    let rest = current.trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }
    sentences
}

/// Splits one segment into sentences, sharing its time span in proportion
/// to each sentence's character length.
fn split_sentences(segment: &Piece) -> Vec<Piece> {
    let sentences = sentence_texts(&segment.text);
    if sentences.len() <= 1 {
        return vec![segment.clone()];
    }

    let total_chars: usize = sentences.iter().map(|s| s.chars().count()).sum();
    let span = segment.duration();
    let mut cursor = segment.start;
    let mut consumed = 0usize;
    let last = sentences.len() - 1;

    sentences
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            consumed += text.chars().count();
            let end = if i == last {
                segment.end
            } else {
                segment.start + span * consumed as f64 / total_chars as f64
            };
            let piece = Piece {
                start: cursor,
                end,
                text,
            };
            cursor = end;
            piece
        })
        .collect()
}

/// Folds each piece shorter than `min_seconds` into its immediate successor.
/// One lookahead step only: the merged piece is emitted as-is.
fn merge_short(pieces: Vec<Piece>, min_seconds: f64) -> Vec<Piece> {
    let mut merged = Vec::with_capacity(pieces.len());
    let mut iter = pieces.into_iter();

    while let Some(piece) = iter.next() {
        if piece.duration() < min_seconds {
            if let Some(next) = iter.next() {
                merged.push(Piece {
                    start: piece.start,
                    end: next.end.max(piece.end),
                    text: normalize_whitespace(&format!("{} {}", piece.text, next.text)),
                });
                continue;
            }
        }
        merged.push(piece);
    }
    merged
}

/// Cuts a piece longer than `max_seconds` into `ceil(duration / max)` parts,
/// partitioning tokens evenly and time in proportion to token share.
fn split_long(piece: Piece, max_seconds: f64) -> Vec<Piece> {
    let duration = piece.duration();
    if duration <= max_seconds {
        return vec![piece];
    }

    let parts = (duration / max_seconds).ceil() as usize;
    let words: Vec<&str> = piece.text.split_whitespace().collect();
    let (tokens, separator): (Vec<String>, &str) = if words.len() >= parts {
        (words.iter().map(|w| w.to_string()).collect(), " ")
    } else {
        (piece.text.chars().map(String::from).collect(), "")
    };

    if tokens.len() < 2 {
        return vec![piece];
    }

    let parts = parts.min(tokens.len());
    let total = tokens.len();
    (0..parts)
        .map(|k| {
            let from = k * total / parts;
            let to = (k + 1) * total / parts;
            let start = piece.start + duration * from as f64 / total as f64;
            let end = if k + 1 == parts {
                piece.end
            } else {
                piece.start + duration * to as f64 / total as f64
            };
            Piece {
                start,
                end,
                text: normalize_whitespace(&tokens[from..to].join(separator)),
            }
        })
        .collect()
}
