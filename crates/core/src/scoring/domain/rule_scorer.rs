use super::scores::RuleScores;
use crate::shared::constants::TIME_EPSILON;
use crate::shared::time_range::TimeRange;
use crate::timeline::domain::range_algebra::merge_ranges;
use crate::transcript::domain::transcript::TranscriptWord;
use crate::transcript::domain::transcript_chunk::{is_cjk, TranscriptChunk};

/// Words per second at which the speaking-rate feature is zero.
const SLOW_WORDS_PER_SECOND: f64 = 0.8;
/// Words per second at which the speaking-rate feature saturates.
const FAST_WORDS_PER_SECOND: f64 = 3.2;
const ENGAGEMENT_SATURATION: f64 = 4.0;

const ENGLISH_FILLERS: &[&str] = &[
    "um", "uh", "uhm", "erm", "er", "ah", "eh", "hmm", "hm", "mhm", "like", "basically",
    "actually", "literally", "so", "okay", "ok", "yeah", "right", "well",
];

const CHINESE_FILLERS: &[&str] = &["嗯", "呃", "啊", "哦", "额", "那个", "这个", "就是", "然后"];

const ENGLISH_KEYWORDS: &[&str] = &[
    "amazing", "incredible", "secret", "important", "never", "always", "best", "worst",
    "why", "how", "finally", "surprising", "mistake", "key", "wow", "must",
];

const CHINESE_KEYWORDS: &[&str] = &[
    "重要", "秘密", "竟然", "为什么", "没想到", "关键", "一定", "最", "千万", "其实",
];

const EMPHASIS_PUNCTUATION: &[char] = &['!', '?', '！', '？'];

/// Computes the deterministic rule features of a chunk.
///
/// `words` is the full word list of the transcript; only words overlapping
/// the chunk contribute to the voiced ratio. An empty word list means the
/// source has no word timings, in which case the chunk counts as fully voiced.
pub fn score_chunk(chunk: &TranscriptChunk, words: &[TranscriptWord]) -> RuleScores {
    RuleScores {
        speaking_rate: speaking_rate(chunk),
        content_density: content_density(&chunk.text),
        engagement_markers: engagement_markers(&chunk.text),
        silence_ratio: voiced_ratio(chunk, words),
    }
}

fn speaking_rate(chunk: &TranscriptChunk) -> f64 {
    let duration = chunk.duration();
    if duration <= 0.0 {
        return 0.0;
    }
    let rate = chunk.word_count as f64 / duration;
    ((rate - SLOW_WORDS_PER_SECOND) / (FAST_WORDS_PER_SECOND - SLOW_WORDS_PER_SECOND))
        .clamp(0.0, 1.0)
}

fn clean_latin(token: &str) -> String {
    token
        .chars()
        .filter(|c| c.is_alphanumeric() && !is_cjk(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Number of characters in `text` covered by non-overlapping occurrences of
/// any of `needles`, longest needle first.
fn covered_chars(text: &str, needles: &[&str]) -> usize {
    let chars: Vec<char> = text.chars().collect();
    let mut sorted: Vec<Vec<char>> = needles.iter().map(|n| n.chars().collect()).collect();
    sorted.sort_by_key(|n| std::cmp::Reverse(n.len()));

    let mut covered = 0;
    let mut i = 0;
    while i < chars.len() {
        match sorted.iter().find(|n| chars[i..].starts_with(n)) {
            Some(needle) => {
                covered += needle.len();
                i += needle.len();
            }
            None => i += 1,
        }
    }
    covered
}

fn content_density(text: &str) -> f64 {
    let mut total = 0usize;
    let mut fillers = 0usize;
    for token in text.split_whitespace() {
        let latin = clean_latin(token);
        if !latin.is_empty() {
            total += 1;
            if ENGLISH_FILLERS.contains(&latin.as_str()) {
                fillers += 1;
            }
        }
        let cjk: String = token.chars().filter(|c| is_cjk(*c)).collect();
        if !cjk.is_empty() {
            total += cjk.chars().count();
            fillers += covered_chars(&cjk, CHINESE_FILLERS);
        }
    }
    if total == 0 {
        return 0.0;
    }
    1.0 - fillers as f64 / total as f64
}

fn engagement_markers(text: &str) -> f64 {
    let punctuation = text
        .chars()
        .filter(|c| EMPHASIS_PUNCTUATION.contains(c))
        .count();
    let latin_hits = text
        .split_whitespace()
        .filter(|t| ENGLISH_KEYWORDS.contains(&clean_latin(t).as_str()))
        .count();
    let chinese_hits: usize = CHINESE_KEYWORDS
        .iter()
        .map(|k| text.matches(k).count())
        .sum();
    ((punctuation + latin_hits + chinese_hits) as f64 / ENGAGEMENT_SATURATION).clamp(0.0, 1.0)
}

fn voiced_ratio(chunk: &TranscriptChunk, words: &[TranscriptWord]) -> f64 {
    if words.is_empty() {
        return 1.0;
    }
    let duration = chunk.duration();
    if duration <= 0.0 {
        return 0.0;
    }
    let span = chunk.range();
    let overlaps: Vec<TimeRange> = words
        .iter()
        .filter_map(|w| w.range().intersection(&span))
        .collect();
    let voiced: f64 = merge_ranges(&overlaps, TIME_EPSILON)
        .iter()
        .map(TimeRange::duration)
        .sum();
    (voiced / duration).clamp(0.0, 1.0)
}
