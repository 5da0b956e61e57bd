use serde::{Deserialize, Serialize};

use crate::shared::time_range::TimeRange;

/// Atomic scoring unit derived from the transcript.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptChunk {
    pub index: usize,
    pub start_time: f64,
    pub end_time: f64,
    pub text: String,
    pub word_count: usize,
}

impl TranscriptChunk {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.start_time, self.end_time)
    }
}

pub fn is_cjk(c: char) -> bool {
    matches!(c as u32,
        0x3040..=0x30FF   // kana
        | 0x3400..=0x4DBF // CJK extension A
        | 0x4E00..=0x9FFF // CJK unified ideographs
        | 0xAC00..=0xD7AF // hangul syllables
        | 0xF900..=0xFAFF)
}

/// Counts whitespace-delimited words, treating each CJK ideograph as a word.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace()
        .map(|token| {
            let cjk = token.chars().filter(|c| is_cjk(*c)).count();
            let has_other = token
                .chars()
                .any(|c| !is_cjk(c) && c.is_alphanumeric());
            cjk + usize::from(has_other)
        })
        .sum()
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::latin("hello there world", 3)]
    #[case::cjk("你好世界", 4)]
    #[case::mixed("我们 use Rust", 4)]
    #[case::punctuation_only("... !!", 0)]
    #[case::empty("", 0)]
    fn test_count_words(#[case] text: &str, #[case] expected: usize) {
        assert_eq!(count_words(text), expected);
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a \n\t b   c "), "a b c");
    }

    #[test]
    fn test_range_matches_bounds() {
        let chunk = TranscriptChunk {
            index: 0,
            start_time: 1.0,
            end_time: 4.0,
            text: "x".to_string(),
            word_count: 1,
        };
        assert_eq!(chunk.range(), TimeRange::new(1.0, 4.0));
        assert_eq!(chunk.duration(), 3.0);
    }
}
