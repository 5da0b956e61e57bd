use serde::{Deserialize, Serialize};

use crate::transcript::domain::transcript_chunk::TranscriptChunk;

/// Deterministic transcript features, each in `[0, 1]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleScores {
    pub speaking_rate: f64,
    pub content_density: f64,
    pub engagement_markers: f64,
    pub silence_ratio: f64,
}

impl RuleScores {
    pub fn mean(&self) -> f64 {
        (self.speaking_rate + self.content_density + self.engagement_markers + self.silence_ratio)
            / 4.0
    }
}

/// LLM judgement of a chunk, each axis in `[1, 10]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticScores {
    pub importance: f64,
    pub emotional_intensity: f64,
    pub hook_potential: f64,
    pub standalone: f64,
}

impl SemanticScores {
    pub const MIN: f64 = 1.0;
    pub const MAX: f64 = 10.0;

    /// Builds scores with every axis clamped into `[1, 10]`.
    pub fn clamped(
        importance: f64,
        emotional_intensity: f64,
        hook_potential: f64,
        standalone: f64,
    ) -> Self {
        let c = |v: f64| v.clamp(Self::MIN, Self::MAX);
        Self {
            importance: c(importance),
            emotional_intensity: c(emotional_intensity),
            hook_potential: c(hook_potential),
            standalone: c(standalone),
        }
    }

    pub fn mean(&self) -> f64 {
        (self.importance + self.emotional_intensity + self.hook_potential + self.standalone) / 4.0
    }
}

/// VLM judgement of a candidate's thumbnail.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualScores {
    pub frame_quality: f64,
    pub visual_interest: f64,
    pub has_valid_frame: bool,
}

impl VisualScores {
    pub fn invalid() -> Self {
        Self::default()
    }

    /// Returns `None` unless both values are finite and within `[0, 1]`.
    pub fn checked(frame_quality: f64, visual_interest: f64) -> Option<Self> {
        let valid = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);
        (valid(frame_quality) && valid(visual_interest)).then_some(Self {
            frame_quality,
            visual_interest,
            has_valid_frame: true,
        })
    }

    pub fn mean(&self) -> f64 {
        if self.has_valid_frame {
            (self.frame_quality + self.visual_interest) / 2.0
        } else {
            0.0
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredSegment {
    pub chunk: TranscriptChunk,
    pub rule_scores: RuleScores,
    pub semantic_scores: Option<SemanticScores>,
    pub visual_scores: Option<VisualScores>,
    pub combined_score: f64,
    /// 1-based position in the ranking.
    pub rank: usize,
}

impl ScoredSegment {
    pub fn hook_potential(&self) -> Option<f64> {
        self.semantic_scores.map(|s| s.hook_potential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_semantic_clamped_into_range() {
        let s = SemanticScores::clamped(0.0, 11.0, 5.0, -3.0);
        assert_eq!(s.importance, 1.0);
        assert_eq!(s.emotional_intensity, 10.0);
        assert_eq!(s.hook_potential, 5.0);
        assert_eq!(s.standalone, 1.0);
    }

    #[test]
    fn test_visual_checked_rejects_out_of_range() {
        assert!(VisualScores::checked(1.2, 0.5).is_none());
        assert!(VisualScores::checked(0.5, f64::NAN).is_none());
        assert!(VisualScores::checked(-0.1, 0.5).is_none());
        assert!(VisualScores::checked(0.0, 1.0).unwrap().has_valid_frame);
    }

    #[test]
    fn test_invalid_visual_mean_is_zero() {
        let v = VisualScores {
            frame_quality: 1.0,
            visual_interest: 1.0,
            has_valid_frame: false,
        };
        assert_eq!(v.mean(), 0.0);
    }

    #[test]
    fn test_rule_mean() {
        let r = RuleScores {
            speaking_rate: 1.0,
            content_density: 0.5,
            engagement_markers: 0.0,
            silence_ratio: 0.5,
        };
        assert_relative_eq!(r.mean(), 0.5);
    }
}
