use serde::{Deserialize, Serialize};

use super::scores::{RuleScores, ScoredSegment, SemanticScores, VisualScores};

/// Relative weight of each signal family.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub rule: f64,
    pub semantic: f64,
    pub visual: f64,
}

impl ScoringWeights {
    pub const fn new(rule: f64, semantic: f64, visual: f64) -> Self {
        Self {
            rule,
            semantic,
            visual,
        }
    }

    /// Zeroes absent signals and rescales the rest to sum to one. Falls back
    /// to rule-only when nothing positive remains.
    pub fn renormalized(self, has_semantic: bool, has_visual: bool) -> Self {
        let clean = |w: f64| if w.is_finite() { w.max(0.0) } else { 0.0 };
        let rule = clean(self.rule);
        let semantic = if has_semantic { clean(self.semantic) } else { 0.0 };
        let visual = if has_visual { clean(self.visual) } else { 0.0 };
        let total = rule + semantic + visual;
        if total <= 0.0 {
            return Self::new(1.0, 0.0, 0.0);
        }
        Self::new(rule / total, semantic / total, visual / total)
    }
}

/// Weights to use for each combination of available signals.
///
/// Degraded profiles are listed explicitly rather than derived from the full
/// profile: rule+visual is deliberately not 0.4:0.2 rescaled.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightProfile {
    pub full: ScoringWeights,
    pub rule_semantic: ScoringWeights,
    pub rule_visual: ScoringWeights,
    pub rule_only: ScoringWeights,
}

impl Default for WeightProfile {
    fn default() -> Self {
        Self {
            full: ScoringWeights::new(0.4, 0.4, 0.2),
            rule_semantic: ScoringWeights::new(0.5, 0.5, 0.0),
            rule_visual: ScoringWeights::new(0.7, 0.0, 0.3),
            rule_only: ScoringWeights::new(1.0, 0.0, 0.0),
        }
    }
}

impl WeightProfile {
    pub fn weights_for(&self, has_semantic: bool, has_visual: bool) -> ScoringWeights {
        let base = match (has_semantic, has_visual) {
            (true, true) => self.full,
            (true, false) => self.rule_semantic,
            (false, true) => self.rule_visual,
            (false, false) => self.rule_only,
        };
        base.renormalized(has_semantic, has_visual)
    }
}

/// Combines the available signals into a score in `[0, 100]`, rounded to
/// two decimals. A visual record without a valid frame still carries the
/// visual weight and contributes zero.
pub fn fuse(
    rule: &RuleScores,
    semantic: Option<&SemanticScores>,
    visual: Option<&VisualScores>,
    profile: &WeightProfile,
) -> f64 {
    let weights = profile.weights_for(semantic.is_some(), visual.is_some());

    let rule_norm = rule.mean();
    let semantic_norm = semantic.map_or(0.0, |s| s.mean() / SemanticScores::MAX);
    let visual_norm = visual.map_or(0.0, VisualScores::mean);

    let weighted =
        weights.rule * rule_norm + weights.semantic * semantic_norm + weights.visual * visual_norm;
    let clamped = if weighted.is_finite() {
        weighted.clamp(0.0, 1.0)
    } else {
        0.0
    };
    (clamped * 100.0 * 100.0).round() / 100.0
}

/// Sorts by combined score descending and assigns 1-based ranks. The sort is
/// stable, so ties keep their incoming order.
pub fn rank(segments: &mut [ScoredSegment]) {
    segments.sort_by(|a, b| b.combined_score.total_cmp(&a.combined_score));
    for (i, segment) in segments.iter_mut().enumerate() {
        segment.rank = i + 1;
    }
}

/// Recomputes every segment's combined score from its stored signals.
pub fn refuse(segments: &mut [ScoredSegment], profile: &WeightProfile) {
    for segment in segments.iter_mut() {
        segment.combined_score = fuse(
            &segment.rule_scores,
            segment.semantic_scores.as_ref(),
            segment.visual_scores.as_ref(),
            profile,
        );
    }
}
