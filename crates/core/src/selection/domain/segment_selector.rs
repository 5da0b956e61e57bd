use super::highlight_plan::{HighlightPlan, SelectedSegment};
use crate::scoring::domain::scores::ScoredSegment;
use crate::shared::constants::{
    DEFAULT_TARGET_DURATION, DEFAULT_TOLERANCE, HOOK_PROMOTION_MARGIN, MAX_TOLERANCE,
    TIME_EPSILON,
};

/// Chooses a set of non-overlapping segments whose total duration lands
/// within `target * (1 ± tolerance)`.
///
/// Selection runs in three passes over the ranking:
/// 1. greedy: take the best-scoring segments that fit under the maximum,
///    stopping as soon as the total is inside the window;
/// 2. backfill: if still short, rescan everything; the maximum is only
///    waived for the very first segment;
/// 3. hook promotion: optionally swap the earliest selected segment for the
///    unselected segment with the strongest hook potential.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentSelector {
    target_duration: f64,
    tolerance: f64,
    include_hook: bool,
}

impl SegmentSelector {
    /// Non-positive targets fall back to the default; tolerance is clamped
    /// to `[0, 0.5]`.
    pub fn new(target_duration: f64, tolerance: f64, include_hook: bool) -> Self {
        let target_duration = if target_duration.is_finite() && target_duration > 0.0 {
            target_duration
        } else {
            DEFAULT_TARGET_DURATION
        };
        let tolerance = if tolerance.is_finite() {
            tolerance.clamp(0.0, MAX_TOLERANCE)
        } else {
            DEFAULT_TOLERANCE
        };
        Self {
            target_duration,
            tolerance,
            include_hook,
        }
    }

    pub fn target_duration(&self) -> f64 {
        self.target_duration
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    fn window(&self) -> (f64, f64) {
        (
            self.target_duration * (1.0 - self.tolerance),
            self.target_duration * (1.0 + self.tolerance),
        )
    }

    pub fn select(&self, scored: &[ScoredSegment]) -> HighlightPlan {
        let (min, max) = self.window();
        let ranked = ranked_order(scored);
        let mut chosen: Vec<&ScoredSegment> = Vec::new();
        let mut accumulated = 0.0;

        for candidate in &ranked {
            if in_window(accumulated, min, max) {
                break;
            }
            if overlaps_any(candidate, &chosen) {
                continue;
            }
            let duration = candidate.chunk.duration();
            if accumulated + duration <= max + TIME_EPSILON {
                chosen.push(*candidate);
                accumulated += duration;
            }
        }

        if accumulated < min - TIME_EPSILON {
            for candidate in &ranked {
                if accumulated >= min - TIME_EPSILON {
                    break;
                }
                if chosen.iter().any(|c| std::ptr::eq(*c, *candidate))
                    || overlaps_any(candidate, &chosen)
                {
                    continue;
                }
                let duration = candidate.chunk.duration();
                if accumulated > 0.0 && accumulated + duration > max + TIME_EPSILON {
                    continue;
                }
                chosen.push(*candidate);
                accumulated += duration;
            }
        }

        let mut hook_index = None;
        if self.include_hook {
            if let Some((replace_at, hook)) = self.find_hook(&ranked, &chosen, accumulated, max) {
                chosen[replace_at] = hook;
                hook_index = Some(hook.chunk.index);
            }
        }

        chosen.sort_by(|a, b| a.chunk.start_time.total_cmp(&b.chunk.start_time));
        let segments: Vec<SelectedSegment> = chosen
            .iter()
            .map(|s| SelectedSegment {
                chunk_index: s.chunk.index,
                start_time: s.chunk.start_time,
                end_time: s.chunk.end_time,
                text: s.chunk.text.clone(),
                combined_score: s.combined_score,
                rank: s.rank,
                is_hook: hook_index == Some(s.chunk.index),
            })
            .collect();

        let actual_duration: f64 = segments.iter().map(SelectedSegment::duration).sum();
        let span = source_span(scored);
        let coverage_percent = if span > 0.0 {
            actual_duration / span * 100.0
        } else {
            0.0
        };

        HighlightPlan {
            target_duration: self.target_duration,
            tolerance: self.tolerance,
            actual_duration,
            segments,
            total_segments: scored.len(),
            coverage_percent,
        }
    }

    /// Returns the position in `chosen` to replace and the hook segment.
    fn find_hook<'a>(
        &self,
        ranked: &[&'a ScoredSegment],
        chosen: &[&'a ScoredSegment],
        accumulated: f64,
        max: f64,
    ) -> Option<(usize, &'a ScoredSegment)> {
        let (earliest_at, earliest) = chosen
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.chunk.start_time.total_cmp(&b.1.chunk.start_time))?;

        let mut hook: Option<(&'a ScoredSegment, f64)> = None;
        for candidate in ranked {
            if chosen.iter().any(|c| std::ptr::eq(*c, *candidate)) {
                continue;
            }
            let Some(potential) = candidate.hook_potential() else {
                continue;
            };
            if hook.map_or(true, |(_, best)| potential > best) {
                hook = Some((*candidate, potential));
            }
        }
        let (hook, potential) = hook?;

        let range = hook.chunk.range();
        let blocks_others = chosen
            .iter()
            .enumerate()
            .any(|(i, c)| i != earliest_at && c.chunk.range().overlaps(&range, TIME_EPSILON));
        let earliest_potential = earliest.hook_potential().unwrap_or(0.0);
        let swapped = accumulated - earliest.chunk.duration() + hook.chunk.duration();

        let promote = !blocks_others
            && potential - earliest_potential >= HOOK_PROMOTION_MARGIN
            && swapped <= max + TIME_EPSILON;
        if promote {
            log::debug!(
                "Promoting chunk {} (hook {potential}) over chunk {} (hook {earliest_potential})",
                hook.chunk.index,
                earliest.chunk.index
            );
        }
        promote.then_some((earliest_at, hook))
    }
}

impl Default for SegmentSelector {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_DURATION, DEFAULT_TOLERANCE, true)
    }
}

fn in_window(accumulated: f64, min: f64, max: f64) -> bool {
    accumulated >= min - TIME_EPSILON && accumulated <= max + TIME_EPSILON
}

fn overlaps_any(candidate: &ScoredSegment, chosen: &[&ScoredSegment]) -> bool {
    let range = candidate.chunk.range();
    chosen
        .iter()
        .any(|c| c.chunk.range().overlaps(&range, TIME_EPSILON))
}

/// Score descending; ties broken by rank, then start time, so the order is
/// fully deterministic.
fn ranked_order(scored: &[ScoredSegment]) -> Vec<&ScoredSegment> {
    let mut ranked: Vec<&ScoredSegment> = scored.iter().collect();
    ranked.sort_by(|a, b| {
        b.combined_score
            .total_cmp(&a.combined_score)
            .then(a.rank.cmp(&b.rank))
            .then(a.chunk.start_time.total_cmp(&b.chunk.start_time))
    });
    ranked
}

fn source_span(scored: &[ScoredSegment]) -> f64 {
    let start = scored
        .iter()
        .map(|s| s.chunk.start_time)
        .fold(f64::INFINITY, f64::min);
    let end = scored
        .iter()
        .map(|s| s.chunk.end_time)
        .fold(f64::NEG_INFINITY, f64::max);
    if end > start {
        end - start
    } else {
        0.0
    }
}
