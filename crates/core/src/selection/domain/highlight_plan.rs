use serde::{Deserialize, Serialize};

use crate::shared::time_range::TimeRange;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedSegment {
    pub chunk_index: usize,
    pub start_time: f64,
    pub end_time: f64,
    pub text: String,
    pub combined_score: f64,
    pub rank: usize,
    /// True when this segment was promoted to open the cut.
    pub is_hook: bool,
}

impl SelectedSegment {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.start_time, self.end_time)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightPlan {
    pub target_duration: f64,
    pub tolerance: f64,
    pub actual_duration: f64,
    /// Sorted by start time, pairwise non-overlapping.
    pub segments: Vec<SelectedSegment>,
    /// Number of scored segments the plan was chosen from.
    pub total_segments: usize,
    pub coverage_percent: f64,
}

impl HighlightPlan {
    pub fn keep_ranges(&self) -> Vec<TimeRange> {
        self.segments.iter().map(SelectedSegment::range).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn min_duration(&self) -> f64 {
        self.target_duration * (1.0 - self.tolerance)
    }

    pub fn max_duration(&self) -> f64 {
        self.target_duration * (1.0 + self.tolerance)
    }
}
