use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::range_algebra::{complement_ranges, merge_ranges, total_duration};
use super::timeline::{element_count, timeline_duration, TimelineElement, Track};
use crate::shared::constants::TIME_EPSILON;
use crate::shared::time_range::TimeRange;

/// Largest accepted gap between expected and actual final duration.
const DURATION_TOLERANCE: f64 = 0.01;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditError {
    #[error("edit would not change the timeline")]
    NoOp,
    #[error("edit would leave the timeline empty")]
    EmptyTimeline,
    #[error("final duration {actual:.3}s does not match expected {expected:.3}s")]
    DurationMismatch { expected: f64, actual: f64 },
    #[error("invalid range: {0}")]
    InvalidRange(String),
}

/// Summary of a committed edit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineDiff {
    pub original_duration: f64,
    pub final_duration: f64,
    pub removed_duration: f64,
    pub deleted_ranges: Vec<TimeRange>,
    pub elements_before: usize,
    pub elements_after: usize,
    pub split_count: usize,
    pub deleted_count: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EditOutcome {
    pub tracks: Vec<Track>,
    pub diff: TimelineDiff,
}

/// Removes time ranges from every track: split at range boundaries, drop the
/// covered pieces, then ripple the survivors left to close the gaps.
///
/// The result is verified before it is handed back; a caller only ever
/// commits an [`EditOutcome`] that passed verification.
#[derive(Debug, Clone, Copy)]
pub struct RangeEditEngine {
    epsilon: f64,
}

impl Default for RangeEditEngine {
    fn default() -> Self {
        Self {
            epsilon: TIME_EPSILON,
        }
    }
}

impl RangeEditEngine {
    pub fn new(epsilon: f64) -> Self {
        Self {
            epsilon: epsilon.max(0.0),
        }
    }

    /// Keeps only `keep` ranges; everything else in `[0, duration]` goes.
    pub fn apply_keep_ranges(
        &self,
        tracks: &[Track],
        keep: &[TimeRange],
    ) -> Result<EditOutcome, EditError> {
        validate(keep)?;
        let total = timeline_duration(tracks);
        if total <= self.epsilon {
            return Err(EditError::EmptyTimeline);
        }
        let deletes = complement_ranges(total, keep, self.epsilon);
        self.apply_deletions(tracks, &deletes)
    }

    pub fn apply_deletions(
        &self,
        tracks: &[Track],
        delete: &[TimeRange],
    ) -> Result<EditOutcome, EditError> {
        validate(delete)?;
        let original_duration = timeline_duration(tracks);
        if original_duration <= self.epsilon {
            return Err(EditError::EmptyTimeline);
        }

        let clipped: Vec<TimeRange> = delete
            .iter()
            .filter_map(|r| r.intersection(&TimeRange::new(0.0, original_duration)))
            .collect();
        let deletes: Vec<TimeRange> = merge_ranges(&clipped, self.epsilon)
            .into_iter()
            .filter(|r| !r.is_empty(self.epsilon))
            .collect();
        if deletes.is_empty() {
            return Err(EditError::NoOp);
        }

        let split_points = split_points(&deletes);
        let mut split_count = 0;
        let mut deleted_count = 0;
        let mut result = Vec::with_capacity(tracks.len());

        for track in tracks {
            let mut elements = Vec::with_capacity(track.elements.len());
            for element in &track.elements {
                let pieces = split_element(element, &split_points, self.epsilon);
                split_count += pieces.len() - 1;
                for mut piece in pieces {
                    let range = piece.range();
                    if deletes.iter().any(|d| d.contains_range(&range, self.epsilon)) {
                        deleted_count += 1;
                        continue;
                    }
                    piece.start_time -= shift_before(piece.start_time, &deletes, self.epsilon);
                    elements.push(piece);
                }
            }
            elements.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
            result.push(Track {
                elements,
                ..track.clone()
            });
        }

        let removed_duration = total_duration(&deletes);
        let final_duration = timeline_duration(&result);
        self.verify(&result, original_duration, final_duration, removed_duration)?;

        let diff = TimelineDiff {
            original_duration,
            final_duration,
            removed_duration,
            deleted_ranges: deletes,
            elements_before: element_count(tracks),
            elements_after: element_count(&result),
            split_count,
            deleted_count,
        };
        log::debug!(
            "Range edit: {:.2}s -> {:.2}s ({} splits, {} deleted)",
            diff.original_duration,
            diff.final_duration,
            diff.split_count,
            diff.deleted_count
        );
        Ok(EditOutcome {
            tracks: result,
            diff,
        })
    }

    fn verify(
        &self,
        tracks: &[Track],
        original: f64,
        actual: f64,
        removed: f64,
    ) -> Result<(), EditError> {
        let has_content = tracks
            .iter()
            .flat_map(|t| t.elements.iter())
            .any(|e| e.duration > self.epsilon);
        if !has_content || actual <= self.epsilon {
            return Err(EditError::EmptyTimeline);
        }
        if actual >= original - self.epsilon {
            return Err(EditError::NoOp);
        }
        let expected = original - removed;
        if (expected - actual).abs() > DURATION_TOLERANCE {
            return Err(EditError::DurationMismatch { expected, actual });
        }
        Ok(())
    }
}

fn validate(ranges: &[TimeRange]) -> Result<(), EditError> {
    match ranges
        .iter()
        .find(|r| !r.start.is_finite() || !r.end.is_finite() || r.end < r.start)
    {
        Some(r) => Err(EditError::InvalidRange(format!("[{}, {}]", r.start, r.end))),
        None => Ok(()),
    }
}

/// Sorted, deduplicated boundaries of the delete ranges.
fn split_points(deletes: &[TimeRange]) -> Vec<f64> {
    let mut points: Vec<f64> = deletes.iter().flat_map(|d| [d.start, d.end]).collect();
    points.sort_by(f64::total_cmp);
    points.dedup_by(|a, b| (*a - *b).abs() <= TIME_EPSILON);
    points
}

/// Cuts an element at every point strictly inside it, ignoring cuts that
/// would leave a sliver shorter than `epsilon`.
fn split_element(element: &TimelineElement, points: &[f64], epsilon: f64) -> Vec<TimelineElement> {
    let mut pieces = Vec::new();
    let mut rest = element.clone();
    let mut next_id = 1;
    for &t in points {
        if t <= rest.start_time + epsilon || t >= rest.end_time() - epsilon {
            continue;
        }
        if let Some((left, right)) = rest.split_at(t, format!("{}#{next_id}", element.id)) {
            pieces.push(left);
            rest = right;
            next_id += 1;
        }
    }
    pieces.push(rest);
    pieces
}

/// Duration of delete ranges that end at or before `start`.
fn shift_before(start: f64, deletes: &[TimeRange], epsilon: f64) -> f64 {
    deletes
        .iter()
        .filter(|d| d.end <= start + epsilon)
        .map(TimeRange::duration)
        .sum()
}
