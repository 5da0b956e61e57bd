use crate::shared::time_range::TimeRange;

/// Sorts and merges ranges into a minimal disjoint cover. Ranges that
/// overlap or touch within `epsilon` are joined; empty or non-finite ranges
/// are dropped.
pub fn merge_ranges(ranges: &[TimeRange], epsilon: f64) -> Vec<TimeRange> {
    let mut sorted: Vec<TimeRange> = ranges
        .iter()
        .filter(|r| r.start.is_finite() && r.end.is_finite() && r.end > r.start)
        .copied()
        .collect();
    sorted.sort_by(|a, b| a.start.total_cmp(&b.start));

    let mut merged: Vec<TimeRange> = Vec::with_capacity(sorted.len());
    for range in sorted {
        match merged.last_mut() {
            Some(last) if range.start <= last.end + epsilon => {
                last.end = last.end.max(range.end);
            }
            _ => merged.push(range),
        }
    }
    merged
}

/// `[0, total]` minus the merged keep ranges. Slivers no longer than
/// `epsilon` are discarded.
pub fn complement_ranges(total: f64, keep: &[TimeRange], epsilon: f64) -> Vec<TimeRange> {
    let mut deletes = Vec::new();
    let mut cursor = 0.0;
    for range in merge_ranges(keep, epsilon) {
        let start = range.start.clamp(0.0, total);
        let end = range.end.clamp(0.0, total);
        if start - cursor > epsilon {
            deletes.push(TimeRange::new(cursor, start));
        }
        cursor = cursor.max(end);
    }
    if total - cursor > epsilon {
        deletes.push(TimeRange::new(cursor, total));
    }
    deletes
}

/// Total length of `ranges`, assumed disjoint.
pub fn total_duration(ranges: &[TimeRange]) -> f64 {
    ranges.iter().map(TimeRange::duration).sum()
}

/// Where source time `t` lands after the `deletes` have been rippled out.
/// Times inside a deleted range collapse to its start.
pub fn ripple_position(t: f64, deletes: &[TimeRange]) -> f64 {
    let removed: f64 = deletes
        .iter()
        .map(|d| (t.min(d.end) - d.start).max(0.0))
        .sum();
    t - removed
}
