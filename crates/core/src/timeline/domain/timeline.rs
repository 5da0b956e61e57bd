use serde::{Deserialize, Serialize};

use crate::shared::time_range::TimeRange;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
    Text,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Media,
    Text,
}

/// A clip placed on a track.
///
/// `trim_start` is the offset into the source media where playback begins
/// and `trim_end` the amount cut from the source tail; `duration` is the
/// visible length on the timeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineElement {
    pub id: String,
    pub kind: ElementKind,
    pub start_time: f64,
    pub duration: f64,
    #[serde(default)]
    pub trim_start: f64,
    #[serde(default)]
    pub trim_end: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_id: Option<String>,
    /// Caption text for text elements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl TimelineElement {
    pub fn media(id: &str, media_id: &str, start_time: f64, duration: f64) -> Self {
        Self {
            id: id.to_string(),
            kind: ElementKind::Media,
            start_time,
            duration,
            trim_start: 0.0,
            trim_end: 0.0,
            media_id: Some(media_id.to_string()),
            content: None,
        }
    }

    pub fn caption(id: &str, content: &str, start_time: f64, duration: f64) -> Self {
        Self {
            id: id.to_string(),
            kind: ElementKind::Text,
            start_time,
            duration,
            trim_start: 0.0,
            trim_end: 0.0,
            media_id: None,
            content: Some(content.to_string()),
        }
    }

    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }

    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.start_time, self.end_time())
    }

    /// Splits at absolute timeline time `t`, returning the left and right
    /// parts. Both keep the media reference; only timing and trims change.
    /// Returns `None` when `t` is not strictly inside the element.
    pub fn split_at(&self, t: f64, right_id: String) -> Option<(Self, Self)> {
        if !self.range().contains(t) {
            return None;
        }
        let left_len = t - self.start_time;
        let right_len = self.end_time() - t;

        let mut left = self.clone();
        left.duration = left_len;
        left.trim_end = self.trim_end + right_len;

        let mut right = self.clone();
        right.id = right_id;
        right.start_time = t;
        right.duration = right_len;
        right.trim_start = self.trim_start + left_len;

        Some((left, right))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub kind: TrackKind,
    #[serde(default)]
    pub elements: Vec<TimelineElement>,
}

impl Track {
    pub fn new(id: &str, kind: TrackKind, elements: Vec<TimelineElement>) -> Self {
        Self {
            id: id.to_string(),
            kind,
            elements,
        }
    }
}

/// End of the last element on any track.
pub fn timeline_duration(tracks: &[Track]) -> f64 {
    tracks
        .iter()
        .flat_map(|t| t.elements.iter())
        .map(TimelineElement::end_time)
        .fold(0.0, f64::max)
}

pub fn element_count(tracks: &[Track]) -> usize {
    tracks.iter().map(|t| t.elements.len()).sum()
}
