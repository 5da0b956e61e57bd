use sha2::{Digest, Sha256};

use super::timeline::{ElementKind, Track};

/// Canonical text form of the timeline used for change detection.
///
/// Covers every element's id, kind, timing, trims and media reference, plus
/// caption content for text elements.
pub fn fingerprint_string(tracks: &[Track]) -> String {
    let mut out = String::new();
    for track in tracks {
        out.push_str(&format!("T|{}|{:?}\n", track.id, track.kind));
        for el in &track.elements {
            out.push_str(&format!(
                "E|{}|{:?}|{:.6}|{:.6}|{:.6}|{:.6}|{}",
                el.id,
                el.kind,
                el.start_time,
                el.duration,
                el.trim_start,
                el.trim_end,
                el.media_id.as_deref().unwrap_or("")
            ));
            if el.kind == ElementKind::Text {
                out.push('|');
                out.push_str(el.content.as_deref().unwrap_or(""));
            }
            out.push('\n');
        }
    }
    out
}

/// SHA-256 hex digest of [`fingerprint_string`].
pub fn tracks_fingerprint(tracks: &[Track]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(fingerprint_string(tracks).as_bytes());
    format!("{:x}", hasher.finalize())
}
