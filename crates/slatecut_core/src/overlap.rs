use crate::types::*;
use uuid::Uuid;

/// Starts within this distance of the previous clip's end are treated as
/// coincident noise from UI drag math, not real overlaps (0.001s).
pub const OVERLAP_EPSILON_US: i64 = 1_000;

/// Check if two clips' visible intervals intersect.
/// Intervals are half-open `[start, end)`, so touching edges do not overlap.
pub fn clips_overlap(a: &Clip, b: &Clip) -> bool {
    let a_start = a.start_us.0;
    let a_end = a.end_us().0;
    let b_start = b.start_us.0;
    let b_end = b.end_us().0;

    a_start < b_end && b_start < a_end
}

/// Compact a track's clips left-to-right so no two visible intervals overlap.
///
/// Clips are sorted by start time; any clip starting more than the epsilon
/// before the previous clip's end is pushed right to exactly that end. Clips
/// already spaced correctly are never moved, and running the resolver twice
/// yields the same arrangement as running it once.
pub fn resolve_overlaps(track: &mut Track) {
    track.clips.sort_by_key(|c| c.start_us);

    let mut previous_end = 0i64;
    for clip in &mut track.clips {
        if clip.start_us.0 < previous_end - OVERLAP_EPSILON_US {
            clip.start_us = TimeUs(previous_end);
        }
        previous_end = clip.end_us().0;
    }
}

/// True iff any clip other than `exclude_id` intersects
/// `[start, start + duration)`.
pub fn has_collision(
    track: &Track,
    start_us: TimeUs,
    duration_us: TimeUs,
    exclude_id: Option<Uuid>,
) -> bool {
    let end = start_us.0 + duration_us.0;
    track.clips.iter().any(|c| {
        Some(c.id) != exclude_id && c.start_us.0 < end && start_us.0 < c.end_us().0
    })
}

/// Find a position for a clip of `duration_us` near `preferred_us`.
///
/// When the preferred position is free it is returned (clamped to zero).
/// Otherwise the gaps between existing clips and the trailing gap after the
/// last clip are scanned, and the gap start closest to the preferred time
/// among gaps large enough to hold the duration wins.
pub fn find_open_position(
    track: &Track,
    preferred_us: TimeUs,
    duration_us: TimeUs,
    exclude_id: Option<Uuid>,
) -> TimeUs {
    let preferred = TimeUs(preferred_us.0.max(0));

    if !has_collision(track, preferred, duration_us, exclude_id) {
        return preferred;
    }

    let mut others: Vec<&Clip> = track
        .clips
        .iter()
        .filter(|c| Some(c.id) != exclude_id)
        .collect();
    others.sort_by_key(|c| c.start_us);

    let mut best: Option<TimeUs> = None;
    let mut best_dist = i64::MAX;
    let mut consider = |candidate: i64| {
        let dist = (candidate - preferred.0).abs();
        if dist < best_dist {
            best = Some(TimeUs(candidate));
            best_dist = dist;
        }
    };

    // Leading gap before the first clip
    if let Some(first) = others.first() {
        if first.start_us.0 >= duration_us.0 {
            consider(0);
        }
    }

    // Gaps between consecutive clips
    for pair in others.windows(2) {
        let gap_start = pair[0].end_us().0;
        let gap_len = pair[1].start_us.0 - gap_start;
        if gap_len >= duration_us.0 {
            consider(gap_start);
        }
    }

    // Trailing gap after the last clip always fits
    if let Some(last) = others.last() {
        consider(last.end_us().0);
    }

    match best {
        Some(pos) => pos,
        None => others
            .last()
            .map(|c| c.end_us())
            .unwrap_or(preferred),
    }
}
