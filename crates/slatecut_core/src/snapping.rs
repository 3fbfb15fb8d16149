use crate::types::{TimeUs, Track};
use uuid::Uuid;

/// Maximum distance at which a dragged edge snaps to a neighbor.
pub const SNAP_THRESHOLD_US: i64 = 200_000;

/// Candidate snap points on a track: time zero plus every other clip's
/// start and end, sorted and deduplicated.
pub fn collect_snap_points(track: &Track, exclude_id: Option<Uuid>) -> Vec<TimeUs> {
    let mut points = vec![TimeUs::ZERO];
    for clip in &track.clips {
        if Some(clip.id) == exclude_id {
            continue;
        }
        points.push(clip.start_us);
        points.push(clip.end_us());
    }
    points.sort();
    points.dedup();
    points
}

/// Nearest snap point within the threshold; a position with no candidate
/// in range passes through unchanged.
pub fn find_snap_point(
    position_us: TimeUs,
    snap_points: &[TimeUs],
    threshold_us: TimeUs,
) -> TimeUs {
    let mut best = position_us;
    let mut best_dist = i64::MAX;
    for &point in snap_points {
        let dist = (position_us - point).0.abs();
        if dist <= threshold_us.0 && dist < best_dist {
            best = point;
            best_dist = dist;
        }
    }
    best
}

/// Snap a dragged clip's start to the nearest candidate point; when the
/// start has none in range, try the clip's trailing edge instead. The
/// returned start time is clamped to zero.
pub fn apply_snapping(
    track: &Track,
    start_us: TimeUs,
    duration_us: TimeUs,
    exclude_id: Option<Uuid>,
) -> TimeUs {
    let points = collect_snap_points(track, exclude_id);
    let threshold = TimeUs(SNAP_THRESHOLD_US);

    // An exactly aligned start still wins over an end-edge candidate.
    let snapped = find_snap_point(start_us, &points, threshold);
    if snapped != start_us || points.contains(&start_us) {
        return TimeUs(snapped.0.max(0));
    }

    let end_us = start_us + duration_us;
    let snapped_end = find_snap_point(end_us, &points, threshold);
    if snapped_end != end_us {
        return TimeUs((snapped_end - duration_us).0.max(0));
    }

    TimeUs(start_us.0.max(0))
}
