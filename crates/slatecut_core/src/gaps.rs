use crate::types::{Clip, TimeUs};

/// Gaps narrower than this are floating-point noise, not real gaps.
pub const GAP_EPSILON_US: i64 = 10_000;

/// A hole in a track's clip sequence: `duration_us` of empty time before
/// the clip at `before_index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gap {
    pub before_index: usize,
    pub duration_us: TimeUs,
}

/// Detect gaps in a clip sequence already sorted by start time.
///
/// A gap exists before clip `i` when its start exceeds the previous clip's
/// end by more than [`GAP_EPSILON_US`]; the first clip compares against
/// time zero. The compiler synthesizes filler for each reported gap.
pub fn detect_gaps(clips: &[&Clip]) -> Vec<Gap> {
    let mut gaps = Vec::new();
    let mut previous_end = TimeUs::ZERO;

    for (i, clip) in clips.iter().enumerate() {
        let lead = clip.start_us - previous_end;
        if lead.0 > GAP_EPSILON_US {
            gaps.push(Gap {
                before_index: i,
                duration_us: lead,
            });
        }
        previous_end = clip.end_us();
    }

    gaps
}
