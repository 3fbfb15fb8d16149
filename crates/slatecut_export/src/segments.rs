use slatecut_core::gaps::Gap;
use slatecut_core::types::{Clip, TimeUs, Transition, TransitionEdge, TransitionKind};
use std::collections::HashMap;
use uuid::Uuid;

/// A junction overlap may cover at most this share of either neighbor, so
/// a cross-fade can never outlast one of its sources.
const MAX_OVERLAP_RATIO: f64 = 0.9;

/// How two adjacent clips in a run are joined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JoinKind {
    /// Hard cut: the next clip starts exactly where the previous ended.
    Concat,
    /// Cross-fade of `duration_us` starting `offset_us` into the merged
    /// stream built so far.
    Crossfade {
        kind: TransitionKind,
        offset_us: TimeUs,
        duration_us: TimeUs,
    },
}

/// A fade applied at the outer edge of a run. This is what a junction
/// transition degenerates to when the neighbor is a gap or the list end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeFade {
    pub kind: TransitionKind,
    pub duration_us: TimeUs,
}

/// A maximal run of adjacent clips and the joins between them.
/// `clip_indices` index into the spine the grouper was given;
/// `joins.len() == clip_indices.len() - 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct RunPlan {
    pub clip_indices: Vec<usize>,
    pub joins: Vec<JoinKind>,
    pub fade_in: Option<EdgeFade>,
    pub fade_out: Option<EdgeFade>,
    /// Duration of the merged run (cross-fade overlaps already deducted).
    pub total_duration_us: TimeUs,
}

/// One unit of the compiled output, in final concatenation order.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentPlan {
    Gap { duration_us: TimeUs },
    Run(RunPlan),
}

/// Group a sorted clip spine into gap and run segments.
///
/// Adjacency means "no gap recorded between clip i and i+1". At each
/// junction inside a run, the transition stored on the right clip's start
/// edge wins over the one on the left clip's end edge; the entry that is
/// found settles the junction and the other is never consulted again. A
/// non-none transition joins the pair with a cross-fade, anything else
/// with a hard concat.
pub fn group_segments(
    clips: &[&Clip],
    gaps: &[Gap],
    transitions: &[Transition],
) -> Vec<SegmentPlan> {
    let gap_map: HashMap<usize, TimeUs> = gaps
        .iter()
        .map(|g| (g.before_index, g.duration_us))
        .collect();
    let transition_map: HashMap<(Uuid, TransitionEdge), &Transition> = transitions
        .iter()
        .map(|t| ((t.clip_id, t.edge), t))
        .collect();

    let mut segments = Vec::new();
    let mut i = 0;
    while i < clips.len() {
        if let Some(&duration_us) = gap_map.get(&i) {
            segments.push(SegmentPlan::Gap { duration_us });
        }

        // Maximal adjacent run starting at i.
        let mut end = i;
        while end + 1 < clips.len() && !gap_map.contains_key(&(end + 1)) {
            end += 1;
        }

        segments.push(SegmentPlan::Run(build_run(clips, i, end, &transition_map)));
        i = end + 1;
    }

    segments
}

fn build_run(
    clips: &[&Clip],
    first: usize,
    last: usize,
    transition_map: &HashMap<(Uuid, TransitionEdge), &Transition>,
) -> RunPlan {
    let clip_indices: Vec<usize> = (first..=last).collect();
    let mut joins = Vec::with_capacity(last - first);
    let mut cumulative = clips[first].visible_duration_us();

    for i in first..last {
        let left = clips[i];
        let right = clips[i + 1];

        let junction = transition_map
            .get(&(right.id, TransitionEdge::Start))
            .or_else(|| transition_map.get(&(left.id, TransitionEdge::End)));

        let join = match junction {
            Some(t) if t.kind != TransitionKind::None => {
                let overlap = clamp_overlap(t.duration_us, left, right);
                if overlap.0 <= 0 {
                    JoinKind::Concat
                } else {
                    let join = JoinKind::Crossfade {
                        kind: t.kind,
                        offset_us: cumulative - overlap,
                        duration_us: overlap,
                    };
                    cumulative = cumulative + right.visible_duration_us() - overlap;
                    join
                }
            }
            _ => JoinKind::Concat,
        };
        if matches!(join, JoinKind::Concat) {
            cumulative = cumulative + right.visible_duration_us();
        }
        joins.push(join);
    }

    let fade_in = edge_fade(transition_map, clips[first], TransitionEdge::Start);
    let fade_out = edge_fade(transition_map, clips[last], TransitionEdge::End);

    RunPlan {
        clip_indices,
        joins,
        fade_in,
        fade_out,
        total_duration_us: cumulative,
    }
}

/// Cap the overlap at 90% of either neighbor's visible duration.
fn clamp_overlap(requested: TimeUs, left: &Clip, right: &Clip) -> TimeUs {
    let left_cap = (left.visible_duration_us().0 as f64 * MAX_OVERLAP_RATIO) as i64;
    let right_cap = (right.visible_duration_us().0 as f64 * MAX_OVERLAP_RATIO) as i64;
    TimeUs(requested.0.min(left_cap).min(right_cap))
}

fn edge_fade(
    transition_map: &HashMap<(Uuid, TransitionEdge), &Transition>,
    clip: &Clip,
    edge: TransitionEdge,
) -> Option<EdgeFade> {
    let t = transition_map.get(&(clip.id, edge))?;
    if t.kind == TransitionKind::None {
        return None;
    }
    Some(EdgeFade {
        kind: t.kind,
        duration_us: TimeUs(t.duration_us.0.min(clip.visible_duration_us().0)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use slatecut_core::gaps::detect_gaps;

    fn make_clip(start_us: i64, duration_us: i64) -> Clip {
        Clip::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "clip",
            TimeUs(start_us),
            TimeUs(duration_us),
        )
    }

    fn make_transition(clip_id: Uuid, edge: TransitionEdge, kind: TransitionKind, duration_us: i64) -> Transition {
        Transition {
            id: Uuid::new_v4(),
            clip_id,
            edge,
            kind,
            duration_us: TimeUs(duration_us),
        }
    }

    fn plan(clips: &[Clip], transitions: &[Transition]) -> Vec<SegmentPlan> {
        let refs: Vec<&Clip> = clips.iter().collect();
        let gaps = detect_gaps(&refs);
        group_segments(&refs, &gaps, transitions)
    }

    fn run_of(segment: &SegmentPlan) -> &RunPlan {
        match segment {
            SegmentPlan::Run(run) => run,
            other => panic!("expected run, got {other:?}"),
        }
    }

    // -----------------------------------------------------------------------
    // run formation
    // -----------------------------------------------------------------------

    #[test]
    fn adjacent_clips_form_one_run() {
        let clips = vec![
            make_clip(0, 3_000_000),
            make_clip(3_000_000, 2_000_000),
            make_clip(5_000_000, 4_000_000),
        ];
        let segments = plan(&clips, &[]);

        assert_eq!(segments.len(), 1);
        let run = run_of(&segments[0]);
        assert_eq!(run.clip_indices, vec![0, 1, 2]);
        assert_eq!(run.joins, vec![JoinKind::Concat, JoinKind::Concat]);
        assert_eq!(run.total_duration_us, TimeUs(9_000_000));
    }

    #[test]
    fn gaps_isolate_runs() {
        let clips = vec![
            make_clip(0, 3_000_000),
            make_clip(5_000_000, 2_000_000),
            make_clip(7_000_000, 1_000_000),
        ];
        let segments = plan(&clips, &[]);

        assert_eq!(segments.len(), 3);
        assert_eq!(run_of(&segments[0]).clip_indices, vec![0]);
        assert!(matches!(segments[1], SegmentPlan::Gap { duration_us: TimeUs(2_000_000) }));
        let second = run_of(&segments[2]);
        assert_eq!(second.clip_indices, vec![1, 2]);
    }

    #[test]
    fn leading_gap_comes_first() {
        let clips = vec![make_clip(2_000_000, 3_000_000)];
        let segments = plan(&clips, &[]);

        assert_eq!(segments.len(), 2);
        assert!(matches!(segments[0], SegmentPlan::Gap { duration_us: TimeUs(2_000_000) }));
        assert_eq!(run_of(&segments[1]).clip_indices, vec![0]);
    }

    #[test]
    fn empty_spine_produces_no_segments() {
        assert!(plan(&[], &[]).is_empty());
    }

    // -----------------------------------------------------------------------
    // junction transitions
    // -----------------------------------------------------------------------

    #[test]
    fn transition_on_one_junction_merges_whole_run() {
        // Transition only between clips 2 and 3: still one run of all
        // three, concat then cross-fade.
        let clips = vec![
            make_clip(0, 3_000_000),
            make_clip(3_000_000, 3_000_000),
            make_clip(6_000_000, 3_000_000),
        ];
        let transitions = vec![make_transition(
            clips[2].id,
            TransitionEdge::Start,
            TransitionKind::Fade,
            1_000_000,
        )];
        let segments = plan(&clips, &transitions);

        assert_eq!(segments.len(), 1);
        let run = run_of(&segments[0]);
        assert_eq!(run.clip_indices, vec![0, 1, 2]);
        assert_eq!(run.joins[0], JoinKind::Concat);
        assert_eq!(
            run.joins[1],
            JoinKind::Crossfade {
                kind: TransitionKind::Fade,
                offset_us: TimeUs(5_000_000),
                duration_us: TimeUs(1_000_000),
            }
        );
        assert_eq!(run.total_duration_us, TimeUs(8_000_000));
    }

    #[test]
    fn start_transition_wins_over_end_transition() {
        let clips = vec![make_clip(0, 4_000_000), make_clip(4_000_000, 4_000_000)];
        let transitions = vec![
            make_transition(clips[0].id, TransitionEdge::End, TransitionKind::Fade, 500_000),
            make_transition(clips[1].id, TransitionEdge::Start, TransitionKind::Dissolve, 1_000_000),
        ];
        let segments = plan(&clips, &transitions);

        let run = run_of(&segments[0]);
        assert_eq!(
            run.joins[0],
            JoinKind::Crossfade {
                kind: TransitionKind::Dissolve,
                offset_us: TimeUs(3_000_000),
                duration_us: TimeUs(1_000_000),
            }
        );
    }

    #[test]
    fn end_transition_applies_when_start_is_absent() {
        let clips = vec![make_clip(0, 4_000_000), make_clip(4_000_000, 4_000_000)];
        let transitions = vec![make_transition(
            clips[0].id,
            TransitionEdge::End,
            TransitionKind::WipeLeft,
            800_000,
        )];
        let segments = plan(&clips, &transitions);

        let run = run_of(&segments[0]);
        assert!(matches!(
            run.joins[0],
            JoinKind::Crossfade { kind: TransitionKind::WipeLeft, .. }
        ));
    }

    #[test]
    fn none_transition_found_first_settles_junction_as_concat() {
        // An explicit none on the right clip's start shadows the fade on
        // the left clip's end.
        let clips = vec![make_clip(0, 4_000_000), make_clip(4_000_000, 4_000_000)];
        let transitions = vec![
            make_transition(clips[0].id, TransitionEdge::End, TransitionKind::Fade, 500_000),
            make_transition(clips[1].id, TransitionEdge::Start, TransitionKind::None, 500_000),
        ];
        let segments = plan(&clips, &transitions);

        assert_eq!(run_of(&segments[0]).joins[0], JoinKind::Concat);
    }

    #[test]
    fn overlap_clamps_to_ninety_percent_of_shorter_clip() {
        let clips = vec![make_clip(0, 2_000_000), make_clip(2_000_000, 10_000_000)];
        let transitions = vec![make_transition(
            clips[1].id,
            TransitionEdge::Start,
            TransitionKind::Fade,
            5_000_000,
        )];
        let segments = plan(&clips, &transitions);

        let run = run_of(&segments[0]);
        assert_eq!(
            run.joins[0],
            JoinKind::Crossfade {
                kind: TransitionKind::Fade,
                offset_us: TimeUs(200_000),
                duration_us: TimeUs(1_800_000),
            }
        );
        // 2s + 10s - 1.8s overlap.
        assert_eq!(run.total_duration_us, TimeUs(10_200_000));
    }

    #[test]
    fn offsets_accumulate_across_crossfades() {
        let clips = vec![
            make_clip(0, 4_000_000),
            make_clip(4_000_000, 6_000_000),
            make_clip(10_000_000, 5_000_000),
        ];
        let transitions = vec![
            make_transition(clips[1].id, TransitionEdge::Start, TransitionKind::Fade, 1_000_000),
            make_transition(clips[2].id, TransitionEdge::Start, TransitionKind::Fade, 1_000_000),
        ];
        let segments = plan(&clips, &transitions);

        let run = run_of(&segments[0]);
        assert_eq!(
            run.joins[0],
            JoinKind::Crossfade {
                kind: TransitionKind::Fade,
                offset_us: TimeUs(3_000_000),
                duration_us: TimeUs(1_000_000),
            }
        );
        // After the first join the merged stream is 4+6-1 = 9s long.
        assert_eq!(
            run.joins[1],
            JoinKind::Crossfade {
                kind: TransitionKind::Fade,
                offset_us: TimeUs(8_000_000),
                duration_us: TimeUs(1_000_000),
            }
        );
        assert_eq!(run.total_duration_us, TimeUs(13_000_000));
    }

    // -----------------------------------------------------------------------
    // edge fades
    // -----------------------------------------------------------------------

    #[test]
    fn run_first_start_transition_degenerates_to_fade_in() {
        // A gap precedes the second clip, so its start transition has no
        // left neighbor to cross-fade with.
        let clips = vec![make_clip(0, 10_000_000), make_clip(12_000_000, 8_000_000)];
        let transitions = vec![make_transition(
            clips[1].id,
            TransitionEdge::Start,
            TransitionKind::Fade,
            1_000_000,
        )];
        let segments = plan(&clips, &transitions);

        assert_eq!(segments.len(), 3);
        let second = run_of(&segments[2]);
        assert_eq!(second.joins.len(), 0);
        assert_eq!(
            second.fade_in,
            Some(EdgeFade { kind: TransitionKind::Fade, duration_us: TimeUs(1_000_000) })
        );
        assert_eq!(second.fade_out, None);
    }

    #[test]
    fn run_last_end_transition_becomes_fade_out() {
        let clips = vec![make_clip(0, 5_000_000)];
        let transitions = vec![
            make_transition(clips[0].id, TransitionEdge::Start, TransitionKind::Fade, 500_000),
            make_transition(clips[0].id, TransitionEdge::End, TransitionKind::Fade, 700_000),
        ];
        let segments = plan(&clips, &transitions);

        let run = run_of(&segments[0]);
        assert_eq!(
            run.fade_in,
            Some(EdgeFade { kind: TransitionKind::Fade, duration_us: TimeUs(500_000) })
        );
        assert_eq!(
            run.fade_out,
            Some(EdgeFade { kind: TransitionKind::Fade, duration_us: TimeUs(700_000) })
        );
    }

    #[test]
    fn junction_transitions_do_not_leak_into_edge_fades() {
        // Start of the second clip is consumed by the junction; the run
        // must not also fade in.
        let clips = vec![make_clip(0, 4_000_000), make_clip(4_000_000, 4_000_000)];
        let transitions = vec![make_transition(
            clips[1].id,
            TransitionEdge::Start,
            TransitionKind::Fade,
            1_000_000,
        )];
        let segments = plan(&clips, &transitions);

        let run = run_of(&segments[0]);
        assert!(matches!(run.joins[0], JoinKind::Crossfade { .. }));
        assert_eq!(run.fade_in, None);
    }

    #[test]
    fn edge_fade_clamps_to_clip_duration() {
        let clips = vec![make_clip(0, 2_000_000)];
        let transitions = vec![make_transition(
            clips[0].id,
            TransitionEdge::Start,
            TransitionKind::Fade,
            5_000_000,
        )];
        let segments = plan(&clips, &transitions);

        assert_eq!(
            run_of(&segments[0]).fade_in,
            Some(EdgeFade { kind: TransitionKind::Fade, duration_us: TimeUs(2_000_000) })
        );
    }
}
