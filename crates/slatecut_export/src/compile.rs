use crate::error::{ExportError, Result};
use crate::graph::{FilterGraph, NodeId, Op, PortRef};
use crate::segments::{group_segments, JoinKind, RunPlan, SegmentPlan};
use serde::{Deserialize, Serialize};
use slatecut_core::gaps::detect_gaps;
use slatecut_core::types::*;
use std::collections::HashMap;
use std::path::PathBuf;
use uuid::Uuid;

/// A compiled export plan ready for ffmpeg execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportPlan {
    pub inputs: Vec<ExportInput>,
    pub graph: FilterGraph,
    pub segments: Vec<Segment>,
    pub output_args: Vec<String>,
    pub output_path: PathBuf,
    pub total_duration_us: TimeUs,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportInput {
    pub path: PathBuf,
    pub index: usize,
}

/// One unit of the final concatenation. Video and audio handles live in
/// the same record, so the two streams cannot drift out of step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Segment {
    pub video: NodeId,
    pub audio: NodeId,
    pub kind: SegmentKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentKind {
    Gap,
    Single,
    Group,
}

/// Compile a project snapshot into an ffmpeg export plan.
///
/// The main spine is every clip on video and image tracks, flattened and
/// sorted by start time. Gaps become synthesized black/silence segments,
/// adjacent clips are merged per their transitions, audio-track clips are
/// mixed over the assembled audio, and text overlays draw over the
/// assembled video last.
pub fn compile(project: &Project) -> Result<ExportPlan> {
    let settings = &project.settings;

    let mut spine: Vec<(&Track, &Clip)> = project
        .timeline
        .tracks
        .iter()
        .filter(|t| matches!(t.kind, TrackKind::Video | TrackKind::Image))
        .flat_map(|t| t.clips.iter().map(move |c| (t, c)))
        .collect();

    if spine.is_empty() {
        return Err(ExportError::NoClips);
    }
    spine.sort_by_key(|(_, c)| c.start_us);

    let audio_overlays: Vec<(&Track, &Clip)> = project
        .timeline
        .tracks
        .iter()
        .filter(|t| t.kind == TrackKind::Audio && !t.muted)
        .flat_map(|t| t.clips.iter().map(move |c| (t, c)))
        .collect();

    // Register demuxer inputs up front, deduplicated by path. Every clip
    // must resolve its asset here or compilation stops before a single
    // instruction is emitted.
    let mut path_to_index: HashMap<PathBuf, usize> = HashMap::new();
    let mut inputs: Vec<ExportInput> = Vec::new();
    let mut media_of_clip: HashMap<Uuid, ClipMedia> = HashMap::new();

    for (_, clip) in spine.iter().chain(audio_overlays.iter()) {
        let asset = project
            .find_asset(clip.asset_id)
            .ok_or(ExportError::MissingMediaSource {
                clip_id: clip.id,
                asset_id: clip.asset_id,
            })?;
        let idx = *path_to_index.entry(asset.path.clone()).or_insert_with(|| {
            let idx = inputs.len();
            inputs.push(ExportInput {
                path: asset.path.clone(),
                index: idx,
            });
            idx
        });
        media_of_clip.insert(
            clip.id,
            ClipMedia {
                input_index: idx,
                asset_kind: asset.kind,
            },
        );
    }

    let spine_clips: Vec<&Clip> = spine.iter().map(|(_, c)| c).copied().collect();
    let gaps = detect_gaps(&spine_clips);
    let plans = group_segments(&spine_clips, &gaps, &project.timeline.transitions);

    tracing::debug!(
        clips = spine.len(),
        gaps = gaps.len(),
        segments = plans.len(),
        "grouped export spine"
    );

    let mut graph = FilterGraph::new();
    let mut segments: Vec<Segment> = Vec::new();
    let mut total_us = TimeUs::ZERO;

    for plan in &plans {
        match plan {
            SegmentPlan::Gap { duration_us } => {
                segments.push(build_gap(&mut graph, *duration_us, settings));
                total_us = total_us + *duration_us;
            }
            SegmentPlan::Run(run) => {
                segments.push(build_run(
                    &mut graph,
                    run,
                    &spine,
                    &media_of_clip,
                    &project.timeline.effects,
                    settings,
                ));
                total_us = total_us + run.total_duration_us;
            }
        }
    }

    // Final assembly: one video and one audio concatenation over the same
    // segment list, in the same order.
    let video_ports: Vec<PortRef> = segments.iter().map(|s| PortRef::Node(s.video)).collect();
    let audio_ports: Vec<PortRef> = segments.iter().map(|s| PortRef::Node(s.audio)).collect();
    let count = segments.len();
    let mut video_out = graph.push(video_ports, Op::ConcatVideo { count });
    let mut audio_out = graph.push(audio_ports, Op::ConcatAudio { count });

    if !audio_overlays.is_empty() {
        audio_out = mix_audio_overlays(&mut graph, audio_out, &audio_overlays, &media_of_clip, settings);
    }

    video_out = draw_overlays(&mut graph, video_out, project, total_us);

    graph.set_outputs(video_out, audio_out);

    let output_args = build_output_args(settings);
    let output_path = PathBuf::from(format!("{}.{}", settings.output_name, settings.container));

    tracing::info!(
        inputs = inputs.len(),
        instructions = graph.len(),
        segments = segments.len(),
        output = %output_path.display(),
        "compiled export plan"
    );

    Ok(ExportPlan {
        inputs,
        graph,
        segments,
        output_args,
        output_path,
        total_duration_us: total_us,
    })
}

// ---------------------------------------------------------------------------
// Per-segment lowering
// ---------------------------------------------------------------------------

/// Synthesized filler for a gap. The normalization steps are the same ops
/// a clip chain ends with; concat rejects streams whose rate or time base
/// differ, so gap and clip paths must stay in lock-step here.
fn build_gap(graph: &mut FilterGraph, duration_us: TimeUs, settings: &ProjectSettings) -> Segment {
    let duration_s = duration_us.as_seconds();

    let video = graph.push(
        vec![],
        Op::GapVideo {
            duration_s,
            width: settings.width,
            height: settings.height,
        },
    );
    let video = push_video_normalize(graph, video, settings);

    let audio = graph.push(
        vec![],
        Op::Silence {
            duration_s,
            sample_rate: settings.sample_rate,
        },
    );
    let audio = push_audio_normalize(graph, audio, settings);

    Segment {
        video,
        audio,
        kind: SegmentKind::Gap,
    }
}

fn build_run(
    graph: &mut FilterGraph,
    run: &RunPlan,
    spine: &[(&Track, &Clip)],
    media_of_clip: &HashMap<Uuid, ClipMedia>,
    effects: &HashMap<Uuid, ClipEffects>,
    settings: &ProjectSettings,
) -> Segment {
    // Per-clip chains first, in clip order.
    let chains: Vec<(NodeId, NodeId)> = run
        .clip_indices
        .iter()
        .map(|&idx| {
            let (track, clip) = spine[idx];
            let media = media_of_clip[&clip.id];
            let video = build_clip_video(graph, media, clip, effects.get(&clip.id), settings);
            let audio = build_clip_audio(graph, media, track, clip, settings);
            (video, audio)
        })
        .collect();

    // Fold the joins left to right. Consecutive concats batch into one
    // N-ary instruction; a cross-fade flushes the batch and joins the two
    // streams with the offset the grouper computed.
    let mut pending: Vec<(NodeId, NodeId)> = vec![chains[0]];
    for (join, &next) in run.joins.iter().zip(&chains[1..]) {
        match *join {
            JoinKind::Concat => pending.push(next),
            JoinKind::Crossfade { kind, offset_us, duration_us } => {
                let (left_v, left_a) = flush_concat(graph, &mut pending);
                let v = graph.push(
                    vec![PortRef::Node(left_v), PortRef::Node(next.0)],
                    Op::Crossfade {
                        kind,
                        offset_s: offset_us.as_seconds(),
                        duration_s: duration_us.as_seconds(),
                    },
                );
                let a = graph.push(
                    vec![PortRef::Node(left_a), PortRef::Node(next.1)],
                    Op::AudioCrossfade {
                        duration_s: duration_us.as_seconds(),
                    },
                );
                pending.push((v, a));
            }
        }
    }
    let (mut video, mut audio) = flush_concat(graph, &mut pending);

    if let Some(fade) = run.fade_in {
        let duration_s = fade.duration_us.as_seconds();
        video = graph.push(
            vec![PortRef::Node(video)],
            Op::Fade { fade_in: true, start_s: 0.0, duration_s },
        );
        audio = graph.push(
            vec![PortRef::Node(audio)],
            Op::AudioFade { fade_in: true, start_s: 0.0, duration_s },
        );
    }
    if let Some(fade) = run.fade_out {
        let duration_s = fade.duration_us.as_seconds();
        let start_s = (run.total_duration_us - fade.duration_us).as_seconds().max(0.0);
        video = graph.push(
            vec![PortRef::Node(video)],
            Op::Fade { fade_in: false, start_s, duration_s },
        );
        audio = graph.push(
            vec![PortRef::Node(audio)],
            Op::AudioFade { fade_in: false, start_s, duration_s },
        );
    }

    let kind = if run.clip_indices.len() == 1 {
        SegmentKind::Single
    } else {
        SegmentKind::Group
    };

    Segment { video, audio, kind }
}

/// Concatenate the pending batch into a single (video, audio) pair,
/// leaving the result as the only pending entry's ancestor.
fn flush_concat(graph: &mut FilterGraph, pending: &mut Vec<(NodeId, NodeId)>) -> (NodeId, NodeId) {
    let result = if pending.len() == 1 {
        pending[0]
    } else {
        let count = pending.len();
        let video_ports = pending.iter().map(|&(v, _)| PortRef::Node(v)).collect();
        let audio_ports = pending.iter().map(|&(_, a)| PortRef::Node(a)).collect();
        let v = graph.push(video_ports, Op::ConcatVideo { count });
        let a = graph.push(audio_ports, Op::ConcatAudio { count });
        (v, a)
    };
    pending.clear();
    result
}

// ---------------------------------------------------------------------------
// Per-clip lowering
// ---------------------------------------------------------------------------

/// Where a clip's media comes from: the demuxer input slot plus the
/// asset kind that picks the normalization path.
#[derive(Debug, Clone, Copy)]
struct ClipMedia {
    input_index: usize,
    asset_kind: AssetKind,
}

fn build_clip_video(
    graph: &mut FilterGraph,
    media: ClipMedia,
    clip: &Clip,
    effects: Option<&ClipEffects>,
    settings: &ProjectSettings,
) -> NodeId {
    let mut node = match media.asset_kind {
        AssetKind::Image => graph.push(
            vec![PortRef::SourceVideo(media.input_index)],
            Op::LoopImage {
                duration_s: clip.visible_duration_us().as_seconds(),
            },
        ),
        _ => {
            let (start_s, end_s) = source_window(clip);
            graph.push(
                vec![PortRef::SourceVideo(media.input_index)],
                Op::TrimVideo { start_s, end_s },
            )
        }
    };

    // Crop works on source fractions, so it precedes the fit to target.
    if let Some(crop) = &clip.crop {
        node = graph.push(
            vec![PortRef::Node(node)],
            Op::Crop {
                x: crop.x_pct / 100.0,
                y: crop.y_pct / 100.0,
                width: crop.width_pct / 100.0,
                height: crop.height_pct / 100.0,
            },
        );
    }

    node = graph.push(
        vec![PortRef::Node(node)],
        Op::Scale { width: settings.width, height: settings.height },
    );
    node = graph.push(
        vec![PortRef::Node(node)],
        Op::Pad { width: settings.width, height: settings.height },
    );

    if let Some(fx) = effects {
        if !fx.is_neutral() {
            node = graph.push(
                vec![PortRef::Node(node)],
                Op::ColorEffects {
                    brightness: fx.brightness,
                    contrast: fx.contrast,
                    saturation: fx.saturation,
                    grayscale: fx.grayscale,
                    sepia: fx.sepia,
                    blur: fx.blur,
                },
            );
        }
    }

    push_video_normalize(graph, node, settings)
}

fn build_clip_audio(
    graph: &mut FilterGraph,
    media: ClipMedia,
    track: &Track,
    clip: &Clip,
    settings: &ProjectSettings,
) -> NodeId {
    let silent = media.asset_kind == AssetKind::Image || clip.audio_muted || track.muted;

    let node = if silent {
        graph.push(
            vec![],
            Op::Silence {
                duration_s: clip.visible_duration_us().as_seconds(),
                sample_rate: settings.sample_rate,
            },
        )
    } else {
        let (start_s, end_s) = source_window(clip);
        let mut node = graph.push(
            vec![PortRef::SourceAudio(media.input_index)],
            Op::TrimAudio { start_s, end_s },
        );
        if track.gain != 1.0 {
            node = graph.push(vec![PortRef::Node(node)], Op::Gain { volume: track.gain });
        }
        node
    };

    push_audio_normalize(graph, node, settings)
}

fn push_video_normalize(graph: &mut FilterGraph, node: NodeId, settings: &ProjectSettings) -> NodeId {
    graph.push(
        vec![PortRef::Node(node)],
        Op::NormalizeRate { fps: settings.fps },
    )
}

fn push_audio_normalize(graph: &mut FilterGraph, node: NodeId, settings: &ProjectSettings) -> NodeId {
    graph.push(
        vec![PortRef::Node(node)],
        Op::NormalizeAudio { sample_rate: settings.sample_rate },
    )
}

fn source_window(clip: &Clip) -> (f64, f64) {
    let start_s = clip.trim_in_us.as_seconds();
    let end_s = (clip.source_duration_us - clip.trim_out_us).as_seconds();
    (start_s, end_s)
}

// ---------------------------------------------------------------------------
// Audio-track mixing and text overlays
// ---------------------------------------------------------------------------

/// Mix audio-track clips over the assembled audio stream: each clip is
/// trimmed, gain-adjusted, edge-faded, delayed to its timeline position,
/// then everything is mixed in one step.
fn mix_audio_overlays(
    graph: &mut FilterGraph,
    base: NodeId,
    overlays: &[(&Track, &Clip)],
    media_of_clip: &HashMap<Uuid, ClipMedia>,
    settings: &ProjectSettings,
) -> NodeId {
    let mut mix_inputs = vec![PortRef::Node(base)];

    for (track, clip) in overlays {
        let input_idx = media_of_clip[&clip.id].input_index;
        let (start_s, end_s) = source_window(clip);
        let visible_s = clip.visible_duration_us().as_seconds();

        let mut node = graph.push(
            vec![PortRef::SourceAudio(input_idx)],
            Op::TrimAudio { start_s, end_s },
        );
        node = push_audio_normalize(graph, node, settings);
        node = graph.push(
            vec![PortRef::Node(node)],
            Op::Gain { volume: track.gain },
        );
        node = graph.push(
            vec![PortRef::Node(node)],
            Op::AudioFade { fade_in: true, start_s: 0.0, duration_s: 0.1 },
        );
        node = graph.push(
            vec![PortRef::Node(node)],
            Op::AudioFade {
                fade_in: false,
                start_s: (visible_s - 0.1).max(0.0),
                duration_s: 0.1,
            },
        );
        node = graph.push(
            vec![PortRef::Node(node)],
            Op::Delay { delay_ms: clip.start_us.0 / 1000 },
        );
        mix_inputs.push(PortRef::Node(node));
    }

    let count = mix_inputs.len();
    graph.push(mix_inputs, Op::Mix { count })
}

/// Draw text overlays over the assembled video, one timed instruction per
/// overlay in creation order, windows clamped to the assembled timeline.
fn draw_overlays(
    graph: &mut FilterGraph,
    base: NodeId,
    project: &Project,
    total_us: TimeUs,
) -> NodeId {
    let total_s = total_us.as_seconds();
    let mut node = base;

    for overlay in &project.timeline.overlays {
        let hidden = project
            .timeline
            .find_track(overlay.track_id)
            .map(|t| t.muted)
            .unwrap_or(false);
        if hidden {
            continue;
        }

        let start_s = overlay.start_us.as_seconds().clamp(0.0, total_s);
        let end_s = overlay.end_us().as_seconds().clamp(0.0, total_s);
        if end_s <= start_s {
            continue;
        }

        node = graph.push(
            vec![PortRef::Node(node)],
            Op::DrawText {
                text: overlay.text.clone(),
                font_size: overlay.font_size,
                color: overlay.color.clone(),
                x_pct: overlay.x_pct,
                y_pct: overlay.y_pct,
                start_s,
                end_s,
            },
        );
    }

    node
}

// ---------------------------------------------------------------------------
// Output arguments
// ---------------------------------------------------------------------------

fn build_output_args(settings: &ProjectSettings) -> Vec<String> {
    vec![
        "-map".to_string(),
        "[outv]".to_string(),
        "-map".to_string(),
        "[outa]".to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-crf".to_string(),
        "23".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        "192k".to_string(),
        "-ar".to_string(),
        settings.sample_rate.to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-vsync".to_string(),
        "cfr".to_string(),
        "-r".to_string(),
        format!("{}", settings.fps),
    ]
}
