use serde::{Deserialize, Serialize};
use slatecut_core::types::TransitionKind;

/// Identity of one instruction in the filter graph. Instructions reference
/// each other through these indices; textual labels exist only in the
/// rendered output, so labels cannot collide or dangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// An instruction input: a raw demuxer stream or a prior instruction's
/// output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortRef {
    SourceVideo(usize),
    SourceAudio(usize),
    Node(NodeId),
}

/// One filter instruction: an operation applied to zero or more inputs,
/// producing exactly one output stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub inputs: Vec<PortRef>,
    pub op: Op,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Filter operations understood by the renderer. Times are seconds,
/// dimensions are output pixels. Each variant renders to one ffmpeg
/// filter-chain statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Op {
    /// Cut a source video stream to a source-time window and rebase pts.
    TrimVideo { start_s: f64, end_s: f64 },
    /// Cut a source audio stream to a source-time window and rebase pts.
    TrimAudio { start_s: f64, end_s: f64 },
    /// Extend a still image into a video stream of fixed duration.
    LoopImage { duration_s: f64 },
    /// Synthesized silence (source instruction, no inputs).
    Silence { duration_s: f64, sample_rate: u32 },
    /// Synthesized black video for a gap (source instruction, no inputs).
    GapVideo { duration_s: f64, width: u32, height: u32 },
    /// Fit within the target frame, preserving aspect ratio.
    Scale { width: u32, height: u32 },
    /// Pad to the exact target frame, centered.
    Pad { width: u32, height: u32 },
    /// Crop to a sub-rectangle given as fractions of the input frame.
    Crop { x: f64, y: f64, width: f64, height: f64 },
    /// Per-clip color pipeline; neutral parts are omitted from the body.
    ColorEffects {
        brightness: f64,
        contrast: f64,
        saturation: f64,
        grayscale: bool,
        sepia: bool,
        blur: f64,
    },
    /// Frame-rate and time-base normalization. Every video path, clip or
    /// gap, must pass through this with the same parameters before any
    /// merge, or concat/xfade will reject the streams.
    NormalizeRate { fps: f64 },
    /// Sample-rate and channel-layout normalization for audio paths.
    NormalizeAudio { sample_rate: u32 },
    /// Volume adjustment.
    Gain { volume: f64 },
    /// Shift audio right to its timeline position.
    Delay { delay_ms: i64 },
    /// Video fade at a clip edge.
    Fade { fade_in: bool, start_s: f64, duration_s: f64 },
    /// Audio fade at a clip edge.
    AudioFade { fade_in: bool, start_s: f64, duration_s: f64 },
    /// Two-input video cross-fade at `offset_s` into the joined stream.
    Crossfade { kind: TransitionKind, offset_s: f64, duration_s: f64 },
    /// Two-input audio cross-fade matching a video [`Op::Crossfade`].
    AudioCrossfade { duration_s: f64 },
    /// N-input video concatenation.
    ConcatVideo { count: usize },
    /// N-input audio concatenation.
    ConcatAudio { count: usize },
    /// Mix N audio streams.
    Mix { count: usize },
    /// Timed text drawn over the assembled video.
    DrawText {
        text: String,
        font_size: u32,
        color: String,
        x_pct: f64,
        y_pct: f64,
        start_s: f64,
        end_s: f64,
    },
}

impl Op {
    /// Render the ffmpeg filter-chain body for this operation.
    pub fn body(&self) -> String {
        match self {
            Op::TrimVideo { start_s, end_s } => {
                format!("trim=start={start_s}:end={end_s},setpts=PTS-STARTPTS")
            }
            Op::TrimAudio { start_s, end_s } => {
                format!("atrim=start={start_s}:end={end_s},asetpts=PTS-STARTPTS")
            }
            Op::LoopImage { duration_s } => {
                format!("loop=loop=-1:size=1,trim=duration={duration_s},setpts=PTS-STARTPTS")
            }
            Op::Silence { duration_s, sample_rate } => {
                format!(
                    "anullsrc=channel_layout=stereo:sample_rate={sample_rate},atrim=duration={duration_s},asetpts=PTS-STARTPTS"
                )
            }
            Op::GapVideo { duration_s, width, height } => {
                format!("color=c=black:s={width}x{height}:d={duration_s}")
            }
            Op::Scale { width, height } => {
                format!("scale={width}:{height}:force_original_aspect_ratio=decrease")
            }
            Op::Pad { width, height } => {
                format!("pad={width}:{height}:(ow-iw)/2:(oh-ih)/2")
            }
            Op::Crop { x, y, width, height } => {
                format!("crop=iw*{width}:ih*{height}:iw*{x}:ih*{y}")
            }
            Op::ColorEffects {
                brightness,
                contrast,
                saturation,
                grayscale,
                sepia,
                blur,
            } => {
                let mut parts: Vec<String> = Vec::new();
                let mut eq: Vec<String> = Vec::new();
                if *brightness != 0.0 {
                    eq.push(format!("brightness={brightness}"));
                }
                if *contrast != 1.0 {
                    eq.push(format!("contrast={contrast}"));
                }
                if *saturation != 1.0 {
                    eq.push(format!("saturation={saturation}"));
                }
                if !eq.is_empty() {
                    parts.push(format!("eq={}", eq.join(":")));
                }
                if *grayscale {
                    parts.push("hue=s=0".to_string());
                }
                if *sepia {
                    parts.push(
                        "colorchannelmixer=.393:.769:.189:0:.349:.686:.168:0:.272:.534:.131"
                            .to_string(),
                    );
                }
                if *blur > 0.0 {
                    parts.push(format!("gblur=sigma={blur}"));
                }
                if parts.is_empty() {
                    "null".to_string()
                } else {
                    parts.join(",")
                }
            }
            Op::NormalizeRate { fps } => {
                format!("fps={fps},settb=AVTB,format=yuv420p")
            }
            Op::NormalizeAudio { sample_rate } => {
                format!("aformat=sample_rates={sample_rate}:channel_layouts=stereo")
            }
            Op::Gain { volume } => format!("volume={volume}"),
            Op::Delay { delay_ms } => format!("adelay={delay_ms}|{delay_ms}"),
            Op::Fade { fade_in, start_s, duration_s } => {
                let direction = if *fade_in { "in" } else { "out" };
                format!("fade=t={direction}:st={start_s}:d={duration_s}")
            }
            Op::AudioFade { fade_in, start_s, duration_s } => {
                let direction = if *fade_in { "in" } else { "out" };
                format!("afade=t={direction}:st={start_s}:d={duration_s}")
            }
            Op::Crossfade { kind, offset_s, duration_s } => {
                format!(
                    "xfade=transition={}:duration={duration_s}:offset={offset_s}",
                    xfade_name(*kind)
                )
            }
            Op::AudioCrossfade { duration_s } => {
                format!("acrossfade=d={duration_s}")
            }
            Op::ConcatVideo { count } => format!("concat=n={count}:v=1:a=0"),
            Op::ConcatAudio { count } => format!("concat=n={count}:v=0:a=1"),
            Op::Mix { count } => {
                format!("amix=inputs={count}:duration=longest:dropout_transition=0")
            }
            Op::DrawText {
                text,
                font_size,
                color,
                x_pct,
                y_pct,
                start_s,
                end_s,
            } => {
                // Escape single quotes for ffmpeg; hex colors drop the '#'.
                let escaped_text = text.replace('\'', "'\\''");
                let ffmpeg_color = color.strip_prefix('#').unwrap_or(color);
                let x = x_pct / 100.0;
                let y = y_pct / 100.0;
                format!(
                    "drawtext=text='{escaped_text}':fontsize={font_size}:fontcolor=0x{ffmpeg_color}:x=(w-text_w)*{x}:y=(h-text_h)*{y}:enable='between(t,{start_s},{end_s})'"
                )
            }
        }
    }
}

fn xfade_name(kind: TransitionKind) -> &'static str {
    match kind {
        TransitionKind::None | TransitionKind::Fade => "fade",
        TransitionKind::Dissolve => "dissolve",
        TransitionKind::WipeLeft => "wipeleft",
        TransitionKind::WipeRight => "wiperight",
    }
}

// ---------------------------------------------------------------------------
// FilterGraph
// ---------------------------------------------------------------------------

/// Append-only instruction arena plus the designated final outputs.
///
/// Rendering assigns each instruction the label `n<index>`; the two final
/// instructions render as `outv` and `outa` for the muxer's `-map` flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterGraph {
    nodes: Vec<Node>,
    final_video: Option<NodeId>,
    final_audio: Option<NodeId>,
}

impl FilterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an instruction and return its identity.
    pub fn push(&mut self, inputs: Vec<PortRef>, op: Op) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node { inputs, op });
        id
    }

    pub fn set_outputs(&mut self, video: NodeId, audio: NodeId) {
        self.final_video = Some(video);
        self.final_audio = Some(audio);
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn final_video(&self) -> Option<NodeId> {
        self.final_video
    }

    pub fn final_audio(&self) -> Option<NodeId> {
        self.final_audio
    }

    fn label_of(&self, id: NodeId) -> String {
        if self.final_video == Some(id) {
            "outv".to_string()
        } else if self.final_audio == Some(id) {
            "outa".to_string()
        } else {
            format!("n{}", id.0)
        }
    }

    fn port_label(&self, port: PortRef) -> String {
        match port {
            PortRef::SourceVideo(idx) => format!("[{idx}:v]"),
            PortRef::SourceAudio(idx) => format!("[{idx}:a]"),
            PortRef::Node(id) => format!("[{}]", self.label_of(id)),
        }
    }

    /// Render the whole graph as an ffmpeg `-filter_complex` argument.
    pub fn render(&self) -> String {
        let mut statements = Vec::with_capacity(self.nodes.len());
        for (i, node) in self.nodes.iter().enumerate() {
            let mut stmt = String::new();
            for &input in &node.inputs {
                stmt.push_str(&self.port_label(input));
            }
            stmt.push_str(&node.op.body());
            stmt.push('[');
            stmt.push_str(&self.label_of(NodeId(i as u32)));
            stmt.push(']');
            statements.push(stmt);
        }
        statements.join(";")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_assigns_sequential_ids() {
        let mut graph = FilterGraph::new();
        let a = graph.push(vec![], Op::GapVideo { duration_s: 1.0, width: 1920, height: 1080 });
        let b = graph.push(
            vec![PortRef::Node(a)],
            Op::NormalizeRate { fps: 30.0 },
        );
        assert_eq!(a, NodeId(0));
        assert_eq!(b, NodeId(1));
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn render_links_nodes_by_generated_labels() {
        let mut graph = FilterGraph::new();
        let trim = graph.push(
            vec![PortRef::SourceVideo(0)],
            Op::TrimVideo { start_s: 1.0, end_s: 5.0 },
        );
        let rate = graph.push(vec![PortRef::Node(trim)], Op::NormalizeRate { fps: 30.0 });
        let _ = rate;

        let rendered = graph.render();
        assert_eq!(
            rendered,
            "[0:v]trim=start=1:end=5,setpts=PTS-STARTPTS[n0];[n0]fps=30,settb=AVTB,format=yuv420p[n1]"
        );
    }

    #[test]
    fn final_nodes_render_as_outv_outa() {
        let mut graph = FilterGraph::new();
        let v = graph.push(
            vec![PortRef::SourceVideo(0)],
            Op::TrimVideo { start_s: 0.0, end_s: 2.0 },
        );
        let a = graph.push(
            vec![PortRef::SourceAudio(0)],
            Op::TrimAudio { start_s: 0.0, end_s: 2.0 },
        );
        graph.set_outputs(v, a);

        let rendered = graph.render();
        assert!(rendered.contains("setpts=PTS-STARTPTS[outv]"));
        assert!(rendered.contains("asetpts=PTS-STARTPTS[outa]"));
        assert!(!rendered.contains("[n0]"));
        assert!(!rendered.contains("[n1]"));
    }

    #[test]
    fn source_instructions_render_without_input_labels() {
        let mut graph = FilterGraph::new();
        graph.push(vec![], Op::Silence { duration_s: 2.0, sample_rate: 48000 });

        let rendered = graph.render();
        assert!(rendered.starts_with("anullsrc=channel_layout=stereo:sample_rate=48000"));
        assert!(rendered.contains("atrim=duration=2"));
    }

    // -----------------------------------------------------------------------
    // op bodies
    // -----------------------------------------------------------------------

    #[test]
    fn trim_bodies_format_seconds_plainly() {
        let body = Op::TrimVideo { start_s: 2.5, end_s: 8.75 }.body();
        assert_eq!(body, "trim=start=2.5:end=8.75,setpts=PTS-STARTPTS");

        let body = Op::TrimAudio { start_s: 1.0, end_s: 5.0 }.body();
        assert_eq!(body, "atrim=start=1:end=5,asetpts=PTS-STARTPTS");
    }

    #[test]
    fn scale_and_pad_bodies() {
        assert_eq!(
            Op::Scale { width: 1920, height: 1080 }.body(),
            "scale=1920:1080:force_original_aspect_ratio=decrease"
        );
        assert_eq!(
            Op::Pad { width: 1920, height: 1080 }.body(),
            "pad=1920:1080:(ow-iw)/2:(oh-ih)/2"
        );
    }

    #[test]
    fn crop_body_uses_frame_fractions() {
        let body = Op::Crop { x: 0.1, y: 0.2, width: 0.5, height: 0.6 }.body();
        assert_eq!(body, "crop=iw*0.5:ih*0.6:iw*0.1:ih*0.2");
    }

    #[test]
    fn color_effects_skip_neutral_parts() {
        let neutral = Op::ColorEffects {
            brightness: 0.0,
            contrast: 1.0,
            saturation: 1.0,
            grayscale: false,
            sepia: false,
            blur: 0.0,
        };
        assert_eq!(neutral.body(), "null");

        let tuned = Op::ColorEffects {
            brightness: 0.1,
            contrast: 1.2,
            saturation: 1.0,
            grayscale: true,
            sepia: false,
            blur: 1.5,
        };
        assert_eq!(
            tuned.body(),
            "eq=brightness=0.1:contrast=1.2,hue=s=0,gblur=sigma=1.5"
        );
    }

    #[test]
    fn sepia_uses_colorchannelmixer() {
        let op = Op::ColorEffects {
            brightness: 0.0,
            contrast: 1.0,
            saturation: 1.0,
            grayscale: false,
            sepia: true,
            blur: 0.0,
        };
        assert!(op.body().starts_with("colorchannelmixer=.393"));
    }

    #[test]
    fn concat_bodies_carry_counts() {
        assert_eq!(Op::ConcatVideo { count: 3 }.body(), "concat=n=3:v=1:a=0");
        assert_eq!(Op::ConcatAudio { count: 3 }.body(), "concat=n=3:v=0:a=1");
    }

    #[test]
    fn crossfade_bodies_name_the_transition() {
        let body = Op::Crossfade {
            kind: TransitionKind::Dissolve,
            offset_s: 4.0,
            duration_s: 1.0,
        }
        .body();
        assert_eq!(body, "xfade=transition=dissolve:duration=1:offset=4");

        let body = Op::Crossfade {
            kind: TransitionKind::WipeLeft,
            offset_s: 2.5,
            duration_s: 0.5,
        }
        .body();
        assert_eq!(body, "xfade=transition=wipeleft:duration=0.5:offset=2.5");

        assert_eq!(Op::AudioCrossfade { duration_s: 1.0 }.body(), "acrossfade=d=1");
    }

    #[test]
    fn fades_pick_direction_and_window() {
        assert_eq!(
            Op::Fade { fade_in: true, start_s: 0.0, duration_s: 1.0 }.body(),
            "fade=t=in:st=0:d=1"
        );
        assert_eq!(
            Op::AudioFade { fade_in: false, start_s: 7.0, duration_s: 1.0 }.body(),
            "afade=t=out:st=7:d=1"
        );
    }

    #[test]
    fn drawtext_escapes_quotes_and_hex_colors() {
        let op = Op::DrawText {
            text: "it's done".to_string(),
            font_size: 32,
            color: "#ffcc00".to_string(),
            x_pct: 50.0,
            y_pct: 80.0,
            start_s: 1.0,
            end_s: 4.0,
        };
        let body = op.body();
        assert!(body.contains("text='it'\\''s done'"));
        assert!(body.contains("fontcolor=0xffcc00"));
        assert!(body.contains("x=(w-text_w)*0.5"));
        assert!(body.contains("y=(h-text_h)*0.8"));
        assert!(body.contains("enable='between(t,1,4)'"));
    }

    #[test]
    fn gap_sources_match_target_geometry() {
        assert_eq!(
            Op::GapVideo { duration_s: 2.0, width: 1280, height: 720 }.body(),
            "color=c=black:s=1280x720:d=2"
        );
        assert_eq!(
            Op::Delay { delay_ms: 2000 }.body(),
            "adelay=2000|2000"
        );
        assert_eq!(
            Op::Mix { count: 2 }.body(),
            "amix=inputs=2:duration=longest:dropout_transition=0"
        );
    }
}
