use std::io::Write as _;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use slatecut_core::{detect_gaps, Project, TrackKind};
use slatecut_export::{ExportProgress, SegmentPlan};

#[derive(Parser, Debug)]
#[command(name = "slatecut", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarize a project file: tracks, clips, gaps and export segments.
    Inspect(InspectArgs),
    /// Compile a project into an ffmpeg filter graph without running it.
    Compile(CompileArgs),
    /// Compile and run the export (requires `ffmpeg` on PATH).
    Export(ExportArgs),
    /// Probe a media file and print its stream info as JSON.
    Probe(ProbeArgs),
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// Project file (.slate).
    project: PathBuf,
}

#[derive(Parser, Debug)]
struct CompileArgs {
    /// Project file (.slate).
    project: PathBuf,

    /// Write the full export plan as JSON to this path.
    #[arg(long)]
    plan: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Project file (.slate).
    project: PathBuf,

    /// Output file path (default: `<output_name>.<container>` from the
    /// project settings).
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ProbeArgs {
    /// Media file to probe (requires `ffprobe` on PATH).
    file: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Inspect(args) => cmd_inspect(args),
        Command::Compile(args) => cmd_compile(args),
        Command::Export(args) => cmd_export(args).await,
        Command::Probe(args) => cmd_probe(args),
    }
}

fn load_project(path: &PathBuf) -> anyhow::Result<Project> {
    Project::load_from_file(path).with_context(|| format!("load project '{}'", path.display()))
}

fn cmd_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let project = load_project(&args.project)?;
    let s = &project.settings;

    println!("Project: {}", project.name);
    println!(
        "Settings: {}x{} @{}fps, {}Hz, {}",
        s.width, s.height, s.fps, s.sample_rate, s.container
    );
    println!("Duration: {}", project.timeline.total_duration_us());
    println!("Assets: {}", project.assets.len());
    println!();

    for track in &project.timeline.tracks {
        let mut flags = Vec::new();
        if track.muted {
            flags.push("muted");
        }
        if track.locked {
            flags.push("locked");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", flags.join(", "))
        };
        println!("{:?} track{} ({} clips)", track.kind, flags, track.clips.len());
        for clip in track.sorted_clips() {
            println!(
                "  {}..{}  {}",
                clip.start_us,
                clip.end_us(),
                clip.name
            );
        }
    }

    let mut spine: Vec<_> = project
        .timeline
        .tracks
        .iter()
        .filter(|t| matches!(t.kind, TrackKind::Video | TrackKind::Image))
        .flat_map(|t| t.clips.iter())
        .collect();
    spine.sort_by_key(|c| c.start_us);

    let gaps = detect_gaps(&spine);
    let plans = slatecut_export::group_segments(&spine, &gaps, &project.timeline.transitions);
    let merged = plans
        .iter()
        .filter(|p| matches!(p, SegmentPlan::Run(r) if r.clip_indices.len() > 1))
        .count();

    println!();
    println!(
        "Spine: {} clips, {} gaps, {} export segments ({} merged)",
        spine.len(),
        gaps.len(),
        plans.len(),
        merged
    );
    println!(
        "Overlays: {}, Transitions: {}",
        project.timeline.overlays.len(),
        project.timeline.transitions.len()
    );

    Ok(())
}

fn cmd_compile(args: CompileArgs) -> anyhow::Result<()> {
    let project = load_project(&args.project)?;
    let plan = slatecut_export::compile(&project)
        .with_context(|| format!("compile '{}'", args.project.display()))?;

    println!("Inputs:");
    for input in &plan.inputs {
        println!("  [{}] {}", input.index, input.path.display());
    }
    println!();
    println!("Filter graph ({} instructions):", plan.graph.len());
    for statement in plan.graph.render().split(';') {
        println!("  {statement}");
    }
    println!();
    println!("Output: {} ({})", plan.output_path.display(), plan.total_duration_us);

    if let Some(path) = args.plan {
        let json = serde_json::to_string_pretty(&plan)?;
        std::fs::write(&path, json).with_context(|| format!("write plan '{}'", path.display()))?;
        eprintln!("wrote {}", path.display());
    }

    Ok(())
}

async fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let project = load_project(&args.project)?;
    let mut plan = slatecut_export::compile(&project)
        .with_context(|| format!("compile '{}'", args.project.display()))?;

    if let Some(out) = args.out {
        plan.output_path = out;
    }

    let (progress_tx, mut progress_rx) =
        tokio::sync::watch::channel(ExportProgress::default());
    let (cancel_tx, cancel_rx) = tokio::sync::watch::channel(false);

    // Ctrl-C flips the cancel flag; the engine kills ffmpeg and removes
    // the partial output.
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = cancel_tx.send(true);
        }
    });

    let printer = tokio::spawn(async move {
        while progress_rx.changed().await.is_ok() {
            let p = progress_rx.borrow().clone();
            let eta = p
                .eta_seconds
                .map(|s| format!(" eta {s:.0}s"))
                .unwrap_or_default();
            print!(
                "\r{:5.1}%  frame {}  {:.1} fps  {}{}   ",
                p.percent, p.frame, p.fps, p.speed, eta
            );
            let _ = std::io::stdout().flush();
        }
    });

    let result = slatecut_export::execute(&plan, progress_tx, cancel_rx).await;
    let _ = printer.await;
    println!();
    result.with_context(|| format!("export '{}'", plan.output_path.display()))?;

    eprintln!("wrote {}", plan.output_path.display());
    Ok(())
}

fn cmd_probe(args: ProbeArgs) -> anyhow::Result<()> {
    let info = slatecut_export::probe_media(&args.file)
        .with_context(|| format!("probe '{}'", args.file.display()))?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}
