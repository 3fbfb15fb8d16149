use crate::compile::ExportPlan;
use crate::error::{ExportError, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress update during an export.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportProgress {
    pub percent: f64,
    pub frame: u64,
    pub fps: f64,
    pub speed: String,
    pub eta_seconds: Option<f64>,
}

// ---------------------------------------------------------------------------
// Invocation
// ---------------------------------------------------------------------------

/// Build the ffmpeg argument list for a compiled plan.
pub fn build_ffmpeg_args(plan: &ExportPlan) -> Vec<String> {
    let mut args = vec!["-y".to_string()];
    for input in &plan.inputs {
        args.extend(["-i".to_string(), input.path.to_string_lossy().into_owned()]);
    }
    args.extend(["-filter_complex".to_string(), plan.graph.render()]);
    args.extend(plan.output_args.iter().cloned());
    args.push(plan.output_path.to_string_lossy().into_owned());
    args
}

/// Execute an export plan by spawning ffmpeg.
///
/// Progress parsed from stderr goes out on `progress_tx`. Flipping
/// `cancel_rx` to `true` kills the encoder and removes the partial output
/// file; cancellation is safe at any point of the run. A failed run also
/// removes whatever partial output exists.
pub async fn execute(
    plan: &ExportPlan,
    progress_tx: watch::Sender<ExportProgress>,
    mut cancel_rx: watch::Receiver<bool>,
) -> Result<()> {
    use std::process::Stdio;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::process::Command;

    if *cancel_rx.borrow() {
        return Err(ExportError::Cancelled);
    }

    let args = build_ffmpeg_args(plan);

    let mut child = Command::new("ffmpeg")
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ExportError::FfmpegNotFound
            } else {
                ExportError::Io(e)
            }
        })?;

    let stderr = child.stderr.take().unwrap();
    let reader = BufReader::new(stderr);
    let mut lines = reader.lines();

    let total_secs = plan.total_duration_us.as_seconds();
    let mut cancel_alive = true;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        if let Some(progress) = parse_progress(&line, total_secs) {
                            let _ = progress_tx.send(progress);
                        }
                    }
                    _ => break,
                }
            }
            changed = cancel_rx.changed(), if cancel_alive => {
                match changed {
                    Ok(()) if *cancel_rx.borrow() => {
                        let _ = child.kill().await;
                        let _ = tokio::fs::remove_file(&plan.output_path).await;
                        return Err(ExportError::Cancelled);
                    }
                    Ok(()) => {}
                    // Sender dropped: nobody can cancel anymore.
                    Err(_) => cancel_alive = false,
                }
            }
        }
    }

    let status = child.wait().await.map_err(ExportError::Io)?;
    if !status.success() {
        let _ = tokio::fs::remove_file(&plan.output_path).await;
        return Err(ExportError::FfmpegFailed(status.to_string()));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Progress parsing
// ---------------------------------------------------------------------------

/// Parse an ffmpeg stderr stats line into a progress update.
///
/// Example line: `frame=  123 fps= 60 ... time=00:01:02.05 speed=1.50x`.
/// Lines without a `time=` field are not stats lines and yield `None`.
pub fn parse_progress(line: &str, total_secs: f64) -> Option<ExportProgress> {
    if !line.contains("time=") {
        return None;
    }

    // ffmpeg pads values after the '=' ("frame=  123"); collapse the
    // padding so the line splits into plain key=value words.
    let mut collapsed = line.to_string();
    while collapsed.contains("= ") {
        collapsed = collapsed.replace("= ", "=");
    }

    let mut frame = 0u64;
    let mut fps = 0.0f64;
    let mut speed = String::new();
    let mut time_secs = 0.0f64;

    for word in collapsed.split_whitespace() {
        let Some((key, value)) = word.split_once('=') else {
            continue;
        };
        match key {
            "frame" => frame = value.parse().unwrap_or(0),
            "fps" => fps = value.parse().unwrap_or(0.0),
            "speed" => speed = value.to_string(),
            "time" => time_secs = parse_clock(value).unwrap_or(0.0),
            _ => {}
        }
    }

    let percent = if total_secs > 0.0 {
        (time_secs / total_secs * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    };

    let speed_factor: f64 = speed.trim_end_matches('x').parse().unwrap_or(0.0);
    let eta_seconds = (speed_factor > 0.0 && time_secs < total_secs)
        .then(|| (total_secs - time_secs) / speed_factor);

    Some(ExportProgress {
        percent,
        frame,
        fps,
        speed,
        eta_seconds,
    })
}

/// Parse an ffmpeg clock value like "00:01:02.05" into seconds.
fn parse_clock(s: &str) -> Option<f64> {
    let mut parts = s.splitn(3, ':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    Some((hours * 60.0 + minutes) * 60.0 + seconds)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
