// Transcode command construction and execution

use super::events::EventSink;
use super::types::{CancelToken, ToolPaths};
use crate::config::ConversionSettings;
use crate::engine::hardware::{EncoderCapability, GpuVendor};
use anyhow::{Context, Result};
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

/// Which encoder path a built command takes. Reported as an event so
/// support can tell hardware and software runs apart in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodePath {
    AudioOnly,
    Hardware(GpuVendor),
    Software,
}

/// Fallback audio encoder for audio-only output when none is configured.
const DEFAULT_AUDIO_ENCODER: &str = "libmp3lame";

/// Map output format, codec preferences, and detected capability onto
/// a concrete ffmpeg invocation. Priority: audio-only target first,
/// then the selected hardware vendor's h264 encoder, then the
/// configured codecs verbatim on the software path.
pub fn build_transcode_cmd(
    tools: &ToolPaths,
    input: &Path,
    output: &Path,
    settings: &ConversionSettings,
    capability: EncoderCapability,
    events: &EventSink,
) -> (Command, EncodePath) {
    let mut cmd = Command::new(&tools.ffmpeg);
    cmd.arg("-y").arg("-i").arg(input);

    let path = if settings.output_format.is_audio_only() {
        let audio = if settings.audio_codec.is_empty() {
            DEFAULT_AUDIO_ENCODER
        } else {
            settings.audio_codec.as_str()
        };
        cmd.arg("-vn").arg("-acodec").arg(audio);
        events.emit("Building command for audio-only conversion.");
        EncodePath::AudioOnly
    } else if let Some((vendor, encoders)) = capability.select() {
        cmd.arg("-vcodec").arg(encoders.h264);
        cmd.arg("-acodec").arg(&settings.audio_codec);
        events.emit(format!("Using GPU encoder: {}", encoders.h264));
        EncodePath::Hardware(vendor)
    } else {
        let video = settings.video_codec.as_deref().unwrap_or("libx264");
        cmd.arg("-vcodec").arg(video);
        cmd.arg("-acodec").arg(&settings.audio_codec);
        events.emit("Using CPU encoder.");
        EncodePath::Software
    };

    cmd.arg(output);
    (cmd, path)
}

/// Format a command as a shell-safe string for display
pub fn format_cmd(cmd: &Command) -> String {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|arg| {
            let s = arg.to_string_lossy();
            shlex::try_quote(&s)
                .map(|q| q.into_owned())
                .unwrap_or_else(|_| s.into_owned())
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// How a transcoder run ended.
#[derive(Debug)]
pub enum RunStatus {
    Completed(ExitStatus),
    /// The stop signal fired mid-run; the process was terminated.
    Cancelled,
}

/// Run the external transcoder, streaming its output line by line
/// into the event sink. The cancel token is checked between lines;
/// when it fires, the process is killed and `Cancelled` is returned.
/// Exit code 0 on the returned status is the sole success signal.
pub fn run_transcode(
    mut cmd: Command,
    cancel: &CancelToken,
    events: &EventSink,
) -> Result<RunStatus> {
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::null());
    cmd.stderr(Stdio::piped());

    let mut child = cmd.spawn().context("Failed to spawn ffmpeg")?;

    let stderr = child.stderr.take().context("Failed to capture stderr")?;
    let reader = BufReader::new(stderr);

    for line in reader.lines().map_while(Result::ok) {
        if cancel.is_cancelled() {
            child.kill().context("Failed to terminate ffmpeg")?;
            child.wait().context("Failed to reap terminated ffmpeg")?;
            return Ok(RunStatus::Cancelled);
        }
        let line = line.trim();
        if !line.is_empty() {
            events.emit(line);
        }
    }

    let status = child.wait().context("Failed to wait for ffmpeg")?;
    Ok(RunStatus::Completed(status))
}
