use super::types::ToolPaths;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::process::Command;

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStreams {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

/// Check if ffmpeg is available and return its version
pub fn ffmpeg_version(tools: &ToolPaths) -> Result<String> {
    let output = Command::new(&tools.ffmpeg)
        .arg("-version")
        .output()
        .context("Failed to execute ffmpeg. Is ffmpeg installed and in PATH?")?;

    if !output.status.success() {
        anyhow::bail!("ffmpeg command failed with status: {}", output.status);
    }

    let version_output = String::from_utf8_lossy(&output.stdout);
    let first_line = version_output.lines().next().unwrap_or("Unknown version");

    Ok(first_line.to_string())
}

/// Check if ffprobe is available
pub fn ffprobe_version(tools: &ToolPaths) -> Result<String> {
    let output = Command::new(&tools.ffprobe)
        .arg("-version")
        .output()
        .context("Failed to execute ffprobe. Is ffprobe installed and in PATH?")?;

    if !output.status.success() {
        anyhow::bail!("ffprobe command failed with status: {}", output.status);
    }

    let version_output = String::from_utf8_lossy(&output.stdout);
    let first_line = version_output.lines().next().unwrap_or("Unknown version");

    Ok(first_line.to_string())
}

/// Whether the input carries at least one audio stream. Audio-only
/// targets are pointless without one, so jobs check this before
/// spending an encode on output that is guaranteed empty.
pub fn has_audio_stream(tools: &ToolPaths, input: &Path) -> bool {
    let output = Command::new(&tools.ffprobe)
        .args([
            "-v",
            "error",
            "-select_streams",
            "a",
            "-show_entries",
            "stream=codec_type",
            "-print_format",
            "json",
        ])
        .arg(input)
        .output();

    match output {
        Ok(out) if out.status.success() => {
            parse_audio_streams(&String::from_utf8_lossy(&out.stdout))
        }
        _ => false,
    }
}

/// Parse an ffprobe stream listing and look for an audio stream.
pub fn parse_audio_streams(json: &str) -> bool {
    serde_json::from_str::<FfprobeStreams>(json)
        .map(|probe| {
            probe
                .streams
                .iter()
                .any(|s| s.codec_type.as_deref() == Some("audio"))
        })
        .unwrap_or(false)
}
