// Corruption detection and stream-copy repair of input files

use super::types::ToolPaths;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("tool failed to launch: {0}")]
    Launch(#[from] std::io::Error),

    #[error("repair remux exited with {status}: {detail}")]
    RemuxFailed { status: String, detail: String },
}

/// Lightweight validation pass: a clean `ffprobe -v error` run means
/// the file can go straight to encoding, a non-zero exit flags it for
/// repair. A probe that cannot be launched at all says nothing about
/// the file and is surfaced to the caller.
pub fn needs_repair(tools: &ToolPaths, input: &Path) -> Result<bool, PreprocessError> {
    let out = Command::new(&tools.ffprobe)
        .args(["-v", "error", "-i"])
        .arg(input)
        .output()?;
    Ok(!out.status.success())
}

/// Remux `input` into a sanitized copy inside `workdir` without
/// re-encoding. The workdir is the job's scoped temporary area and is
/// destroyed with the job; the original file is never modified.
pub fn repair(tools: &ToolPaths, input: &Path, workdir: &Path) -> Result<PathBuf, PreprocessError> {
    let file_name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_string());
    let fixed = workdir.join(format!("fixed_{file_name}"));

    let output = Command::new(&tools.ffmpeg)
        .arg("-y")
        .arg("-i")
        .arg(input)
        .args(["-c", "copy"])
        .arg(&fixed)
        .output()?;

    if output.status.success() {
        Ok(fixed)
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(PreprocessError::RemuxFailed {
            status: output.status.to_string(),
            detail: stderr.lines().last().unwrap_or("").to_string(),
        })
    }
}
