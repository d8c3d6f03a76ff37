use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

/// Shared cooperative stop signal. Cloned into the scan loop and
/// every in-flight job; observed at scan boundaries and at each line
/// of transcoder output. Cancelling twice is harmless.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// One source file queued for processing. Produced by the scanner,
/// consumed by exactly one job, never persisted.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub id: Uuid,
    pub source_path: PathBuf,
    pub discovered_at: DateTime<Local>,
}

impl JobRequest {
    pub fn new(source_path: PathBuf) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_path,
            discovered_at: Local::now(),
        }
    }

    /// File name component, lossy for display purposes.
    pub fn file_name(&self) -> String {
        self.source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source_path.display().to_string())
    }
}

/// Locations of the external transcoder binaries. Defaults resolve
/// through PATH; deployments with a bundled build point these at it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolPaths {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

/// Stage a job is currently in. Every job reaches `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    Queued,
    Gating,
    Preprocessing,
    Encoding,
    Disposing,
    Done,
}

/// Terminal result of one job.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscodeOutcome {
    Success { output: PathBuf },
    SkippedExisting,
    SkippedOutsideWindow,
    /// Audio-only target but the input carries no audio stream.
    SkippedNoAudio,
    PreprocessFailed(String),
    TranscodeFailed(String),
    ToolNotFound,
    /// Cancelled cooperatively; a stop, not a failure.
    Stopped,
}

impl TranscodeOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Short label for event lines.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::SkippedExisting => "skipped (output exists)",
            Self::SkippedOutsideWindow => "skipped (outside allowed hours)",
            Self::SkippedNoAudio => "skipped (no audio stream)",
            Self::PreprocessFailed(_) => "preprocess failed",
            Self::TranscodeFailed(_) => "transcode failed",
            Self::ToolNotFound => "ffmpeg not found",
            Self::Stopped => "stopped",
        }
    }
}
