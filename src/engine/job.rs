// One job: a single source file from discovery through disposal

use crate::config::ConversionSettings;
use crate::engine::core::{
    CancelToken, DeletionScheduler, EventSink, JobRequest, JobStage, PreprocessError, RunStatus,
    ToolPaths, TranscodeOutcome, allowed_now, build_transcode_cmd, destination_path, dispose,
    format_cmd, has_audio_stream, needs_repair, repair, run_transcode,
};
use crate::engine::hardware::cached_capability;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// State machine driving one source file through gating,
/// preprocessing, encoding, and disposal. Always reaches a terminal
/// outcome; a failed file is simply re-discovered by a later scan.
pub struct TranscodeJob {
    request: JobRequest,
    settings: Arc<ConversionSettings>,
    tools: ToolPaths,
    scheduler: DeletionScheduler,
    events: EventSink,
    cancel: CancelToken,
}

impl TranscodeJob {
    pub fn new(
        request: JobRequest,
        settings: Arc<ConversionSettings>,
        tools: ToolPaths,
        scheduler: DeletionScheduler,
        events: EventSink,
        cancel: CancelToken,
    ) -> Self {
        Self {
            request,
            settings,
            tools,
            scheduler,
            events,
            cancel,
        }
    }

    pub fn request(&self) -> &JobRequest {
        &self.request
    }

    fn stage(&self, stage: JobStage) {
        tracing::debug!(job = %self.request.id, ?stage, "job stage");
    }

    /// Run the job to completion. Never panics on external failures;
    /// every path ends in a terminal outcome and the per-job temp
    /// area is destroyed regardless of how the job ends.
    pub fn run(&self) -> TranscodeOutcome {
        let file_name = self.request.file_name();

        self.stage(JobStage::Gating);
        if self.cancel.is_cancelled() {
            return self.done(TranscodeOutcome::Stopped);
        }
        if !allowed_now(&self.settings) {
            return self.done(TranscodeOutcome::SkippedOutsideWindow);
        }

        let Some(destination) = destination_path(&self.request.source_path, &self.settings) else {
            return self.done(TranscodeOutcome::TranscodeFailed(
                "source file has no usable name".to_string(),
            ));
        };
        // Another job or process may have produced the artifact since
        // the scan that queued this request.
        if destination.exists() {
            self.events
                .emit(format!("Output file already exists: {}", destination.display()));
            return self.done(TranscodeOutcome::SkippedExisting);
        }

        if self.settings.copy_only {
            return self.done(self.run_copy(&file_name, &destination));
        }

        self.done(self.run_transcode_pipeline(&file_name, &destination))
    }

    fn done(&self, outcome: TranscodeOutcome) -> TranscodeOutcome {
        self.stage(JobStage::Done);
        outcome
    }

    /// Copy-only mode: no preprocessing, no command building, just a
    /// byte copy feeding the same disposal step as an encode.
    fn run_copy(&self, file_name: &str, destination: &Path) -> TranscodeOutcome {
        self.stage(JobStage::Encoding);
        self.events.emit(format!("Copying: {file_name}"));
        if let Err(e) = fs::copy(&self.request.source_path, destination) {
            self.events.emit(format!("Error copying {file_name}: {e}"));
            return TranscodeOutcome::TranscodeFailed(e.to_string());
        }
        self.events.emit(format!("Successfully copied: {file_name}"));

        self.stage(JobStage::Disposing);
        dispose(
            &self.request.source_path,
            &self.settings,
            &self.scheduler,
            &self.events,
        );
        TranscodeOutcome::Success {
            output: destination.to_path_buf(),
        }
    }

    fn run_transcode_pipeline(&self, file_name: &str, destination: &Path) -> TranscodeOutcome {
        // Scoped work area for the sanitized copy; removed with the
        // job no matter how it ends.
        let workdir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(e) => {
                self.events
                    .emit(format!("Error creating work area for {file_name}: {e}"));
                return TranscodeOutcome::PreprocessFailed(e.to_string());
            }
        };

        self.stage(JobStage::Preprocessing);
        let wants_repair = match needs_repair(&self.tools, &self.request.source_path) {
            Ok(flag) => flag,
            Err(PreprocessError::Launch(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                self.events.emit("ffprobe not found.");
                return TranscodeOutcome::ToolNotFound;
            }
            Err(e) => {
                self.events.emit(format!("Error probing {file_name}: {e}"));
                return TranscodeOutcome::PreprocessFailed(e.to_string());
            }
        };
        let input: PathBuf = if wants_repair {
            self.events.emit(format!(
                "Corruption detected in {file_name}. Preprocessing required."
            ));
            match repair(&self.tools, &self.request.source_path, workdir.path()) {
                Ok(fixed) => fixed,
                Err(e) => {
                    self.events
                        .emit(format!("Error preprocessing {file_name}: {e}"));
                    return TranscodeOutcome::PreprocessFailed(e.to_string());
                }
            }
        } else {
            self.events.emit(format!(
                "No corruption detected in {file_name}. Skipping preprocessing."
            ));
            self.request.source_path.clone()
        };

        if self.settings.output_format.is_audio_only()
            && !has_audio_stream(&self.tools, &input)
        {
            self.events.emit(format!(
                "No audio stream found in {file_name}. Cannot convert to {}.",
                self.settings.output_format.extension()
            ));
            return TranscodeOutcome::SkippedNoAudio;
        }

        self.stage(JobStage::Encoding);
        let capability = cached_capability(&self.tools.ffmpeg);
        let (cmd, _path) = build_transcode_cmd(
            &self.tools,
            &input,
            destination,
            &self.settings,
            capability,
            &self.events,
        );
        tracing::debug!(job = %self.request.id, command = %format_cmd(&cmd), "built transcode command");

        self.events.emit(format!("Converting: {file_name}"));
        match run_transcode(cmd, &self.cancel, &self.events) {
            Ok(RunStatus::Completed(status)) if status.success() => {
                self.events
                    .emit(format!("Successfully converted: {file_name}"));
            }
            Ok(RunStatus::Completed(status)) => {
                self.events.emit(format!(
                    "Error converting {file_name}: ffmpeg exited with {status}"
                ));
                remove_partial_output(destination);
                return TranscodeOutcome::TranscodeFailed(format!("ffmpeg exited with {status}"));
            }
            Ok(RunStatus::Cancelled) => {
                self.events
                    .emit(format!("Conversion of {file_name} stopped."));
                remove_partial_output(destination);
                return TranscodeOutcome::Stopped;
            }
            Err(e) => {
                remove_partial_output(destination);
                let not_found = e
                    .downcast_ref::<std::io::Error>()
                    .is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound);
                if not_found {
                    self.events.emit("ffmpeg not found.");
                    return TranscodeOutcome::ToolNotFound;
                }
                self.events.emit(format!("Error converting {file_name}: {e:#}"));
                return TranscodeOutcome::TranscodeFailed(format!("{e:#}"));
            }
        }

        self.stage(JobStage::Disposing);
        dispose(
            &self.request.source_path,
            &self.settings,
            &self.scheduler,
            &self.events,
        );
        TranscodeOutcome::Success {
            output: destination.to_path_buf(),
        }
    }
}

/// A failed or stopped encode must not leave a partial destination
/// artifact behind: the scanner treats an existing artifact as "done"
/// and would never retry the source.
fn remove_partial_output(destination: &Path) {
    if destination.exists() {
        if let Err(e) = fs::remove_file(destination) {
            tracing::warn!(
                "could not remove partial output {}: {e}",
                destination.display()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SettingsFile;

    fn job_in(dir: &Path, file: SettingsFile) -> (TranscodeJob, PathBuf) {
        let source_dir = dir.join("src");
        let dest_dir = dir.join("dst");
        fs::create_dir_all(&source_dir).unwrap();
        fs::create_dir_all(&dest_dir).unwrap();
        let source = source_dir.join("clip.mp4");
        fs::write(&source, b"fake video").unwrap();

        let settings = SettingsFile {
            source_folder: source_dir,
            destination_folder: dest_dir,
            backup_folder: dir.join("bak"),
            ..file
        }
        .validate()
        .unwrap();

        let job = TranscodeJob::new(
            JobRequest::new(source.clone()),
            Arc::new(settings),
            ToolPaths::default(),
            DeletionScheduler::new(),
            EventSink::disconnected(),
            CancelToken::new(),
        );
        (job, source)
    }

    #[test]
    fn test_outside_window_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        // Pin the window to a minute guaranteed not to contain "now".
        let now = chrono::Local::now().time();
        let pinned = if now < chrono::NaiveTime::from_hms_opt(12, 0, 0).unwrap() {
            ("23:58", "23:59")
        } else {
            ("00:00", "00:01")
        };
        let (job, source) = job_in(
            dir.path(),
            SettingsFile {
                start_time: pinned.0.to_string(),
                end_time: pinned.1.to_string(),
                no_time_restrictions: false,
                copy_only: true,
                ..SettingsFile::default()
            },
        );

        assert_eq!(job.run(), TranscodeOutcome::SkippedOutsideWindow);
        assert!(source.exists());
        assert!(!dir.path().join("dst/clip.mp4").exists());
    }

    #[test]
    fn test_copy_only_success_with_immediate_delete() {
        let dir = tempfile::tempdir().unwrap();
        let (job, source) = job_in(
            dir.path(),
            SettingsFile {
                copy_only: true,
                delete_after_conversion: true,
                retention_time: 0,
                ..SettingsFile::default()
            },
        );

        let outcome = job.run();
        let output = dir.path().join("dst/clip.mp4");
        assert_eq!(outcome, TranscodeOutcome::Success { output: output.clone() });
        assert!(output.exists());
        assert!(!source.exists(), "immediate deletion removes the source");
    }
}
