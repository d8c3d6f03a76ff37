// End-to-end pipeline tests that need no external transcoder:
// copy-only jobs exercise discovery, gating, disposal, and the worker
// handoff; unreachable tool paths exercise the failure paths.

use ffwatch::config::{ConversionSettings, OutputFormat, SettingsFile};
use ffwatch::engine::{
    CancelToken, DeletionScheduler, EventSink, JobRequest, ToolPaths, TranscodeJob,
    TranscodeOutcome, convert_files, scan_source,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn folders(dir: &Path, file: SettingsFile) -> ConversionSettings {
    let settings = SettingsFile {
        source_folder: dir.join("incoming"),
        destination_folder: dir.join("converted"),
        backup_folder: dir.join("backup"),
        ..file
    }
    .validate()
    .unwrap();
    fs::create_dir_all(&settings.source_folder).unwrap();
    fs::create_dir_all(&settings.destination_folder).unwrap();
    fs::create_dir_all(&settings.backup_folder).unwrap();
    settings
}

fn job(source: PathBuf, settings: &ConversionSettings, tools: ToolPaths) -> TranscodeJob {
    TranscodeJob::new(
        JobRequest::new(source),
        Arc::new(settings.clone()),
        tools,
        DeletionScheduler::new(),
        EventSink::disconnected(),
        CancelToken::new(),
    )
}

fn missing_tools() -> ToolPaths {
    ToolPaths {
        ffmpeg: PathBuf::from("/nonexistent/ffmpeg"),
        ffprobe: PathBuf::from("/nonexistent/ffprobe"),
    }
}

#[test]
fn test_scan_to_copy_to_backup_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let settings = folders(
        dir.path(),
        SettingsFile {
            copy_only: true,
            use_backup: true,
            ..SettingsFile::default()
        },
    );
    let source = settings.source_folder.join("clip.mp4");
    fs::write(&source, b"video payload").unwrap();

    let found = scan_source(&settings).unwrap();
    assert_eq!(found.len(), 1);

    let outcome = job(found[0].source_path.clone(), &settings, ToolPaths::default()).run();
    let output = settings.destination_folder.join("clip.mp4");
    assert_eq!(outcome, TranscodeOutcome::Success { output: output.clone() });

    assert!(output.exists());
    assert!(!source.exists(), "backup policy moves the source away");
    assert!(settings.backup_folder.join("clip.mp4").exists());

    // The next scan must find nothing: the artifact exists and the
    // source is gone.
    assert!(scan_source(&settings).unwrap().is_empty());
}

#[test]
fn test_rescan_after_copy_is_idempotent_without_disposal() {
    let dir = tempfile::tempdir().unwrap();
    let settings = folders(
        dir.path(),
        SettingsFile {
            copy_only: true,
            ..SettingsFile::default()
        },
    );
    let source = settings.source_folder.join("clip.mp4");
    fs::write(&source, b"video payload").unwrap();

    let outcome = job(source.clone(), &settings, ToolPaths::default()).run();
    assert!(outcome.is_success());
    assert!(source.exists(), "no disposal policy leaves the source in place");

    // Source still present, but the artifact exists, so rescans stay
    // quiet and a re-run of the same job short-circuits.
    assert!(scan_source(&settings).unwrap().is_empty());
    assert_eq!(
        job(source, &settings, ToolPaths::default()).run(),
        TranscodeOutcome::SkippedExisting
    );
}

#[test]
fn test_unreachable_tools_report_tool_not_found_and_preserve_source() {
    let dir = tempfile::tempdir().unwrap();
    let settings = folders(
        dir.path(),
        SettingsFile {
            output_format: OutputFormat::Mov,
            delete_after_conversion: true,
            retention_time: 0,
            ..SettingsFile::default()
        },
    );
    let source = settings.source_folder.join("clip.mp4");
    fs::write(&source, b"video payload").unwrap();

    let outcome = job(source.clone(), &settings, missing_tools()).run();

    assert_eq!(
        outcome,
        TranscodeOutcome::ToolNotFound,
        "a missing probe tool is a tooling problem, not file corruption"
    );
    assert!(source.exists(), "a failed job must never consume the source");
    assert!(
        !settings.destination_folder.join("clip.mov").exists(),
        "no destination artifact may appear for a failed job"
    );

    // Because nothing was produced, the file shows up again on the
    // next scan and will be retried.
    assert_eq!(scan_source(&settings).unwrap().len(), 1);
}

#[test]
fn test_convert_files_reports_per_file_outcomes() {
    let dir = tempfile::tempdir().unwrap();
    let settings = folders(
        dir.path(),
        SettingsFile {
            copy_only: true,
            ..SettingsFile::default()
        },
    );
    let good = settings.source_folder.join("good.mp4");
    fs::write(&good, b"ok").unwrap();
    let missing = settings.source_folder.join("missing.mp4");

    let results = convert_files(
        &[good.clone(), missing.clone()],
        &settings,
        &ToolPaths::default(),
        2,
        &EventSink::disconnected(),
        &CancelToken::new(),
    );

    assert_eq!(results.len(), 2);
    for (source, outcome) in results {
        if source == good {
            assert!(outcome.is_success());
        } else {
            assert!(
                matches!(outcome, TranscodeOutcome::TranscodeFailed(_)),
                "copying a missing file must fail, got {outcome:?}"
            );
        }
    }
    assert!(settings.destination_folder.join("good.mp4").exists());
}

#[test]
fn test_cancelled_job_reports_stopped_and_leaves_source() {
    let dir = tempfile::tempdir().unwrap();
    let settings = folders(
        dir.path(),
        SettingsFile {
            copy_only: true,
            ..SettingsFile::default()
        },
    );
    let source = settings.source_folder.join("clip.mp4");
    fs::write(&source, b"video payload").unwrap();

    let cancel = CancelToken::new();
    cancel.cancel();
    let job = TranscodeJob::new(
        JobRequest::new(source.clone()),
        Arc::new(settings.clone()),
        ToolPaths::default(),
        DeletionScheduler::new(),
        EventSink::disconnected(),
        cancel,
    );

    assert_eq!(job.run(), TranscodeOutcome::Stopped);
    assert!(source.exists());
    assert!(!settings.destination_folder.join("clip.mp4").exists());
}
