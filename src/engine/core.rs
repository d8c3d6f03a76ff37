mod disposal;
mod events;
mod ffmpeg_cmd;
mod ffmpeg_info;
mod preprocess;
mod scan;
mod types;
mod window;

pub use disposal::{DeletionScheduler, DisposalAction, PendingDeletion, delete_file, dispose};
pub use events::EventSink;
pub use ffmpeg_cmd::{EncodePath, RunStatus, build_transcode_cmd, format_cmd, run_transcode};
pub use ffmpeg_info::{ffmpeg_version, ffprobe_version, has_audio_stream, parse_audio_streams};
pub use preprocess::{PreprocessError, needs_repair, repair};
pub use scan::{
    ScanError, destination_name, destination_path, is_supported_input, scan_source,
};
pub use types::{CancelToken, JobRequest, JobStage, ToolPaths, TranscodeOutcome};
pub use window::{allowed, allowed_now};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OutputFormat, SettingsFile};
    use std::fs;
    use std::path::Path;

    fn scan_settings(dir: &Path, format: OutputFormat) -> crate::config::ConversionSettings {
        SettingsFile {
            source_folder: dir.join("src"),
            destination_folder: dir.join("dst"),
            output_format: format,
            ..SettingsFile::default()
        }
        .validate()
        .unwrap()
    }

    #[test]
    fn test_scan_ignores_unsupported_and_subdirs() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::create_dir(dir.path().join("dst")).unwrap();
        fs::write(dir.path().join("src/notes.txt"), b"x").unwrap();
        fs::create_dir(dir.path().join("src/nested")).unwrap();
        fs::write(dir.path().join("src/nested/c.mp4"), b"c").unwrap();

        let settings = scan_settings(dir.path(), OutputFormat::Mp4);
        let found = scan_source(&settings).unwrap();
        assert!(found.is_empty(), "nested files and non-media must be ignored");
    }

    #[test]
    fn test_scan_is_idempotent_with_no_new_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::create_dir(dir.path().join("dst")).unwrap();
        fs::write(dir.path().join("src/a.mp4"), b"a").unwrap();
        fs::write(dir.path().join("dst/a.mp4"), b"done").unwrap();

        let settings = scan_settings(dir.path(), OutputFormat::Mp4);
        let first = scan_source(&settings).unwrap();
        let second = scan_source(&settings).unwrap();
        assert!(first.is_empty());
        assert!(second.is_empty());
    }

    #[test]
    fn test_copy_only_checks_identical_name() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::create_dir(dir.path().join("dst")).unwrap();
        fs::write(dir.path().join("src/a.mkv"), b"a").unwrap();
        // destination has the transcoded name, not the copied name
        fs::write(dir.path().join("dst/a.mp4"), b"x").unwrap();

        let file = SettingsFile {
            source_folder: dir.path().join("src"),
            destination_folder: dir.path().join("dst"),
            copy_only: true,
            ..SettingsFile::default()
        };
        let settings = file.validate().unwrap();
        let found = scan_source(&settings).unwrap();
        assert_eq!(found.len(), 1, "a.mkv has not been copied yet");
    }

    #[test]
    fn test_cancel_token_is_idempotent() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());

        let clone = token.clone();
        assert!(clone.is_cancelled(), "clones share the same flag");
    }
}
