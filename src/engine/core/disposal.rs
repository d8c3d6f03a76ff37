// Post-success disposition of the original source file

use super::events::EventSink;
use crate::config::ConversionSettings;
use chrono::{DateTime, Duration, Local};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;

/// A deletion scheduled for a later point in time. Held in memory
/// only; a process restart drops the schedule (accepted non-goal).
#[derive(Debug, Clone, PartialEq)]
pub struct PendingDeletion {
    pub path: PathBuf,
    pub fire_at: DateTime<Local>,
}

/// What the policy actually did, for event reporting and tests.
#[derive(Debug, Clone, PartialEq)]
pub enum DisposalAction {
    /// Source left in place (no policy, or a best-effort step failed).
    None,
    MovedToBackup(PathBuf),
    DeletedNow,
    ScheduledDeletion(PendingDeletion),
}

/// Fires `PendingDeletion`s via detached timer threads and keeps an
/// observable registry of what is still outstanding.
#[derive(Clone, Default)]
pub struct DeletionScheduler {
    pending: Arc<Mutex<Vec<PendingDeletion>>>,
}

impl DeletionScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deletions that have been scheduled and not yet fired.
    pub fn pending(&self) -> Vec<PendingDeletion> {
        self.pending.lock().unwrap().clone()
    }

    /// Register a deletion `retention_days` out and arm its timer.
    pub fn schedule(&self, path: &Path, retention_days: u32, events: &EventSink) -> PendingDeletion {
        let fire_at = Local::now() + Duration::days(i64::from(retention_days));
        let entry = PendingDeletion {
            path: path.to_path_buf(),
            fire_at,
        };
        self.pending.lock().unwrap().push(entry.clone());
        events.emit(format!(
            "Scheduled deletion for {} at {}",
            path.display(),
            fire_at.format("%Y-%m-%d %H:%M:%S")
        ));

        let registry = Arc::clone(&self.pending);
        let events = events.clone();
        let timer_entry = entry.clone();
        thread::spawn(move || {
            let wait = (timer_entry.fire_at - Local::now())
                .to_std()
                .unwrap_or_default();
            thread::sleep(wait);
            delete_file(&timer_entry.path, &events);
            registry.lock().unwrap().retain(|p| p != &timer_entry);
        });

        entry
    }
}

/// Remove a file if it still exists. Errors are logged, never fatal.
pub fn delete_file(path: &Path, events: &EventSink) {
    if !path.exists() {
        return;
    }
    match fs::remove_file(path) {
        Ok(()) => events.emit(format!("Deleted original file: {}", path.display())),
        Err(e) => events.emit(format!("Error deleting file {}: {e}", path.display())),
    }
}

/// Apply the configured disposal policy to a successfully processed
/// source file. The settings invariant guarantees backup and
/// immediate deletion are mutually exclusive, so the arms below never
/// both fire for one file. Failures here are best-effort: they are
/// reported but do not undo the conversion's success.
pub fn dispose(
    source: &Path,
    settings: &ConversionSettings,
    scheduler: &DeletionScheduler,
    events: &EventSink,
) -> DisposalAction {
    let file_name = match source.file_name() {
        Some(name) => name,
        None => return DisposalAction::None,
    };

    if settings.use_backup {
        // An unset backup folder is a failed move, not permission to
        // fall through into deletion.
        if settings.backup_folder.as_os_str().is_empty() {
            events.emit(format!(
                "Error moving {} to backup folder: no backup folder configured",
                file_name.to_string_lossy()
            ));
            return DisposalAction::None;
        }
        let backup_path = settings.backup_folder.join(file_name);
        return match fs::rename(source, &backup_path) {
            Ok(()) => {
                events.emit(format!(
                    "Moved {} to backup folder.",
                    file_name.to_string_lossy()
                ));
                DisposalAction::MovedToBackup(backup_path)
            }
            Err(e) => {
                events.emit(format!(
                    "Error moving {} to backup folder: {e}",
                    file_name.to_string_lossy()
                ));
                DisposalAction::None
            }
        };
    }

    if settings.delete_after_conversion {
        if settings.retention_days > 0 {
            let pending = scheduler.schedule(source, settings.retention_days, events);
            return DisposalAction::ScheduledDeletion(pending);
        }
        delete_file(source, events);
        return DisposalAction::DeletedNow;
    }

    DisposalAction::None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SettingsFile;

    fn settings_in(dir: &Path, file: SettingsFile) -> ConversionSettings {
        let file = SettingsFile {
            source_folder: dir.join("src"),
            destination_folder: dir.join("dst"),
            backup_folder: dir.join("bak"),
            ..file
        };
        file.validate().unwrap()
    }

    #[test]
    fn test_deferred_delete_registers_in_scheduler() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.mp4");
        fs::write(&source, b"x").unwrap();

        let scheduler = DeletionScheduler::new();
        let settings = settings_in(
            dir.path(),
            SettingsFile {
                delete_after_conversion: true,
                retention_time: 5,
                ..SettingsFile::default()
            },
        );
        let action = dispose(&source, &settings, &scheduler, &EventSink::disconnected());

        assert!(source.exists(), "file must survive until the timer fires");
        let pending = scheduler.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].path, source);
        assert_eq!(action, DisposalAction::ScheduledDeletion(pending[0].clone()));
    }

    #[test]
    fn test_delete_file_ignores_missing() {
        delete_file(Path::new("/definitely/not/here.mp4"), &EventSink::disconnected());
    }
}
