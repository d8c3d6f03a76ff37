// Conversion settings: on-disk file handling and validated snapshots

use anyhow::{Context, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Output container formats the converter can produce.
/// `Mp3` is audio-only: no video stream is carried into the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Mp4,
    Mov,
    Avi,
    Mkv,
    Mp3,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mov => "mov",
            Self::Avi => "avi",
            Self::Mkv => "mkv",
            Self::Mp3 => "mp3",
        }
    }

    /// Audio-only targets carry no video stream.
    pub fn is_audio_only(&self) -> bool {
        matches!(self, Self::Mp3)
    }
}

/// Raw settings as stored in the TOML file. Field names mirror the
/// schema the service has always used; illegal combinations are
/// caught by `validate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsFile {
    #[serde(default)]
    pub source_folder: PathBuf,
    #[serde(default)]
    pub destination_folder: PathBuf,
    #[serde(default)]
    pub backup_folder: PathBuf,

    pub auto_run: bool,
    pub delete_after_conversion: bool,
    pub retention_time: u32,
    pub use_backup: bool,
    pub output_format: OutputFormat,
    #[serde(default = "default_video_codec")]
    pub video_codec: Option<String>,
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,
    pub copy_only: bool,
    pub locked: bool,
    pub start_time: String,
    pub end_time: String,
    pub no_time_restrictions: bool,
}

fn default_video_codec() -> Option<String> {
    Some("libx264".to_string())
}

fn default_audio_codec() -> String {
    "aac".to_string()
}

impl Default for SettingsFile {
    fn default() -> Self {
        Self {
            source_folder: PathBuf::new(),
            destination_folder: PathBuf::new(),
            backup_folder: PathBuf::new(),
            auto_run: false,
            delete_after_conversion: false,
            retention_time: 0,
            use_backup: false,
            output_format: OutputFormat::Mp4,
            video_codec: default_video_codec(),
            audio_codec: default_audio_codec(),
            copy_only: false,
            locked: false,
            start_time: "00:00".to_string(),
            end_time: "23:59".to_string(),
            no_time_restrictions: true,
        }
    }
}

/// Ways a settings file can fail validation.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("retention_time must be between 0 and 30 days, got {0}")]
    RetentionOutOfRange(u32),

    #[error("use_backup cannot be combined with immediate deletion (retention_time = 0)")]
    BackupWithImmediateDelete,

    #[error("invalid {field} '{value}', expected HH:MM")]
    BadTime { field: &'static str, value: String },
}

/// Immutable, validated configuration snapshot consumed by the
/// conversion engine. Constructed once per scan cycle; workers never
/// mutate it.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionSettings {
    pub source_folder: PathBuf,
    pub destination_folder: PathBuf,
    pub backup_folder: PathBuf,
    pub auto_run: bool,
    pub delete_after_conversion: bool,
    pub retention_days: u32,
    pub use_backup: bool,
    pub output_format: OutputFormat,
    pub video_codec: Option<String>,
    pub audio_codec: String,
    pub copy_only: bool,
    pub locked: bool,
    pub window_start: NaiveTime,
    pub window_end: NaiveTime,
    pub no_time_restrictions: bool,
}

fn parse_hhmm(field: &'static str, value: &str) -> Result<NaiveTime, SettingsError> {
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|_| SettingsError::BadTime {
        field,
        value: value.to_string(),
    })
}

impl SettingsFile {
    /// Validate the raw file into an engine-ready snapshot. The
    /// backup/immediate-delete exclusion is enforced here, once, so
    /// the disposal policy never has to re-check it.
    pub fn validate(&self) -> Result<ConversionSettings, SettingsError> {
        if self.retention_time > 30 {
            return Err(SettingsError::RetentionOutOfRange(self.retention_time));
        }
        if self.use_backup && self.delete_after_conversion && self.retention_time == 0 {
            return Err(SettingsError::BackupWithImmediateDelete);
        }

        Ok(ConversionSettings {
            source_folder: self.source_folder.clone(),
            destination_folder: self.destination_folder.clone(),
            backup_folder: self.backup_folder.clone(),
            auto_run: self.auto_run,
            delete_after_conversion: self.delete_after_conversion,
            retention_days: self.retention_time,
            use_backup: self.use_backup,
            output_format: self.output_format,
            video_codec: self.video_codec.clone(),
            audio_codec: self.audio_codec.clone(),
            copy_only: self.copy_only,
            locked: self.locked,
            window_start: parse_hhmm("start_time", &self.start_time)?,
            window_end: parse_hhmm("end_time", &self.end_time)?,
            no_time_restrictions: self.no_time_restrictions,
        })
    }

    /// Get the path to the settings file
    pub fn settings_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("ffwatch");
        Ok(config_dir.join("settings.toml"))
    }

    /// Load and validate settings from `path`. Invalid or unreadable
    /// files fail closed to the defaults rather than aborting the
    /// service.
    pub fn load_or_default(path: &Path) -> ConversionSettings {
        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::error!(
                    "settings file {} invalid: {e:#}; using defaults",
                    path.display()
                );
                Self::default()
                    .validate()
                    .expect("default settings always validate")
            }
        }
    }

    fn load(path: &Path) -> Result<ConversionSettings> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
        let file: SettingsFile = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))?;
        let settings = file.validate().context("Settings failed validation")?;
        Ok(settings)
    }

    /// Save settings to disk, keeping a `.bak` copy of the previous file.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate().context("Refusing to save invalid settings")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory: {}", parent.display())
            })?;
        }

        if path.exists() {
            let backup = path.with_extension("toml.bak");
            fs::copy(path, &backup)
                .with_context(|| format!("Failed to back up settings to {}", backup.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize settings")?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write settings file: {}", path.display()))?;
        Ok(())
    }

    /// Create a default settings file if none exists yet.
    pub fn ensure_default(path: &Path) -> Result<()> {
        if !path.exists() {
            Self::default().save(path)?;
        }
        Ok(())
    }
}
