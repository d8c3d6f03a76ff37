use super::types::JobRequest;
use crate::config::{ConversionSettings, OutputFormat};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Input extensions the external transcoder is known to accept.
const SUPPORTED_EXTENSIONS: &[&str] = &[
    "mp4", "avi", "wmv", "mkv", "flv", "webm", "mov", "mpeg", "mpg", "m4v", "3gp", "ts", "vob",
    "rm", "rmvb", "asf", "m2ts", "mts", "ogv", "divx", "dv", "f4v", "mxf", "nut", "ogm", "qt",
    "tod", "vro",
];

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("source or destination folder does not exist: {0}")]
    DirectoryUnavailable(PathBuf),

    #[error("failed to list source folder: {0}")]
    ScanFailed(#[from] walkdir::Error),
}

/// Check if a path has a supported media file extension
pub fn is_supported_input(path: &Path) -> bool {
    if let Some(ext) = path.extension() {
        if let Some(ext_str) = ext.to_str() {
            return SUPPORTED_EXTENSIONS.contains(&ext_str.to_lowercase().as_str());
        }
    }
    false
}

/// Destination artifact name for a source file: identical name when
/// copying, otherwise the stem with the output extension.
pub fn destination_name(source: &Path, format: OutputFormat, copy_only: bool) -> Option<PathBuf> {
    let file_name = source.file_name()?;
    if copy_only {
        Some(PathBuf::from(file_name))
    } else {
        let stem = source.file_stem()?;
        let mut name = stem.to_os_string();
        name.push(".");
        name.push(format.extension());
        Some(PathBuf::from(name))
    }
}

/// The full destination path a job for `source` would produce.
pub fn destination_path(source: &Path, settings: &ConversionSettings) -> Option<PathBuf> {
    destination_name(source, settings.output_format, settings.copy_only)
        .map(|name| settings.destination_folder.join(name))
}

/// List the source folder and return a request for every supported
/// file whose destination artifact does not exist yet. The listing is
/// single-level: subdirectories and symlinks are not followed.
/// Listing errors propagate so the caller can tell "no new files"
/// from "cannot see the folder".
pub fn scan_source(settings: &ConversionSettings) -> Result<Vec<JobRequest>, ScanError> {
    if !settings.source_folder.is_dir() {
        return Err(ScanError::DirectoryUnavailable(settings.source_folder.clone()));
    }
    if !settings.destination_folder.is_dir() {
        return Err(ScanError::DirectoryUnavailable(
            settings.destination_folder.clone(),
        ));
    }

    let mut requests = Vec::new();
    for entry in WalkDir::new(&settings.source_folder)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
    {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() || !is_supported_input(path) {
            continue;
        }
        match destination_path(path, settings) {
            Some(dest) if dest.exists() => {}
            Some(_) => requests.push(JobRequest::new(path.to_path_buf())),
            None => {}
        }
    }

    Ok(requests)
}
