use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A user-selected input path, classified as file or directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputEntry {
    pub path: PathBuf,
    pub is_dir: bool,
}

/// One regular file slated for archiving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Absolute source path.
    pub path: PathBuf,
    /// Entry name inside the archive, forward-slash separated.
    pub archive_name: String,
    /// Size in bytes, captured at expansion time for the progress pre-scan.
    pub size: u64,
}
