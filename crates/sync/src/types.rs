//! Data types for the upload run.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use cloudpush_config::Config;
use cloudpush_file_ops::Disposal;

/// Run settings derived from the configuration.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Local walk root.
    pub upload_root: PathBuf,
    /// Remote root, `/`-separated.
    pub cloud_root: String,
    pub archive: bool,
    pub disposal: Disposal,
    pub remove_folders: bool,
    pub max_file_size: u64,
    /// Files of the tool itself that are never uploaded.
    pub housekeeping: Vec<PathBuf>,
}

impl SyncOptions {
    /// Builds options from the configuration. Moving wins over deleting
    /// when both are enabled.
    pub fn from_config(config: &Config) -> Self {
        let locations = &config.locations;
        let behaviour = &config.behaviour;

        let disposal = if behaviour.move_uploaded {
            Disposal::Move {
                source_root: locations.upload_path.clone(),
                destination_root: locations.uploaded_path.clone(),
            }
        } else if behaviour.remove_uploaded {
            Disposal::Delete
        } else {
            Disposal::Keep
        };

        Self {
            upload_root: locations.upload_path.clone(),
            cloud_root: locations.cloud_path.clone(),
            archive: behaviour.archive_files,
            disposal,
            remove_folders: behaviour.remove_folders,
            max_file_size: cloudpush_api::MAX_FILE_SIZE,
            housekeeping: Vec::new(),
        }
    }

    pub fn with_housekeeping(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.housekeeping.extend(paths);
        self
    }
}

/// The network stage a failed file did not get past. Files rejected
/// before any upload are reported as [`cloudpush_file_ops::Rejection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStage {
    /// Sending the bytes to the upload domain.
    BytesUploaded,
    /// Registering the uploaded content at its remote path.
    Committed,
}

/// Final state of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Done {
        path: PathBuf,
        remote_path: String,
    },
    Failed {
        path: PathBuf,
        stage: FileStage,
        reason: String,
    },
}

impl FileOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, FileOutcome::Done { .. })
    }
}

/// What a run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Local paths uploaded and committed, in their pre-relocation location.
    pub uploaded: BTreeSet<PathBuf>,
    /// Files that failed to upload or commit.
    pub failed: usize,
    /// Files rejected by the size or quota filter.
    pub skipped: usize,
    /// Directories whose remote folder could not be created.
    pub folders_failed: usize,
    pub moved: usize,
    pub deleted: usize,
    pub pruned: usize,
    pub warnings: usize,
    pub errors: usize,
}

impl RunReport {
    pub fn uploaded_count(&self) -> usize {
        self.uploaded.len()
    }

    /// One-line human summary printed at the end of a run.
    pub fn summary_line(&self, log_path: &Path) -> String {
        format!(
            "{} file(s) uploaded. {} warning(s), {} error(s). See {} for details.",
            self.uploaded_count(),
            self.warnings,
            self.errors,
            log_path.display()
        )
    }
}
