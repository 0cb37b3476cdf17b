//! Upload run driver.
//!
//! One linear pass: every directory gets its remote folder first, then its
//! files are streamed through the two-phase upload. Relocation and pruning
//! wait until the whole tree has been walked.

use std::path::{Path, PathBuf};

use cloudpush_file_ops::{
    DEFAULT_CONTENT_TYPE, Disposal, Rejection, ScanOptions, UploadCandidate, list_eligible_files,
    prune_empty_dirs, relocate_uploaded, walk_dirs,
};
use tracing::{debug, error, info, warn};

use crate::error::SyncError;
use crate::paths::remote_path;
use crate::remote::RemoteStore;
use crate::types::{FileOutcome, FileStage, RunReport, SyncOptions};

/// Runs one upload pass over the configured tree.
pub struct SyncRun {
    options: SyncOptions,
}

impl SyncRun {
    pub fn new(options: SyncOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Walks the upload root, uploads what fits, then relocates.
    ///
    /// Failures of single files or folders are logged and counted in the
    /// report. Only an unreadable upload root fails the run.
    pub async fn run(&self, remote: &dyn RemoteStore) -> Result<RunReport, SyncError> {
        let root = &self.options.upload_root;
        let tree = walk_dirs(root).map_err(|source| SyncError::Root {
            path: root.clone(),
            source,
        })?;

        let mut report = RunReport::default();
        let dirs = self.exclude_destination(tree.dirs);
        for (dir, e) in &tree.unreadable {
            warn!(dir = %dir.display(), error = %e, "skipping unreadable directory");
            report.warnings += 1;
        }

        let mut scan = ScanOptions::new(self.options.archive, self.options.max_file_size);
        for path in &self.options.housekeeping {
            scan.skip_path(path);
        }

        debug!(dirs = dirs.len(), root = %root.display(), "walking upload tree");
        for dir in &dirs {
            let Some(remote_dir) = self.ensure_remote_dir(remote, dir, &mut report).await else {
                continue;
            };
            self.stream_files(remote, dir, &remote_dir, &scan, &mut report)
                .await;
        }

        info!(uploaded = report.uploaded_count(), failed = report.failed, "upload pass finished");
        self.finish(&mut report);
        Ok(report)
    }

    /// Drops the move destination subtree when it lies inside the upload
    /// root, so files moved there by an earlier run are not uploaded again.
    fn exclude_destination(&self, dirs: Vec<PathBuf>) -> Vec<PathBuf> {
        let Disposal::Move {
            destination_root, ..
        } = &self.options.disposal
        else {
            return dirs;
        };
        let Ok(destination) = std::fs::canonicalize(destination_root) else {
            return dirs;
        };

        dirs.into_iter()
            .filter(|dir| {
                let inside = std::fs::canonicalize(dir)
                    .map(|d| d.starts_with(&destination))
                    .unwrap_or(false);
                if inside {
                    debug!(dir = %dir.display(), "skipping move destination");
                }
                !inside
            })
            .collect()
    }

    /// First phase of a directory: make sure its remote folder exists.
    /// Returns the remote path, or `None` if the directory must be skipped.
    async fn ensure_remote_dir(
        &self,
        remote: &dyn RemoteStore,
        dir: &Path,
        report: &mut RunReport,
    ) -> Option<String> {
        let rel = dir.strip_prefix(&self.options.upload_root).unwrap_or(Path::new(""));
        let remote_dir = remote_path(&self.options.cloud_root, rel);

        match remote.ensure_folder(&remote_dir).await {
            Ok(outcome) => {
                debug!(folder = %remote_dir, ?outcome, "remote folder ready");
                Some(remote_dir)
            }
            Err(e) => {
                error!(folder = %remote_dir, error = %e, "failed to create remote folder, skipping its files");
                report.folders_failed += 1;
                report.errors += 1;
                None
            }
        }
    }

    /// Second phase of a directory: quota snapshot, then each file in turn.
    async fn stream_files(
        &self,
        remote: &dyn RemoteStore,
        dir: &Path,
        remote_dir: &str,
        scan: &ScanOptions,
        report: &mut RunReport,
    ) {
        let quota = match remote.free_space().await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(dir = %dir.display(), error = %e, "cloud space lookup failed");
                report.errors += 1;
                0
            }
        };

        let files = match list_eligible_files(dir, quota, scan) {
            Ok(files) => files,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "cannot list directory");
                report.warnings += 1;
                return;
            }
        };

        for item in files {
            let candidate = match item {
                Ok(candidate) => candidate,
                Err(rejection) => {
                    log_rejection(&rejection);
                    report.skipped += 1;
                    report.warnings += 1;
                    continue;
                }
            };

            match self.upload_one(remote, &candidate, remote_dir, report).await {
                FileOutcome::Done { path, remote_path } => {
                    info!(file = %path.display(), remote = %remote_path, "file uploaded");
                    report.uploaded.insert(path);
                }
                FileOutcome::Failed {
                    path,
                    stage,
                    reason,
                } => {
                    error!(file = %path.display(), ?stage, error = %reason, "file upload failed");
                    report.failed += 1;
                    report.errors += 1;
                }
            }
        }
    }

    /// Uploads bytes, then commits. Either failure leaves the file in place.
    async fn upload_one(
        &self,
        remote: &dyn RemoteStore,
        candidate: &UploadCandidate,
        remote_dir: &str,
        report: &mut RunReport,
    ) -> FileOutcome {
        let path = candidate.path.clone();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let remote_file = format!("{}/{}", remote_dir.trim_end_matches('/'), file_name);

        let content_type = match candidate.content_type.as_deref() {
            Some(ct) => ct,
            None => {
                warn!(file = %path.display(), default = DEFAULT_CONTENT_TYPE, "no file type detected, using default");
                report.warnings += 1;
                DEFAULT_CONTENT_TYPE
            }
        };

        let receipt = match remote.upload(&path, content_type).await {
            Ok(receipt) => receipt,
            Err(e) => {
                return FileOutcome::Failed {
                    path,
                    stage: FileStage::BytesUploaded,
                    reason: e.to_string(),
                };
            }
        };
        debug!(file = %path.display(), hash = %receipt.hash, size = receipt.size, "file posted");

        match remote.add_file(&remote_file, &receipt).await {
            Ok(outcome) => {
                debug!(remote = %remote_file, ?outcome, "file committed");
                FileOutcome::Done {
                    path,
                    remote_path: remote_file,
                }
            }
            Err(e) => FileOutcome::Failed {
                path,
                stage: FileStage::Committed,
                reason: e.to_string(),
            },
        }
    }

    /// Relocates uploaded files and prunes emptied directories.
    fn finish(&self, report: &mut RunReport) {
        let summary = relocate_uploaded(&report.uploaded, &self.options.disposal);
        report.moved = summary.moved;
        report.deleted = summary.deleted;
        report.errors += summary.failed;

        if self.options.remove_folders {
            match prune_empty_dirs(&self.options.upload_root) {
                Ok(pruned) => {
                    debug!(pruned, "empty directories removed");
                    report.pruned = pruned;
                }
                Err(e) => {
                    warn!(error = %e, "failed to prune empty directories");
                    report.warnings += 1;
                }
            }
        }
    }
}

fn log_rejection(rejection: &Rejection) {
    warn!(file = %rejection.path().display(), reason = %rejection, "file skipped");
}
