//! Moving or deleting uploaded files, and pruning emptied directories.

use std::io;
use std::path::{Path, PathBuf};

/// Errors from relocating a file or pruning a directory.
#[derive(Debug, thiserror::Error)]
pub enum RelocateError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{0} is not under the upload root")]
    OutsideRoot(PathBuf),
}

impl RelocateError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// What happens to a file after it was uploaded and committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposal {
    /// Leave it in place.
    Keep,
    /// Recreate its path relative to `source_root` under `destination_root`.
    Move {
        source_root: PathBuf,
        destination_root: PathBuf,
    },
    /// Unlink it.
    Delete,
}

/// Counts from [`relocate_uploaded`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelocationSummary {
    pub moved: usize,
    pub deleted: usize,
    pub failed: usize,
}

/// Applies `disposal` to every uploaded file. Failures are logged and
/// counted; the remaining files are still processed.
pub fn relocate_uploaded<'a, I>(files: I, disposal: &Disposal) -> RelocationSummary
where
    I: IntoIterator<Item = &'a PathBuf>,
{
    let mut summary = RelocationSummary::default();

    for file in files {
        match disposal {
            Disposal::Keep => {}
            Disposal::Move {
                source_root,
                destination_root,
            } => match move_into(file, source_root, destination_root) {
                Ok(dest) => {
                    tracing::info!(from = %file.display(), to = %dest.display(), "moved uploaded file");
                    summary.moved += 1;
                }
                Err(e) => {
                    tracing::error!(file = %file.display(), error = %e, "failed to move uploaded file");
                    summary.failed += 1;
                }
            },
            Disposal::Delete => match std::fs::remove_file(file) {
                Ok(()) => {
                    tracing::info!(file = %file.display(), "deleted uploaded file");
                    summary.deleted += 1;
                }
                Err(e) => {
                    tracing::error!(file = %file.display(), error = %e, "failed to delete uploaded file");
                    summary.failed += 1;
                }
            },
        }
    }

    summary
}

/// Moves `file` from under `source_root` to the same relative path under
/// `destination_root`, creating directories as needed. Returns the new path.
///
/// An existing file at the destination is replaced.
pub fn move_into(
    file: &Path,
    source_root: &Path,
    destination_root: &Path,
) -> Result<PathBuf, RelocateError> {
    let rel = file
        .strip_prefix(source_root)
        .map_err(|_| RelocateError::OutsideRoot(file.to_path_buf()))?;
    let dest = destination_root.join(rel);

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|e| RelocateError::io(parent, e))?;
    }

    if std::fs::rename(file, &dest).is_err() {
        // Rename fails across filesystems.
        std::fs::copy(file, &dest).map_err(|e| RelocateError::io(&dest, e))?;
        std::fs::remove_file(file).map_err(|e| RelocateError::io(file, e))?;
    }

    Ok(dest)
}

/// Removes every empty directory below `root`, deepest first. `root`
/// itself is kept. Returns the number of directories removed.
///
/// A directory emptied by removing its children goes in the same pass.
pub fn prune_empty_dirs(root: &Path) -> Result<usize, RelocateError> {
    let mut removed = 0;
    prune_children(root, &mut removed)?;
    Ok(removed)
}

/// Prunes below `dir`; returns true if `dir` is empty afterwards.
fn prune_children(dir: &Path, removed: &mut usize) -> Result<bool, RelocateError> {
    let entries = std::fs::read_dir(dir).map_err(|e| RelocateError::io(dir, e))?;

    let mut empty = true;
    for entry in entries {
        let entry = entry.map_err(|e| RelocateError::io(dir, e))?;
        let path = entry.path();
        let is_dir = entry
            .file_type()
            .map(|t| t.is_dir())
            .map_err(|e| RelocateError::io(&path, e))?;

        if !is_dir {
            empty = false;
            continue;
        }

        match prune_children(&path, removed) {
            Ok(true) => match std::fs::remove_dir(&path) {
                Ok(()) => {
                    tracing::debug!(dir = %path.display(), "removed empty directory");
                    *removed += 1;
                }
                Err(e) => {
                    tracing::warn!(dir = %path.display(), error = %e, "failed to remove empty directory");
                    empty = false;
                }
            },
            Ok(false) => empty = false,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable directory");
                empty = false;
            }
        }
    }

    Ok(empty)
}
