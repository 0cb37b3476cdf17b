//! Directory scanning for upload.
//!
//! [`walk_dirs`] lists the directory tree in pre-order; the driver visits
//! each directory in turn and calls [`list_eligible_files`] for its
//! immediate files only.

use std::collections::HashSet;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use crate::archive::{archive_file, content_type_of, is_preserved};

/// A local file accepted for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadCandidate {
    pub path: PathBuf,
    /// Content type guessed from the (possibly archived) file name.
    pub content_type: Option<String>,
    pub size: u64,
}

/// Why a file was left out of the upload.
#[derive(Debug)]
pub enum Rejection {
    /// Larger than the provider accepts.
    TooLarge { path: PathBuf, size: u64, limit: u64 },
    /// Larger than the remaining quota, or listed after a file that was.
    OverQuota {
        path: PathBuf,
        size: u64,
        remaining: u64,
    },
    /// Metadata could not be read.
    Unreadable { path: PathBuf, error: io::Error },
}

impl Rejection {
    pub fn path(&self) -> &Path {
        match self {
            Rejection::TooLarge { path, .. }
            | Rejection::OverQuota { path, .. }
            | Rejection::Unreadable { path, .. } => path,
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::TooLarge { path, size, limit } => write!(
                f,
                "{} is too large ({size} B, limit {limit} B)",
                path.display()
            ),
            Rejection::OverQuota {
                path,
                size,
                remaining,
            } => write!(
                f,
                "not enough cloud space for {} (left {remaining} B, required {size} B)",
                path.display()
            ),
            Rejection::Unreadable { path, error } => {
                write!(f, "cannot read {}: {error}", path.display())
            }
        }
    }
}

/// Settings for one directory scan.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Archive files that are not already compressed.
    pub archive: bool,
    /// Provider ceiling; files of this size or larger are rejected.
    pub max_file_size: u64,
    /// Housekeeping files never uploaded (canonical paths).
    skip: HashSet<PathBuf>,
}

impl ScanOptions {
    pub fn new(archive: bool, max_file_size: u64) -> Self {
        Self {
            archive,
            max_file_size,
            skip: HashSet::new(),
        }
    }

    /// Adds a housekeeping path to skip.
    pub fn skip_path(&mut self, path: &Path) {
        self.skip.insert(canonical(path));
    }

    pub fn is_skipped(&self, path: &Path) -> bool {
        !self.skip.is_empty() && self.skip.contains(&canonical(path))
    }
}

fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Remaining-quota snapshot taken when a directory is entered.
///
/// Not decremented per accepted file. Once one file does not fit, the gate
/// stays closed for the rest of the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaGate {
    remaining: u64,
    closed: bool,
}

impl QuotaGate {
    pub fn new(remaining: u64) -> Self {
        Self {
            remaining,
            closed: false,
        }
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Returns true if a file of `size` bytes fits.
    pub fn admit(&mut self, size: u64) -> bool {
        if self.closed {
            return false;
        }
        if size < self.remaining {
            true
        } else {
            self.closed = true;
            false
        }
    }
}

/// Lazy sequence of the eligible files of one directory.
///
/// Archiving happens as the iterator advances, so a caller that stops early
/// leaves the remaining files untouched.
pub struct EligibleFiles<'a> {
    files: std::vec::IntoIter<PathBuf>,
    gate: QuotaGate,
    options: &'a ScanOptions,
}

impl EligibleFiles<'_> {
    pub fn gate(&self) -> &QuotaGate {
        &self.gate
    }
}

impl Iterator for EligibleFiles<'_> {
    type Item = Result<UploadCandidate, Rejection>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let original = self.files.next()?;
            if self.options.is_skipped(&original) {
                tracing::debug!(file = %original.display(), "skipping housekeeping file");
                continue;
            }

            let path = if self.options.archive && !is_preserved(&original) {
                archive_file(&original)
            } else {
                original
            };

            let size = match std::fs::metadata(&path) {
                Ok(meta) => meta.len(),
                Err(error) => return Some(Err(Rejection::Unreadable { path, error })),
            };

            if size >= self.options.max_file_size {
                return Some(Err(Rejection::TooLarge {
                    path,
                    size,
                    limit: self.options.max_file_size,
                }));
            }

            if !self.gate.admit(size) {
                return Some(Err(Rejection::OverQuota {
                    path,
                    size,
                    remaining: self.gate.remaining(),
                }));
            }

            let content_type = content_type_of(&path);
            return Some(Ok(UploadCandidate {
                path,
                content_type,
                size,
            }));
        }
    }
}

/// Lists the immediate files of `dir` (sorted by name) as a lazy sequence
/// of candidates and rejections, judged against `quota` free bytes.
pub fn list_eligible_files<'a>(
    dir: &Path,
    quota: u64,
    options: &'a ScanOptions,
) -> io::Result<EligibleFiles<'a>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        // Follows symlinks so linked files are uploaded.
        if std::fs::metadata(&path).map(|m| m.is_file()).unwrap_or(false) {
            files.push(path);
        }
    }
    files.sort();

    Ok(EligibleFiles {
        files: files.into_iter(),
        gate: QuotaGate::new(quota),
        options,
    })
}

/// Directories of a tree in visiting order, plus the ones that could not
/// be read.
#[derive(Debug, Default)]
pub struct DirTree {
    pub dirs: Vec<PathBuf>,
    pub unreadable: Vec<(PathBuf, io::Error)>,
}

/// Lists `root` and every directory below it in pre-order, siblings sorted
/// by name. Fails only if `root` itself cannot be read.
pub fn walk_dirs(root: &Path) -> io::Result<DirTree> {
    let mut tree = DirTree::default();
    let children = subdirs(root)?;
    tree.dirs.push(root.to_path_buf());
    for child in children {
        walk_into(&child, &mut tree);
    }
    Ok(tree)
}

fn walk_into(dir: &Path, tree: &mut DirTree) {
    match subdirs(dir) {
        Ok(children) => {
            tree.dirs.push(dir.to_path_buf());
            for child in children {
                walk_into(&child, tree);
            }
        }
        Err(e) => tree.unreadable.push((dir.to_path_buf(), e)),
    }
}

/// Immediate subdirectories, sorted. Symlinked directories are not followed.
fn subdirs(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}
