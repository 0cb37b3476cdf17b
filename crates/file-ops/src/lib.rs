//! Local file operations for the uploader.
//!
//! Archives files before upload, lists the eligible files of one directory
//! against the remote quota, and moves or deletes files once uploaded.

mod archive;
mod relocate;
mod scan;

pub use archive::{
    ARCHIVE_EXTENSION, ArchiveError, PRESERVED_CONTENT_TYPES, archive_file, archive_path_for,
    content_type_of, is_preserved, try_archive,
};
pub use relocate::{
    Disposal, RelocateError, RelocationSummary, move_into, prune_empty_dirs, relocate_uploaded,
};
pub use scan::{
    DirTree, EligibleFiles, QuotaGate, Rejection, ScanOptions, UploadCandidate, list_eligible_files,
    walk_dirs,
};

/// Content type assumed when none can be guessed from the file name.
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain";
