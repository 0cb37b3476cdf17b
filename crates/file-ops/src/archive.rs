//! Single-file zip archiving.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

/// Extension given to archives.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Content types that are already compressed and never archived again.
pub const PRESERVED_CONTENT_TYPES: &[&str] = &["application/zip"];

/// Errors from archiving a file.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("archive already exists: {0}")]
    TargetExists(PathBuf),

    #[error("not a file name: {0}")]
    NoFileName(PathBuf),
}

/// Guesses a content type from the file name.
pub fn content_type_of(path: &Path) -> Option<String> {
    mime_guess::from_path(path)
        .first_raw()
        .map(str::to_string)
}

/// Returns true for files whose content type is in [`PRESERVED_CONTENT_TYPES`].
pub fn is_preserved(path: &Path) -> bool {
    content_type_of(path).is_some_and(|ct| PRESERVED_CONTENT_TYPES.contains(&ct.as_str()))
}

/// Returns the archive path for `path`: same directory and stem, `.zip`
/// replacing the extension (or added when there is none).
pub fn archive_path_for(path: &Path) -> PathBuf {
    path.with_extension(ARCHIVE_EXTENSION)
}

/// Compresses `path` into a sibling archive and deletes the original.
///
/// Never fails: on any error the original path is returned unchanged and
/// no partial archive is left behind. Preserved content types are returned
/// as they are.
pub fn archive_file(path: &Path) -> PathBuf {
    if is_preserved(path) {
        return path.to_path_buf();
    }

    match try_archive(path) {
        Ok(target) => {
            tracing::debug!(from = %path.display(), to = %target.display(), "file archived");
            target
        }
        Err(e) => {
            tracing::warn!(file = %path.display(), error = %e, "failed to archive, uploading as is");
            path.to_path_buf()
        }
    }
}

/// Fallible core of [`archive_file`]. Returns the archive path.
///
/// Refuses to overwrite an existing archive, since that file is itself
/// upload material.
pub fn try_archive(path: &Path) -> Result<PathBuf, ArchiveError> {
    let entry_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| ArchiveError::NoFileName(path.to_path_buf()))?;
    let target = archive_path_for(path);

    let out = match OpenOptions::new().write(true).create_new(true).open(&target) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(ArchiveError::TargetExists(target));
        }
        Err(e) => return Err(e.into()),
    };

    if let Err(e) = write_single_entry(out, path, &entry_name) {
        let _ = std::fs::remove_file(&target);
        return Err(e);
    }

    if let Err(e) = std::fs::remove_file(path) {
        let _ = std::fs::remove_file(&target);
        return Err(e.into());
    }

    Ok(target)
}

fn write_single_entry(out: File, source: &Path, entry_name: &str) -> Result<(), ArchiveError> {
    let mut input = File::open(source)?;
    let mut writer = zip::ZipWriter::new(out);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(input.metadata()?.len() >= u64::from(u32::MAX));

    writer.start_file(entry_name, options)?;
    io::copy(&mut input, &mut writer)?;
    writer.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn read_entry(archive: &Path) -> (String, Vec<u8>) {
        let mut zip = zip::ZipArchive::new(File::open(archive).unwrap()).unwrap();
        assert_eq!(zip.len(), 1, "archive should hold one entry");
        let mut entry = zip.by_index(0).unwrap();
        let mut data = Vec::new();
        entry.read_to_end(&mut data).unwrap();
        (entry.name().to_string(), data)
    }

    #[test]
    fn archive_path_replaces_extension() {
        assert_eq!(
            archive_path_for(Path::new("/d/report.txt")),
            PathBuf::from("/d/report.zip")
        );
        assert_eq!(
            archive_path_for(Path::new("/d/backup.tar.gz")),
            PathBuf::from("/d/backup.tar.zip")
        );
        assert_eq!(
            archive_path_for(Path::new("/d/Makefile")),
            PathBuf::from("/d/Makefile.zip")
        );
    }

    #[test]
    fn content_types() {
        assert_eq!(content_type_of(Path::new("a.txt")).as_deref(), Some("text/plain"));
        assert_eq!(
            content_type_of(Path::new("a.zip")).as_deref(),
            Some("application/zip")
        );
        assert_eq!(content_type_of(Path::new("noext")), None);
        assert!(is_preserved(Path::new("x/y.ZIP")));
        assert!(!is_preserved(Path::new("x/y.txt")));
    }

    #[test]
    fn archive_replaces_original() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("notes.txt");
        std::fs::write(&file, b"some notes worth keeping").unwrap();

        let archived = archive_file(&file);

        assert_eq!(archived, tmp.path().join("notes.zip"));
        assert!(!file.exists());
        let (name, data) = read_entry(&archived);
        assert_eq!(name, "notes.txt");
        assert_eq!(data, b"some notes worth keeping");
    }

    #[test]
    fn archive_skips_preserved_types() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("already.zip");
        std::fs::write(&file, b"PK not really").unwrap();

        assert_eq!(archive_file(&file), file);
        assert_eq!(std::fs::read(&file).unwrap(), b"PK not really");
    }

    #[test]
    fn archiving_twice_does_not_double_archive() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("data.csv");
        std::fs::write(&file, b"a,b\n1,2\n").unwrap();

        let first = archive_file(&file);
        let second = archive_file(&first);

        assert_eq!(first, second);
        let entries: Vec<_> = std::fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn archive_declines_existing_target() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("log.txt");
        let existing = tmp.path().join("log.zip");
        std::fs::write(&file, b"text").unwrap();
        std::fs::write(&existing, b"older archive").unwrap();

        assert!(matches!(try_archive(&file), Err(ArchiveError::TargetExists(_))));
        assert_eq!(archive_file(&file), file);
        assert!(file.exists());
        assert_eq!(std::fs::read(&existing).unwrap(), b"older archive");
    }

    #[test]
    fn archive_missing_file_leaves_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("vanished.txt");

        assert_eq!(archive_file(&file), file);
        assert!(!tmp.path().join("vanished.zip").exists());
    }
}
