//! Upload run driver.
//!
//! This crate implements the **run logic**: it walks the upload root one
//! directory at a time and pushes files through a [`RemoteStore`]. The API
//! session implements the trait; tests use an in-memory fake.
//!
//! # Pipeline
//!
//! 1. **Folder**: ensure the matching remote folder exists
//! 2. **Quota**: take one free-space snapshot for the directory
//! 3. **Files**: archive, filter, upload bytes, commit each file
//! 4. **Relocate**: after the whole walk, move or delete uploaded files
//! 5. **Prune**: remove local directories left empty

pub mod error;
pub mod paths;
pub mod remote;
pub mod run;
pub mod types;

pub use error::SyncError;
pub use paths::remote_path;
pub use remote::RemoteStore;
pub use run::SyncRun;
pub use types::{FileOutcome, FileStage, RunReport, SyncOptions};
