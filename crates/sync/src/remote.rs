//! Remote store trait.
//!
//! The driver only needs four calls from the cloud. Keeping them behind a
//! trait lets the run be tested without a network.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use cloudpush_api::{CommitOutcome, Session, UploadReceipt};

use crate::error::SyncError;

/// Boxed future returned by [`RemoteStore`] methods.
pub type RemoteFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SyncError>> + Send + 'a>>;

/// Abstract cloud storage used by the run.
pub trait RemoteStore: Send + Sync {
    /// Returns the free space in bytes.
    fn free_space(&self) -> RemoteFuture<'_, u64>;

    /// Creates a remote folder; an existing folder is not an error.
    fn ensure_folder<'a>(&'a self, remote_path: &'a str) -> RemoteFuture<'a, CommitOutcome>;

    /// Sends a file's bytes and returns the stored hash and size.
    fn upload<'a>(&'a self, path: &'a Path, content_type: &'a str)
    -> RemoteFuture<'a, UploadReceipt>;

    /// Registers uploaded content at a remote path.
    fn add_file<'a>(
        &'a self,
        remote_path: &'a str,
        receipt: &'a UploadReceipt,
    ) -> RemoteFuture<'a, CommitOutcome>;
}

impl RemoteStore for Session {
    fn free_space(&self) -> RemoteFuture<'_, u64> {
        Box::pin(async move { Ok(self.fetch_space().await?) })
    }

    fn ensure_folder<'a>(&'a self, remote_path: &'a str) -> RemoteFuture<'a, CommitOutcome> {
        Box::pin(async move { Ok(Session::ensure_folder(self, remote_path).await?) })
    }

    fn upload<'a>(
        &'a self,
        path: &'a Path,
        content_type: &'a str,
    ) -> RemoteFuture<'a, UploadReceipt> {
        Box::pin(async move { Ok(self.upload_bytes(path, content_type).await?) })
    }

    fn add_file<'a>(
        &'a self,
        remote_path: &'a str,
        receipt: &'a UploadReceipt,
    ) -> RemoteFuture<'a, CommitOutcome> {
        Box::pin(async move { Ok(Session::add_file(self, remote_path, receipt).await?) })
    }
}
