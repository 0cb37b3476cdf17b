//! Response shapes of the JSON endpoints.

use serde::Deserialize;

/// Every JSON endpoint wraps its payload in `{"body": ...}`.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub body: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CsrfBody {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DispatcherBody {
    #[serde(default)]
    pub upload: Vec<DispatcherEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DispatcherEntry {
    pub url: String,
}

/// Quota figures, both in MiB.
#[derive(Debug, Deserialize)]
pub(crate) struct SpaceBody {
    pub total: u64,
    pub used: u64,
}

impl SpaceBody {
    /// Remaining bytes, saturating at zero when over quota.
    pub fn free_bytes(&self) -> u64 {
        self.total
            .saturating_sub(self.used)
            .saturating_mul(1024 * 1024)
    }
}

/// Error body of a rejected commit: `{"home":{"error":"exists","value":"/a"}}`.
#[derive(Debug, Deserialize)]
pub(crate) struct CommitErrorBody {
    #[serde(default)]
    pub home: Option<FieldError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FieldError {
    pub error: String,
}

impl CommitErrorBody {
    /// Error code reported for the `home` field, if any.
    pub fn home_error(&self) -> Option<&str> {
        self.home.as_ref().map(|h| h.error.as_str())
    }
}

/// Result of a commit (`file/add`, `folder/add`, `file/remove`).
///
/// An "already exists" answer is reported separately but counts as success:
/// with the strict conflict policy nothing is overwritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Created,
    AlreadyExists,
}
