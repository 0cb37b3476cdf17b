//! Client for the cloud storage web API.
//!
//! The API is undocumented; every call is a single request with no retry.
//!
//! # Session flow
//!
//! 1. **Authenticate**: form POST to the identity endpoint, cookies kept
//! 2. **Token**: fetch the 32-character CSRF token
//! 3. **Domain**: ask the dispatcher for this session's upload URL
//! 4. **Upload**: multipart POST of file bytes, answered with hash and size
//! 5. **Commit**: register the hash at a remote path (`file/add`, `folder/add`)

pub mod client;
pub mod decode;
pub mod error;
pub mod session;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::{Client, Endpoints};
pub use decode::{DecodeError, HASH_LEN, UploadReceipt, decode_upload_response};
pub use error::Error;
pub use session::Session;
pub use types::CommitOutcome;

/// API revision sent with every commit and quota request.
pub const API_VERSION: u32 = 2;

/// Upload-domain ordinal expected by the upload endpoint.
pub const CLOUD_DOMAIN_ORD: u32 = 2;

/// Suffix appended to the upload timestamp parameter.
pub const TIME_AMEND: &str = "0246";

/// Name-collision policy for commits: fail and report, never overwrite.
pub const CONFLICT_POLICY: &str = "strict";

/// Largest file the provider accepts (2 GiB).
pub const MAX_FILE_SIZE: u64 = 2 * 1024 * 1024 * 1024;

/// Length of a valid CSRF token.
pub const CSRF_TOKEN_LEN: usize = 32;
