//! Decoder for the upload endpoint's plain-text answer.
//!
//! The endpoint replies `<hash><sep><size>\r\n`: a fixed-width content hash,
//! one separator byte, then the stored size in decimal. Nothing else about the
//! format is known, so the offsets live here and nowhere else.

/// Width of the content hash at the start of the response.
pub const HASH_LEN: usize = 40;

/// Content hash and byte size returned by a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub hash: String,
    pub size: u64,
}

/// Errors decoding an upload response.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("empty response, no hash and size obtained")]
    Empty,

    #[error("response too short ({0} bytes)")]
    TooShort(usize),

    #[error("invalid hash {0:?}")]
    InvalidHash(String),

    #[error("invalid size {0:?}")]
    InvalidSize(String),
}

/// Decodes an upload response body into a receipt.
pub fn decode_upload_response(body: &[u8]) -> Result<UploadReceipt, DecodeError> {
    if body.is_empty() {
        return Err(DecodeError::Empty);
    }
    if body.len() <= HASH_LEN + 1 {
        return Err(DecodeError::TooShort(body.len()));
    }

    let hash = &body[..HASH_LEN];
    if !hash.iter().all(u8::is_ascii_hexdigit) {
        return Err(DecodeError::InvalidHash(
            String::from_utf8_lossy(hash).into_owned(),
        ));
    }

    let size_raw = String::from_utf8_lossy(&body[HASH_LEN + 1..]);
    let size_str = size_raw.trim_end_matches(['\r', '\n']);
    let size = size_str
        .parse::<u64>()
        .map_err(|_| DecodeError::InvalidSize(size_str.to_string()))?;

    Ok(UploadReceipt {
        // Validated as ASCII above.
        hash: String::from_utf8_lossy(hash).into_owned(),
        size,
    })
}
