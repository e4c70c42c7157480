//! Image data URIs
//!
//! Photos travel as `data:<mime>;base64,<payload>` strings, both in
//! classification requests and in stored `photoUrl` fields.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Largest decoded image accepted (hosted model media limit)
pub const MAX_IMAGE_BYTES: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("No image data provided")]
    Empty,

    #[error("Malformed data URI: {0}")]
    Malformed(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMime(String),

    #[error("Image is {size} bytes, limit is {limit} bytes")]
    TooLarge { size: usize, limit: usize },

    #[error("Invalid base64 payload: {0}")]
    InvalidBase64(String),

    #[error("Could not recognize image format")]
    UnknownFormat,
}

/// Validated base64 image data URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    mime_type: String,
    data: String,
}

impl DataUri {
    /// Encode raw image bytes, sniffing the MIME type from the content
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ImageError> {
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }
        check_size(bytes.len())?;

        let kind = infer::get(bytes).ok_or(ImageError::UnknownFormat)?;
        if kind.matcher_type() != infer::MatcherType::Image {
            return Err(ImageError::UnsupportedMime(kind.mime_type().to_string()));
        }

        Ok(Self {
            mime_type: kind.mime_type().to_string(),
            data: STANDARD.encode(bytes),
        })
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Base64 payload without the `data:` prefix
    pub fn base64_data(&self) -> &str {
        &self.data
    }

    pub fn decode(&self) -> Result<Vec<u8>, ImageError> {
        STANDARD
            .decode(&self.data)
            .map_err(|e| ImageError::InvalidBase64(e.to_string()))
    }
}

fn check_size(size: usize) -> Result<(), ImageError> {
    if size > MAX_IMAGE_BYTES {
        return Err(ImageError::TooLarge {
            size,
            limit: MAX_IMAGE_BYTES,
        });
    }
    Ok(())
}

impl FromStr for DataUri {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, ImageError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ImageError::Empty);
        }

        let rest = s
            .strip_prefix("data:")
            .ok_or_else(|| ImageError::Malformed("missing 'data:' prefix".to_string()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| ImageError::Malformed("missing ',' separator".to_string()))?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| ImageError::Malformed("payload must be base64 encoded".to_string()))?;

        if !mime_type.starts_with("image/") {
            return Err(ImageError::UnsupportedMime(mime_type.to_string()));
        }
        if payload.is_empty() {
            return Err(ImageError::Empty);
        }

        let decoded = STANDARD
            .decode(payload)
            .map_err(|e| ImageError::InvalidBase64(e.to_string()))?;
        check_size(decoded.len())?;

        Ok(Self {
            mime_type: mime_type.to_ascii_lowercase(),
            data: payload.to_string(),
        })
    }
}

impl fmt::Display for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{};base64,{}", self.mime_type, self.data)
    }
}
