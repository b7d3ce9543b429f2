//! Uploaded media validation and blob lifecycle.
//!
//! Uploads are validated (extension, size, decodability) before any
//! session state is touched. Accepted bytes are retained in a
//! [`MediaBlob`] whose release is an explicit, side-effecting cleanup
//! step independent of annotation history.

use std::io::Cursor;

use image::ImageReader;

use crate::constants::media;
use crate::error::MediaError;

/// Supported image extensions
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tiff", "tif", "webp"];

/// Supported video extensions
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm"];

/// Check if a filename has a supported image extension.
/// Works with both full paths and just filenames.
pub fn is_image_filename(name: &str) -> bool {
    let lower = name.to_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(&format!(".{}", ext)))
}

/// Check if a filename has a supported video extension.
pub fn is_video_filename(name: &str) -> bool {
    let lower = name.to_lowercase();
    VIDEO_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(&format!(".{}", ext)))
}

/// Raw bytes of a file handed to the session by the host shell.
#[derive(Debug, Clone)]
pub struct MediaUpload {
    /// Filename of the upload
    pub name: String,
    /// Raw file bytes
    pub bytes: Vec<u8>,
}

impl MediaUpload {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Validate this upload as an image and return its pixel dimensions.
    ///
    /// Rejects unsupported extensions and oversized files before touching
    /// the bytes, then decodes the header for dimensions.
    pub fn validate_image(&self) -> Result<(u32, u32), MediaError> {
        if !is_image_filename(&self.name) {
            return Err(MediaError::unsupported(&self.name));
        }
        let size = self.bytes.len() as u64;
        if size > media::MAX_IMAGE_BYTES {
            return Err(MediaError::TooLarge {
                name: self.name.clone(),
                size,
                max: media::MAX_IMAGE_BYTES,
            });
        }

        let reader = ImageReader::new(Cursor::new(&self.bytes))
            .with_guessed_format()
            .map_err(|_| MediaError::decode_failed(&self.name))?;
        reader
            .into_dimensions()
            .map_err(|_| MediaError::decode_failed(&self.name))
    }

    /// Validate this upload as a video.
    ///
    /// Frame decoding happens in the detection service, so only the
    /// extension and size are checked here.
    pub fn validate_video(&self) -> Result<(), MediaError> {
        if !is_video_filename(&self.name) {
            return Err(MediaError::unsupported(&self.name));
        }
        let size = self.bytes.len() as u64;
        if size > media::MAX_VIDEO_BYTES {
            return Err(MediaError::TooLarge {
                name: self.name.clone(),
                size,
                max: media::MAX_VIDEO_BYTES,
            });
        }
        Ok(())
    }
}

/// Retained bytes of an accepted upload.
///
/// Blobs must be released when superseded by a new upload or when the
/// session ends, so memory growth stays bounded. Dropping a blob
/// releases it implicitly.
#[derive(Debug, Clone)]
pub struct MediaBlob {
    name: String,
    bytes: Vec<u8>,
}

impl MediaBlob {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The retained bytes; empty after release.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn is_released(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Free the retained bytes. Idempotent.
    pub fn release(&mut self) {
        if !self.bytes.is_empty() {
            log::debug!("🗑️ Released media blob '{}' ({} bytes)", self.name, self.bytes.len());
            self.bytes = Vec::new();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
