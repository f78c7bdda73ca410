//! # MIME Detection Module
//!
//! Content-type sniffing for uploads. Only the first 512 bytes of a file are
//! inspected: the magic numbers of every supported container (JPEG, PNG, GIF)
//! sit inside that prefix. Detection never consumes the staged file, so
//! strategies re-read it from the start afterwards.
//!
//! An allow-list of exactly three MIME types gates acceptance; anything else
//! is rejected by the pipeline before any optimizer runs.

use std::path::Path;

use image::ImageFormat;
use tokio::io::AsyncReadExt;

use crate::error::UploadError;

pub const MIME_JPEG: &str = "image/jpeg";
pub const MIME_PNG: &str = "image/png";
pub const MIME_GIF: &str = "image/gif";

/// Number of leading bytes inspected for content sniffing
pub const SNIFF_LEN: usize = 512;

const FALLBACK_MIME: &str = "application/octet-stream";

/// Sniff the MIME type from a leading byte buffer
pub fn sniff(buffer: &[u8]) -> String {
    let mime = match image::guess_format(buffer) {
        Ok(ImageFormat::Jpeg) => MIME_JPEG,
        Ok(ImageFormat::Png) => MIME_PNG,
        Ok(ImageFormat::Gif) => MIME_GIF,
        Ok(ImageFormat::WebP) => "image/webp",
        Ok(ImageFormat::Bmp) => "image/bmp",
        Ok(ImageFormat::Tiff) => "image/tiff",
        Ok(ImageFormat::Ico) => "image/x-icon",
        Ok(_) | Err(_) => FALLBACK_MIME,
    };
    mime.to_string()
}

/// Sniff the MIME type of a file by reading its first [`SNIFF_LEN`] bytes
pub async fn detect_file(path: &Path) -> Result<String, UploadError> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut buffer = vec![0u8; SNIFF_LEN];
    let mut read = 0;

    // A single read may return short; fill up to SNIFF_LEN or EOF
    while read < buffer.len() {
        let n = file.read(&mut buffer[read..]).await?;
        if n == 0 {
            break;
        }
        read += n;
    }

    Ok(sniff(&buffer[..read]))
}

/// Whether a detected MIME type is accepted for upload
pub fn is_allowed(mime_type: &str) -> bool {
    matches!(mime_type, MIME_JPEG | MIME_PNG | MIME_GIF)
}

/// Published-file extension for an accepted MIME type
pub fn extension_for(mime_type: &str) -> Option<&'static str> {
    match mime_type {
        MIME_JPEG => Some("jpg"),
        MIME_PNG => Some("png"),
        MIME_GIF => Some("gif"),
        _ => None,
    }
}
