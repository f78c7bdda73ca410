//! # Response Envelope Module
//!
//! JSON contract returned by the upload endpoint. Every terminal state of the
//! pipeline produces exactly one envelope: success carries an [`UploadReport`],
//! failure carries a structured error with a stable type code.

use serde::{Deserialize, Serialize};

use crate::error::UploadError;

/// A published artifact with its size deltas against the uploaded original
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRef {
    /// Path under the static root, e.g. `/uploads/<dir>/<sha1>.jpg`
    pub url: String,
    /// Size in bytes
    pub size: u64,
    /// Bytes saved against the original (negative when larger)
    pub size_diff: i64,
    /// Percentage saved against the original
    pub percent_diff: f64,
}

/// Summary of a successful upload: source, compressed and optional lossy rendition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReport {
    pub source: FileRef,
    pub compressed: FileRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lossy: Option<FileRef>,
    /// Detected MIME type of the upload
    pub file_type: String,
}

/// Structured error body, mirrors [`UploadError`] for clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseError {
    pub message: String,
    pub detail: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub code: u16,
}

/// Uniform success/error wrapper for every response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<UploadReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
}

impl ResponseEnvelope {
    pub fn success(result: UploadReport) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(error: &UploadError) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(ResponseError {
                message: error.to_string(),
                detail: error.detail().to_string(),
                kind: error.kind().to_string(),
                code: error.status_code().as_u16(),
            }),
        }
    }
}
