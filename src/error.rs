//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce `UploadError` enum per categorizzare tutti gli errori possibili
//! - Mappa ogni errore verso uno status HTTP e un type code stabile
//! - Integra con `thiserror` per automatic error conversion
//! - Converte gli errori in envelope JSON tramite `IntoResponse`
//!
//! ## Categorie di errori:
//! - `Io`: Errori di I/O (file non trovati, permessi, etc.) -> 500
//! - `UnsupportedFormat`: MIME type fuori dall'allow-list -> 415
//! - `UnknownFormat`: Nessuna strategia registrata per il MIME type -> 415
//! - `ToolFailed` / `MissingTool`: Tool esterno fallito o mancante -> 502 / 500
//! - `ToolTimeout`: Tool esterno oltre il timeout configurato -> 504
//! - `NoImprovement`: File già ottimizzato, regola di business -> 422
//! - `Multipart` / `MissingFile`: Richiesta malformata -> 400
//! - `MethodNotAllowed`: Metodo HTTP diverso da POST -> 405
//!
//! Lo stderr dei tool esterni non raggiunge mai il client: viene solo loggato.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::response::ResponseEnvelope;

/// Typed errors produced by the upload pipeline and its collaborators
#[derive(thiserror::Error, Debug)]
pub enum UploadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file type not allowed: {0}")]
    UnsupportedFormat(String),

    #[error("no optimizer registered for mime type: {0}")]
    UnknownFormat(String),

    #[error("{tool} exited with {status}")]
    ToolFailed { tool: &'static str, status: String },

    #[error("{tool} timed out after {seconds}s")]
    ToolTimeout { tool: &'static str, seconds: u64 },

    #[error("optimizer tool not found: {0}")]
    MissingTool(&'static str),

    #[error("in-memory optimization not supported by {0}")]
    InMemoryUnsupported(&'static str),

    #[error("no compression achieved: {size_after} of {size_before} bytes")]
    NoImprovement { size_before: u64, size_after: u64 },

    #[error("malformed multipart body: {0}")]
    Multipart(String),

    #[error("missing multipart field: upload[file]")]
    MissingFile,

    #[error("method not allowed")]
    MethodNotAllowed,
}

impl UploadError {
    /// HTTP status code associated with this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            UploadError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            UploadError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            UploadError::UnknownFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            UploadError::ToolFailed { .. } => StatusCode::BAD_GATEWAY,
            UploadError::ToolTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            UploadError::MissingTool(_) => StatusCode::INTERNAL_SERVER_ERROR,
            UploadError::InMemoryUnsupported(_) => StatusCode::INTERNAL_SERVER_ERROR,
            UploadError::NoImprovement { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            UploadError::Multipart(_) => StatusCode::BAD_REQUEST,
            UploadError::MissingFile => StatusCode::BAD_REQUEST,
            UploadError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    /// Stable machine-readable type code for clients
    pub fn kind(&self) -> &'static str {
        match self {
            UploadError::Io(_) => "io_error",
            UploadError::UnsupportedFormat(_) => "unsupported_format",
            UploadError::UnknownFormat(_) => "unknown_format",
            UploadError::ToolFailed { .. } => "optimizer_failed",
            UploadError::ToolTimeout { .. } => "optimizer_timeout",
            UploadError::MissingTool(_) => "optimizer_missing",
            UploadError::InMemoryUnsupported(_) => "in_memory_unsupported",
            UploadError::NoImprovement { .. } => "no_improvement",
            UploadError::Multipart(_) => "bad_multipart",
            UploadError::MissingFile => "missing_file",
            UploadError::MethodNotAllowed => "method_not_allowed",
        }
    }

    /// User-facing guidance, safe to return to clients
    pub fn detail(&self) -> &'static str {
        match self {
            UploadError::Io(_) => "the server could not read or write a file",
            UploadError::UnsupportedFormat(_) => "only JPEG, PNG and GIF images are accepted",
            UploadError::UnknownFormat(_) => "no optimizer is registered for this media type",
            UploadError::ToolFailed { .. } => "the external optimizer did not complete successfully",
            UploadError::ToolTimeout { .. } => "the external optimizer exceeded the configured time limit",
            UploadError::MissingTool(_) => "a required external optimizer is not installed on the server",
            UploadError::InMemoryUnsupported(_) => "this format only supports file-based optimization",
            UploadError::NoImprovement { .. } => "the file is already optimized, compression would not reduce its size",
            UploadError::Multipart(_) => "the multipart request body could not be parsed",
            UploadError::MissingFile => "send the image as multipart form field upload[file]",
            UploadError::MethodNotAllowed => "use POST to upload an image",
        }
    }
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("upload failed: {}", self);
        } else {
            tracing::debug!("upload rejected: {}", self);
        }
        (status, Json(ResponseEnvelope::failure(&self))).into_response()
    }
}
