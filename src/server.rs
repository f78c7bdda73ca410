//! # HTTP Server Module
//!
//! Thin axum wiring around the upload pipeline: the `POST /upload` handler,
//! a typed 405 for other methods, static serving of the public directory,
//! request tracing and panic recovery. All interesting behavior lives in
//! [`crate::pipeline`]; this module only adapts multipart bodies into the
//! pipeline's byte stream and envelopes into responses.

use std::sync::Arc;

use axum::extract::multipart::{Field, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::routing::post;
use axum::{Json, Router};
use bytes::Bytes;
use futures::Stream;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::UploadError;
use crate::pipeline::UploadPipeline;
use crate::response::ResponseEnvelope;

/// Multipart form field carrying the image
pub const UPLOAD_FIELD: &str = "upload[file]";

/// Shared state handed to every request handler
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<UploadPipeline>,
}

impl AppState {
    pub fn new(pipeline: Arc<UploadPipeline>) -> Self {
        Self { pipeline }
    }
}

/// Build the application router
pub fn router(state: AppState, config: &Config) -> Router {
    Router::new()
        .route("/upload", post(upload).fallback(method_not_allowed))
        .fallback_service(ServeDir::new(&config.public_dir))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
        .with_state(state)
}

/// `POST /upload`: stream the `upload[file]` field through the pipeline
async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ResponseEnvelope>, UploadError> {
    let mut multipart = multipart.map_err(|e| UploadError::Multipart(e.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| UploadError::Multipart(e.to_string()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let report = state
            .pipeline
            .process(Box::pin(field_stream(field)))
            .await?;
        return Ok(Json(ResponseEnvelope::success(report)));
    }

    Err(UploadError::MissingFile)
}

async fn method_not_allowed() -> UploadError {
    UploadError::MethodNotAllowed
}

/// Adapt a multipart field into the pipeline's chunk stream
fn field_stream(field: Field<'_>) -> impl Stream<Item = Result<Bytes, UploadError>> + '_ {
    futures::stream::try_unfold(field, |mut field| async move {
        match field.chunk().await {
            Ok(Some(chunk)) => Ok(Some((chunk, field))),
            Ok(None) => Ok(None),
            Err(e) => Err(UploadError::Multipart(e.to_string())),
        }
    })
}
