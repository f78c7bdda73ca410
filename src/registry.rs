//! # Optimizer Registry Module
//!
//! Maps detected MIME types to optimization strategies. The registry is
//! populated once during startup wiring and injected into the pipeline
//! behind an `Arc`, so concurrent requests share immutable entries without
//! synchronization.
//!
//! Registration appends: duplicate MIME types are allowed and lookup
//! returns the first match, making registration order deterministic and
//! meaningful.

use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::error::UploadError;
use crate::mime;
use crate::optimizers::{GifOptimizer, JpegOptimizer, OptimizationSummary, Optimizer, PngOptimizer};

/// Ordered collection of per-format optimization strategies
pub struct OptimizerRegistry {
    entries: Vec<Arc<dyn Optimizer>>,
}

impl OptimizerRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Registry with the built-in JPEG, PNG and GIF strategies
    pub fn with_default_optimizers(config: &Config) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(JpegOptimizer::new(config)));
        registry.register(Arc::new(PngOptimizer::new(config)));
        registry.register(Arc::new(GifOptimizer::new(config)));
        registry
    }

    /// Append a strategy; duplicates are kept, first match wins on lookup
    pub fn register(&mut self, optimizer: Arc<dyn Optimizer>) {
        info!(
            "Registered optimizer: {} ({})",
            optimizer.name(),
            optimizer.mime_type()
        );
        self.entries.push(optimizer);
    }

    /// Resolve a strategy by exact MIME type match
    pub fn resolve(&self, mime_type: &str) -> Option<&Arc<dyn Optimizer>> {
        self.entries
            .iter()
            .find(|optimizer| optimizer.mime_type() == mime_type)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Optimize a byte buffer in memory, resolving the strategy by sniffing
    /// the buffer itself
    pub async fn optimize_data(
        &self,
        src: &[u8],
    ) -> Result<(Vec<u8>, OptimizationSummary), UploadError> {
        let mime_type = mime::sniff(&src[..src.len().min(mime::SNIFF_LEN)]);
        let optimizer = self
            .resolve(&mime_type)
            .ok_or(UploadError::UnknownFormat(mime_type))?;
        optimizer.optimize_data(src).await
    }
}

impl Default for OptimizerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
