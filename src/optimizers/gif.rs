//! GIF strategy: lossless optimization through `gifsicle`.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::args;
use crate::config::Config;
use crate::error::UploadError;
use crate::mime;

use super::{file_size, run_tool, OptimizationSummary, Optimizer};

pub struct GifOptimizer {
    level: u8,
    timeout: Duration,
}

impl GifOptimizer {
    pub fn new(config: &Config) -> Self {
        Self {
            level: config.gif_level,
            timeout: config.tool_timeout(),
        }
    }
}

#[async_trait]
impl Optimizer for GifOptimizer {
    fn name(&self) -> &'static str {
        "gif"
    }

    fn mime_type(&self) -> &'static str {
        mime::MIME_GIF
    }

    async fn optimize_file(
        &self,
        src: &Path,
        dst: &Path,
        _lossy: Option<&Path>,
    ) -> Result<OptimizationSummary, UploadError> {
        let mut summary = OptimizationSummary::default();
        summary.size_before = file_size(src).await?;

        let src_str = src.to_string_lossy().into_owned();
        let dst_str = dst.to_string_lossy().into_owned();
        let tool_args = args![&format!("-O{}", self.level), "-o", &dst_str, &src_str];
        run_tool("gifsicle", &tool_args, self.timeout).await?;

        summary.size_after = file_size(dst).await?;
        Ok(summary)
    }
}
