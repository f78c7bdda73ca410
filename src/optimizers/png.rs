//! PNG strategy: lossless pass through `optipng`, plus a `pngquant`
//! quantization pass whenever the pipeline requests a lossy rendition.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::args;
use crate::config::Config;
use crate::error::UploadError;
use crate::mime;

use super::{file_size, run_tool, OptimizationSummary, Optimizer};

pub struct PngOptimizer {
    level: u8,
    quality: Option<String>,
    timeout: Duration,
}

impl PngOptimizer {
    pub fn new(config: &Config) -> Self {
        Self {
            level: config.png_level,
            quality: config.pngquant_quality.clone(),
            timeout: config.tool_timeout(),
        }
    }
}

#[async_trait]
impl Optimizer for PngOptimizer {
    fn name(&self) -> &'static str {
        "png"
    }

    fn mime_type(&self) -> &'static str {
        mime::MIME_PNG
    }

    fn supports_lossy(&self) -> bool {
        true
    }

    async fn optimize_file(
        &self,
        src: &Path,
        dst: &Path,
        lossy: Option<&Path>,
    ) -> Result<OptimizationSummary, UploadError> {
        let mut summary = OptimizationSummary::default();
        summary.size_before = file_size(src).await?;

        let src_str = src.to_string_lossy().into_owned();
        let dst_str = dst.to_string_lossy().into_owned();
        let tool_args = args![
            &format!("-o{}", self.level),
            "-strip",
            "all",
            "-out",
            &dst_str,
            &src_str,
        ];
        run_tool("optipng", &tool_args, self.timeout).await?;

        if let Some(lossy) = lossy {
            let lossy_str = lossy.to_string_lossy().into_owned();
            let mut tool_args = args!["--force", "--output", &lossy_str];
            if let Some(ref quality) = self.quality {
                tool_args.push(format!("--quality={}", quality));
            }
            tool_args.push(src_str.clone());
            run_tool("pngquant", &tool_args, self.timeout).await?;

            summary.size_lossy = file_size(lossy).await?;
        }

        summary.size_after = file_size(dst).await?;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities() {
        let optimizer = PngOptimizer::new(&Config::default());
        assert_eq!(optimizer.name(), "png");
        assert_eq!(optimizer.mime_type(), "image/png");
        assert!(optimizer.supports_lossy());
        assert!(!optimizer.supports_data());
    }

    #[tokio::test]
    async fn test_data_strategy_unsupported() {
        let optimizer = PngOptimizer::new(&Config::default());
        let err = optimizer.optimize_data(b"png bytes").await.unwrap_err();
        assert!(matches!(err, UploadError::InMemoryUnsupported("png")));
    }
}
