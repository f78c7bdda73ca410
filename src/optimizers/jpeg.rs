//! JPEG strategy: lossless progressive re-encode through `jpegtran`.
//!
//! The only format with an in-memory strategy as well - jpegtran streams
//! stdin to stdout, so byte buffers never touch the filesystem.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::warn;

use crate::args;
use crate::config::Config;
use crate::error::UploadError;
use crate::mime;

use super::{file_size, run_tool, OptimizationSummary, Optimizer};

const TOOL: &str = "jpegtran";

pub struct JpegOptimizer {
    timeout: Duration,
}

impl JpegOptimizer {
    pub fn new(config: &Config) -> Self {
        Self {
            timeout: config.tool_timeout(),
        }
    }
}

#[async_trait]
impl Optimizer for JpegOptimizer {
    fn name(&self) -> &'static str {
        "jpeg"
    }

    fn mime_type(&self) -> &'static str {
        mime::MIME_JPEG
    }

    fn supports_data(&self) -> bool {
        true
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
        let tool_args = args![
            "-optimize",
            "-progressive",
            "-copy",
            "none",
            "-outfile",
            &dst_str,
            &src_str,
        ];
        run_tool(TOOL, &tool_args, self.timeout).await?;

        summary.size_after = file_size(dst).await?;
        Ok(summary)
    }

    async fn optimize_data(
        &self,
        src: &[u8],
    ) -> Result<(Vec<u8>, OptimizationSummary), UploadError> {
        let mut summary = OptimizationSummary {
            size_before: src.len() as u64,
            ..Default::default()
        };

        let mut child = Command::new(TOOL)
            .args(["-optimize", "-progressive", "-copy", "none"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => UploadError::MissingTool(TOOL),
                _ => UploadError::Io(e),
            })?;

        // Feed stdin from a separate task so a full stdout pipe cannot
        // deadlock against our write
        if let Some(mut stdin) = child.stdin.take() {
            let data = src.to_vec();
            tokio::spawn(async move {
                let _ = stdin.write_all(&data).await;
                let _ = stdin.shutdown().await;
            });
        }

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                warn!("{} timed out after {:?}", TOOL, self.timeout);
                return Err(UploadError::ToolTimeout {
                    tool: TOOL,
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("{} failed with {}: {}", TOOL, output.status, stderr.trim());
            return Err(UploadError::ToolFailed {
                tool: TOOL,
                status: output.status.to_string(),
            });
        }

        summary.size_after = output.stdout.len() as u64;
        Ok((output.stdout, summary))
    }
}
