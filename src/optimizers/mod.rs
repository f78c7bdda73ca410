//! # Optimizer Strategies Module
//!
//! Per-format adapters around external optimization tools. No pixel work
//! happens in-process: every strategy shells out to a specialized tool
//! (jpegtran, optipng, pngquant, gifsicle) and reports a byte-size summary.
//!
//! ## Strategy contract
//! - `size_before` is recorded from the source file before the tool runs
//! - exactly one external command performs the lossless pass
//! - PNG additionally runs a lossy quantizer when a lossy path is requested
//! - `size_after` is read from the destination after the tool exits
//! - tool failures propagate as typed errors; partial outputs are cleaned
//!   up by the pipeline, not by the strategy
//!
//! Every invocation is bounded by the configured timeout and the child is
//! killed when the request is dropped mid-flight.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::UploadError;

mod gif;
mod jpeg;
mod png;

pub use gif::GifOptimizer;
pub use jpeg::JpegOptimizer;
pub use png::PngOptimizer;

/// Byte-size outcome of one optimization run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptimizationSummary {
    /// Size in bytes before optimization
    pub size_before: u64,
    /// Size in bytes after the lossless pass
    pub size_after: u64,
    /// Size in bytes of the lossy rendition, 0 when none was produced
    pub size_lossy: u64,
}

/// A per-format optimization strategy
#[async_trait]
pub trait Optimizer: Send + Sync {
    /// Short format name, like "jpeg" or "png"
    fn name(&self) -> &'static str;

    /// MIME type this strategy handles
    fn mime_type(&self) -> &'static str;

    /// Whether the format supports an additional lossy rendition
    fn supports_lossy(&self) -> bool {
        false
    }

    /// Whether [`Optimizer::optimize_data`] is implemented for this format
    fn supports_data(&self) -> bool {
        false
    }

    /// Optimize `src` into `dst`, writing a lossy rendition to `lossy` when
    /// given and supported
    async fn optimize_file(
        &self,
        src: &Path,
        dst: &Path,
        lossy: Option<&Path>,
    ) -> Result<OptimizationSummary, UploadError>;

    /// Optimize a byte buffer entirely in memory
    async fn optimize_data(
        &self,
        src: &[u8],
    ) -> Result<(Vec<u8>, OptimizationSummary), UploadError> {
        let _ = src;
        Err(UploadError::InMemoryUnsupported(self.name()))
    }
}

/// Size in bytes of a file as reported by the filesystem
pub(crate) async fn file_size(path: &Path) -> Result<u64, UploadError> {
    Ok(tokio::fs::metadata(path).await?.len())
}

/// Run an external tool to completion under the given timeout.
///
/// stdout/stderr are captured, never forwarded to the client; stderr is
/// logged on failure. The child is killed if the future is dropped.
pub(crate) async fn run_tool(
    tool: &'static str,
    args: &[String],
    timeout: Duration,
) -> Result<(), UploadError> {
    debug!("Running {} {:?}", tool, args);
    let start = std::time::Instant::now();

    let child = Command::new(tool)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => UploadError::MissingTool(tool),
            _ => UploadError::Io(e),
        })?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result?,
        Err(_) => {
            warn!("{} timed out after {:?}", tool, timeout);
            return Err(UploadError::ToolTimeout {
                tool,
                seconds: timeout.as_secs(),
            });
        }
    };

    if output.status.success() {
        debug!("{} completed in {:?}", tool, start.elapsed());
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!("{} failed with {}: {}", tool, output.status, stderr.trim());
        Err(UploadError::ToolFailed {
            tool,
            status: output.status.to_string(),
        })
    }
}

/// Check whether a command is available on the system
async fn is_command_available(tool: &str) -> bool {
    let which = if cfg!(windows) { "where" } else { "which" };
    Command::new(which)
        .arg(tool)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Log an availability report for every external tool the strategies use.
///
/// Missing tools only fail the requests that need them, so this is warn-only.
pub async fn report_available_tools() {
    info!("🔧 Checking external optimization tools:");

    let tools = [
        ("jpegtran", "JPEG lossless recompression"),
        ("optipng", "PNG lossless optimization"),
        ("pngquant", "PNG lossy quantization"),
        ("gifsicle", "GIF lossless optimization"),
    ];

    for (tool, role) in &tools {
        let status = if is_command_available(tool).await {
            "✅"
        } else {
            "❌"
        };
        info!("  {} {} - {}", status, tool, role);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;

    #[tokio::test]
    async fn test_run_tool_success() {
        let args = args!["-c", "exit 0"];
        run_tool("sh", &args, Duration::from_secs(5)).await.unwrap();
    }

    #[tokio::test]
    async fn test_run_tool_failure() {
        let args = args!["-c", "echo boom >&2; exit 1"];
        let err = run_tool("sh", &args, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::ToolFailed { tool: "sh", .. }));
    }

    #[tokio::test]
    async fn test_run_tool_timeout() {
        let args = args!["-c", "sleep 5"];
        let err = run_tool("sh", &args, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::ToolTimeout { tool: "sh", .. }));
    }

    #[tokio::test]
    async fn test_run_tool_missing() {
        let args = args!["--version"];
        let err = run_tool("definitely-not-a-real-optimizer", &args, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::MissingTool(_)));
    }
}
