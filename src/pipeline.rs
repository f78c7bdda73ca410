//! # Upload Pipeline Module
//!
//! Orchestratore del ciclo di vita di un upload.
//!
//! ## Stati:
//! `Received -> Staged -> TypeDetected -> Optimized -> Compared ->
//! {Published | Rejected-NotBetter | Rejected-Error}`
//!
//! ## Responsabilità:
//! - Staging del body su file temporaneo con nome casuale per-request
//! - Sniffing del MIME type e controllo allow-list
//! - Dispatch verso la strategia registrata per il formato
//! - Applicazione della politica di confronto dimensioni
//! - Publish con nomi content-addressed (SHA-1) in directory casuali
//! - Cleanup garantito dei file temporanei su ogni percorso di uscita
//!
//! Ogni path temporaneo è posseduto da una [`TempGuard`]: il suo `Drop`
//! rimuove best-effort tutto ciò che non è stato esplicitamente pubblicato,
//! quindi anche un early return o un panic non lasciano file orfani.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use sha1::{Digest, Sha1};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::UploadError;
use crate::mime;
use crate::policy::{ComparisonPolicy, SavingsDelta};
use crate::registry::OptimizerRegistry;
use crate::response::{FileRef, UploadReport};

/// Scoped owner of a request's temp files.
///
/// Paths handed out by [`TempGuard::stage`] are deleted on drop unless
/// disarmed after a successful rename into the publish directory. Cleanup
/// is best-effort and never fails the request.
pub struct TempGuard {
    paths: Vec<PathBuf>,
}

impl TempGuard {
    pub fn new() -> Self {
        Self { paths: Vec::new() }
    }

    /// Reserve a fresh random path under the staging directory
    pub fn stage(&mut self, temp_dir: &Path) -> PathBuf {
        let path = temp_dir.join(Uuid::new_v4().to_string());
        self.paths.push(path.clone());
        path
    }

    /// Stop tracking a path that was renamed into its permanent location
    pub fn disarm(&mut self, path: &Path) {
        self.paths.retain(|tracked| tracked != path);
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.paths.len()
    }
}

impl Default for TempGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TempGuard {
    fn drop(&mut self) {
        for path in &self.paths {
            // A strategy may have failed before creating its output
            match std::fs::remove_file(path) {
                Ok(()) => debug!("Removed temp file: {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove temp file {}: {}", path.display(), e),
            }
        }
    }
}

/// Orchestrates staging, dispatch, comparison and publishing for one upload
pub struct UploadPipeline {
    config: Arc<Config>,
    registry: Arc<OptimizerRegistry>,
    policy: ComparisonPolicy,
}

impl UploadPipeline {
    pub fn new(config: Arc<Config>, registry: Arc<OptimizerRegistry>) -> Self {
        let policy = ComparisonPolicy::new(config.min_improvement_percent);
        Self {
            config,
            registry,
            policy,
        }
    }

    /// Run the full pipeline on an upload body.
    ///
    /// Returns the published report, or a typed error after removing every
    /// temp file created along the way.
    pub async fn process<S>(&self, body: S) -> Result<UploadReport, UploadError>
    where
        S: Stream<Item = Result<Bytes, UploadError>> + Unpin,
    {
        let mut temps = TempGuard::new();

        // Received -> Staged
        let staged = self.stage(&mut temps, body).await?;

        // Staged -> TypeDetected
        let mime_type = mime::detect_file(&staged).await?;
        if !mime::is_allowed(&mime_type) {
            return Err(UploadError::UnsupportedFormat(mime_type));
        }

        // TypeDetected -> Optimized
        let optimizer = self
            .registry
            .resolve(&mime_type)
            .cloned()
            .ok_or_else(|| UploadError::UnknownFormat(mime_type.clone()))?;

        let compressed = temps.stage(&self.config.temp_dir);
        let lossy = if optimizer.supports_lossy() {
            Some(temps.stage(&self.config.temp_dir))
        } else {
            None
        };

        let summary = optimizer
            .optimize_file(&staged, &compressed, lossy.as_deref())
            .await?;

        // Optimized -> Compared
        let decision = self.policy.assess(&summary);
        if !decision.should_publish() {
            info!(
                "No compression achieved for {} ({} -> {} bytes)",
                mime_type, summary.size_before, summary.size_after
            );
            return Err(UploadError::NoImprovement {
                size_before: summary.size_before,
                size_after: summary.size_after,
            });
        }

        // Compared -> Published
        let lossy_produced = decision.lossy.and_then(|delta| lossy.map(|path| (path, delta)));
        self.publish(
            &mut temps,
            &staged,
            &compressed,
            lossy_produced,
            &mime_type,
            summary.size_before,
            decision.compressed,
        )
        .await
    }

    /// Stream the body into a uniquely named staging file
    async fn stage<S>(&self, temps: &mut TempGuard, mut body: S) -> Result<PathBuf, UploadError>
    where
        S: Stream<Item = Result<Bytes, UploadError>> + Unpin,
    {
        let path = temps.stage(&self.config.temp_dir);
        let mut file = tokio::fs::File::create(&path).await?;

        while let Some(chunk) = body.try_next().await? {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        debug!("Staged upload at {}", path.display());
        Ok(path)
    }

    /// Move every artifact into a fresh publish directory under
    /// content-addressed names and shape the success report
    #[allow(clippy::too_many_arguments)]
    async fn publish(
        &self,
        temps: &mut TempGuard,
        staged: &Path,
        compressed: &Path,
        lossy: Option<(PathBuf, SavingsDelta)>,
        mime_type: &str,
        size_before: u64,
        compressed_delta: SavingsDelta,
    ) -> Result<UploadReport, UploadError> {
        let extension = mime::extension_for(mime_type)
            .ok_or_else(|| UploadError::UnknownFormat(mime_type.to_string()))?;

        let dir_id = Uuid::new_v4().to_string();
        let publish_dir = self.config.uploads_dir().join(&dir_id);
        tokio::fs::create_dir_all(&publish_dir).await?;

        let source = self
            .publish_file(
                temps,
                staged,
                &publish_dir,
                &dir_id,
                extension,
                SavingsDelta {
                    size: size_before,
                    size_diff: 0,
                    percent_diff: 0.0,
                    improved: false,
                },
            )
            .await?;

        let compressed = self
            .publish_file(temps, compressed, &publish_dir, &dir_id, extension, compressed_delta)
            .await?;

        let lossy = match lossy {
            Some((path, delta)) => Some(
                self.publish_file(temps, &path, &publish_dir, &dir_id, extension, delta)
                    .await?,
            ),
            None => None,
        };

        info!(
            "Published upload {}: {} -> {} bytes ({:.1}%)",
            dir_id, size_before, compressed.size, compressed.percent_diff
        );

        Ok(UploadReport {
            source,
            compressed,
            lossy,
            file_type: mime_type.to_string(),
        })
    }

    /// Rename one temp file to `<publish_dir>/<sha1>.<ext>` and build its ref
    async fn publish_file(
        &self,
        temps: &mut TempGuard,
        temp_path: &Path,
        publish_dir: &Path,
        dir_id: &str,
        extension: &str,
        delta: SavingsDelta,
    ) -> Result<FileRef, UploadError> {
        let digest = sha1_file(temp_path).await?;
        let file_name = format!("{}.{}", digest, extension);
        let destination = publish_dir.join(&file_name);

        tokio::fs::rename(temp_path, &destination).await?;
        temps.disarm(temp_path);

        Ok(FileRef {
            url: format!("/uploads/{}/{}", dir_id, file_name),
            size: delta.size,
            size_diff: delta.size_diff,
            percent_diff: delta.percent_diff,
        })
    }
}

/// SHA-1 checksum of a file's contents, hex-encoded
async fn sha1_file(path: &Path) -> Result<String, UploadError> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Sha1::new();
    let mut buffer = vec![0u8; 64 * 1024];

    loop {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizers::{file_size, OptimizationSummary, Optimizer};
    use async_trait::async_trait;
    use tempfile::TempDir;

    /// Strategy that writes fixed bytes instead of calling external tools
    struct FixedOutput {
        mime_type: &'static str,
        lossy_support: bool,
        output: Vec<u8>,
        lossy_output: Option<Vec<u8>>,
    }

    #[async_trait]
    impl Optimizer for FixedOutput {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn mime_type(&self) -> &'static str {
            self.mime_type
        }

        fn supports_lossy(&self) -> bool {
            self.lossy_support
        }

        async fn optimize_file(
            &self,
            src: &Path,
            dst: &Path,
            lossy: Option<&Path>,
        ) -> Result<OptimizationSummary, UploadError> {
            let mut summary = OptimizationSummary::default();
            summary.size_before = file_size(src).await?;

            tokio::fs::write(dst, &self.output).await?;
            summary.size_after = file_size(dst).await?;

            if let (Some(lossy), Some(bytes)) = (lossy, self.lossy_output.as_ref()) {
                tokio::fs::write(lossy, bytes).await?;
                summary.size_lossy = file_size(lossy).await?;
            }

            Ok(summary)
        }
    }

    fn jpeg_bytes(len: usize) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
        bytes.resize(len, 0x42);
        bytes
    }

    fn png_bytes(len: usize) -> Vec<u8> {
        let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        bytes.resize(len, 0x42);
        bytes
    }

    fn one_chunk(bytes: Vec<u8>) -> impl Stream<Item = Result<Bytes, UploadError>> + Unpin {
        futures::stream::iter(vec![Ok(Bytes::from(bytes))])
    }

    async fn test_env(registry: OptimizerRegistry) -> (TempDir, Arc<Config>, UploadPipeline) {
        let root = TempDir::new().unwrap();
        let config = Arc::new(Config {
            public_dir: root.path().join("public"),
            temp_dir: root.path().join("temp"),
            ..Default::default()
        });
        config.ensure_directories().await.unwrap();
        let pipeline = UploadPipeline::new(config.clone(), Arc::new(registry));
        (root, config, pipeline)
    }

    fn dir_entries(path: &Path) -> Vec<PathBuf> {
        match std::fs::read_dir(path) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }

    fn sha1_hex(bytes: &[u8]) -> String {
        let mut hasher = Sha1::new();
        hasher.update(bytes);
        hex::encode(hasher.finalize())
    }

    fn jpeg_registry(output: Vec<u8>) -> OptimizerRegistry {
        let mut registry = OptimizerRegistry::new();
        registry.register(Arc::new(FixedOutput {
            mime_type: mime::MIME_JPEG,
            lossy_support: false,
            output,
            lossy_output: None,
        }));
        registry
    }

    #[tokio::test]
    async fn test_successful_upload_publishes_report() {
        let optimized = jpeg_bytes(800);
        let (_root, config, pipeline) = test_env(jpeg_registry(optimized.clone())).await;

        let input = jpeg_bytes(1000);
        let report = pipeline.process(one_chunk(input.clone())).await.unwrap();

        assert_eq!(report.file_type, "image/jpeg");
        assert!(report.lossy.is_none());

        // Source slot carries the staged size, compressed slot the deltas
        assert_eq!(report.source.size, 1000);
        assert_eq!(report.compressed.size, 800);
        assert_eq!(report.compressed.size_diff, 200);
        assert!((report.compressed.percent_diff - 20.0).abs() < 1e-9);

        // Content-addressed names inside a single publish directory
        let expected_name = format!("{}.jpg", sha1_hex(&optimized));
        assert!(report.compressed.url.ends_with(&expected_name));
        assert!(report.source.url.starts_with("/uploads/"));

        // Published bytes round-trip exactly
        let published = config
            .public_dir
            .join(report.compressed.url.trim_start_matches('/'));
        assert_eq!(tokio::fs::read(&published).await.unwrap(), optimized);
        let published_source = config
            .public_dir
            .join(report.source.url.trim_start_matches('/'));
        assert_eq!(tokio::fs::read(&published_source).await.unwrap(), input);

        // Nothing left in staging
        assert!(dir_entries(&config.temp_dir).is_empty());
    }

    #[tokio::test]
    async fn test_staging_handles_chunked_bodies() {
        let (_root, _config, pipeline) = test_env(jpeg_registry(jpeg_bytes(100))).await;

        let input = jpeg_bytes(3000);
        let chunks: Vec<Result<Bytes, UploadError>> = input
            .chunks(1024)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        let report = pipeline
            .process(futures::stream::iter(chunks))
            .await
            .unwrap();

        assert_eq!(report.source.size, 3000);
    }

    #[tokio::test]
    async fn test_unsupported_format_is_rejected_and_cleaned() {
        let (_root, config, pipeline) = test_env(jpeg_registry(jpeg_bytes(100))).await;

        let err = pipeline
            .process(one_chunk(b"just some plain text".to_vec()))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::UnsupportedFormat(_)));
        assert!(dir_entries(&config.temp_dir).is_empty());
        assert!(dir_entries(&config.uploads_dir()).is_empty());
    }

    #[tokio::test]
    async fn test_unregistered_format_is_rejected_and_cleaned() {
        // Allow-listed MIME but nothing registered for it
        let (_root, config, pipeline) = test_env(jpeg_registry(jpeg_bytes(100))).await;

        let err = pipeline
            .process(one_chunk(png_bytes(500)))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::UnknownFormat(ref m) if m == "image/png"));
        assert!(dir_entries(&config.temp_dir).is_empty());
    }

    #[tokio::test]
    async fn test_no_improvement_is_rejected_and_cleaned() {
        // Optimizer returns the same number of bytes it was given
        let (_root, config, pipeline) = test_env(jpeg_registry(jpeg_bytes(1000))).await;

        let err = pipeline
            .process(one_chunk(jpeg_bytes(1000)))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            UploadError::NoImprovement {
                size_before: 1000,
                size_after: 1000,
            }
        ));
        assert!(dir_entries(&config.temp_dir).is_empty());
        assert!(dir_entries(&config.uploads_dir()).is_empty());
    }

    #[tokio::test]
    async fn test_lossy_rescues_flat_lossless_result() {
        let lossless = png_bytes(1000);
        let lossy = png_bytes(700);

        let mut registry = OptimizerRegistry::new();
        registry.register(Arc::new(FixedOutput {
            mime_type: mime::MIME_PNG,
            lossy_support: true,
            output: lossless.clone(),
            lossy_output: Some(lossy.clone()),
        }));
        let (_root, config, pipeline) = test_env(registry).await;

        let report = pipeline
            .process(one_chunk(png_bytes(1000)))
            .await
            .unwrap();

        // Lossless pass achieved nothing but is still reported
        assert_eq!(report.compressed.size_diff, 0);

        let lossy_ref = report.lossy.unwrap();
        assert_eq!(lossy_ref.size, 700);
        assert_eq!(lossy_ref.size_diff, 300);
        assert!((lossy_ref.percent_diff - 30.0).abs() < 1e-9);
        assert!(lossy_ref.url.ends_with(&format!("{}.png", sha1_hex(&lossy))));

        assert!(dir_entries(&config.temp_dir).is_empty());
    }

    #[tokio::test]
    async fn test_reupload_same_content_new_directory_same_name() {
        let (_root, _config, pipeline) = test_env(jpeg_registry(jpeg_bytes(500))).await;

        let input = jpeg_bytes(1000);
        let first = pipeline.process(one_chunk(input.clone())).await.unwrap();
        let second = pipeline.process(one_chunk(input)).await.unwrap();

        let name = |url: &str| url.rsplit('/').next().unwrap().to_string();
        let dir = |url: &str| url.rsplitn(2, '/').nth(1).unwrap().to_string();

        assert_eq!(name(&first.compressed.url), name(&second.compressed.url));
        assert_ne!(dir(&first.compressed.url), dir(&second.compressed.url));
    }

    #[tokio::test]
    async fn test_body_error_cleans_partial_staging() {
        let (_root, config, pipeline) = test_env(jpeg_registry(jpeg_bytes(100))).await;

        let chunks: Vec<Result<Bytes, UploadError>> = vec![
            Ok(Bytes::from(jpeg_bytes(512))),
            Err(UploadError::Multipart("connection reset".to_string())),
        ];
        let err = pipeline
            .process(futures::stream::iter(chunks))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::Multipart(_)));
        assert!(dir_entries(&config.temp_dir).is_empty());
    }

    #[tokio::test]
    async fn test_temp_guard_removes_staged_files_on_drop() {
        let root = TempDir::new().unwrap();

        let kept;
        {
            let mut guard = TempGuard::new();
            let removed = guard.stage(root.path());
            kept = guard.stage(root.path());
            tokio::fs::write(&removed, b"doomed").await.unwrap();
            tokio::fs::write(&kept, b"published").await.unwrap();

            guard.disarm(&kept);
            assert_eq!(guard.tracked(), 1);
        }

        assert!(kept.exists());
        assert_eq!(dir_entries(root.path()), vec![kept]);
    }
}
