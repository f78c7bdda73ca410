//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con tutti i parametri del servizio
//! - Fornisce validazione robusta dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default sensati per tutti i parametri
//!
//! ## Parametri di configurazione:
//! - `port`: Porta HTTP di ascolto (default: 8000)
//! - `public_dir`: Directory servita staticamente, contiene `uploads/` (default: ./public)
//! - `temp_dir`: Directory di staging per upload in corso (default: ./temp)
//! - `min_improvement_percent`: Riduzione minima per pubblicare (0-100, default: 1.0)
//! - `tool_timeout_secs`: Timeout per ogni invocazione di tool esterno (default: 60)
//! - `max_upload_bytes`: Dimensione massima accettata per upload (default: 50 MiB)
//! - `png_level`: Livello optipng `-oN` (0-7, default: 2)
//! - `gif_level`: Livello gifsicle `-ON` (1-3, default: 3)
//! - `pngquant_quality`: Range qualità pngquant, es. "65-90" (default: nessuno)
//!
//! ## Esempio:
//! ```rust
//! use pressroom::Config;
//!
//! let config = Config {
//!     port: 9000,
//!     min_improvement_percent: 2.0,
//!     ..Default::default()
//! };
//! config.validate().unwrap();
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the upload optimization service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP listen port
    pub port: u16,
    /// Directory served statically; published files land in `<public_dir>/uploads`
    pub public_dir: PathBuf,
    /// Staging directory for in-flight uploads
    pub temp_dir: PathBuf,
    /// Minimum size reduction (percent) required to publish an optimized file
    pub min_improvement_percent: f64,
    /// Timeout for each external tool invocation, in seconds
    pub tool_timeout_secs: u64,
    /// Maximum accepted request body size in bytes
    pub max_upload_bytes: usize,
    /// optipng optimization level (0-7)
    pub png_level: u8,
    /// gifsicle optimization level (1-3)
    pub gif_level: u8,
    /// pngquant quality range (e.g. "65-90"); omitted flag when None
    pub pngquant_quality: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            public_dir: PathBuf::from("./public"),
            temp_dir: PathBuf::from("./temp"),
            min_improvement_percent: 1.0,
            tool_timeout_secs: 60,
            max_upload_bytes: 50 * 1024 * 1024,
            png_level: 2,
            gif_level: 3,
            pngquant_quality: None,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.min_improvement_percent) {
            return Err(anyhow::anyhow!(
                "Minimum improvement percent must be between 0 and 100"
            ));
        }

        if self.tool_timeout_secs == 0 {
            return Err(anyhow::anyhow!("Tool timeout must be greater than 0"));
        }

        if self.max_upload_bytes == 0 {
            return Err(anyhow::anyhow!("Maximum upload size must be greater than 0"));
        }

        if self.png_level > 7 {
            return Err(anyhow::anyhow!("PNG optimization level must be between 0 and 7"));
        }

        if self.gif_level == 0 || self.gif_level > 3 {
            return Err(anyhow::anyhow!("GIF optimization level must be between 1 and 3"));
        }

        Ok(())
    }

    /// Timeout applied to every external tool invocation
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    /// Directory where published upload directories are created
    pub fn uploads_dir(&self) -> PathBuf {
        self.public_dir.join("uploads")
    }

    /// Create the staging and publish directories if missing
    pub async fn ensure_directories(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.temp_dir).await?;
        tokio::fs::create_dir_all(self.uploads_dir()).await?;
        Ok(())
    }

    /// Load configuration from file
    pub async fn from_file(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &PathBuf) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}
