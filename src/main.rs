//! # Pressroom - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Creazione di directory di staging e pubblicazione
//! - Registrazione delle strategie di ottimizzazione e avvio del server
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI (port, directory, soglia, timeout, etc.)
//! 2. Configura il logging (INFO o DEBUG a seconda del flag verbose)
//! 3. Valida la configurazione e crea le directory mancanti
//! 4. Registra gli optimizer di default e logga i tool esterni disponibili
//! 5. Avvia il server axum con graceful shutdown su Ctrl+C
//!
//! ## Esempio di utilizzo:
//! ```bash
//! pressroom --port 8000 --public-dir ./public --min-improvement 1.0 --verbose
//! ```

use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use pressroom::optimizers;
use pressroom::server::{self, AppState};
use pressroom::{Config, OptimizerRegistry, UploadPipeline};

#[derive(Parser)]
#[command(name = "pressroom")]
#[command(about = "Optimize uploaded images through external tools and publish the results")]
struct Args {
    /// HTTP listen port
    #[arg(short, long, default_value = "8000")]
    port: u16,

    /// Directory served statically; published files land in <public-dir>/uploads
    #[arg(long, default_value = "./public")]
    public_dir: PathBuf,

    /// Staging directory for in-flight uploads
    #[arg(long, default_value = "./temp")]
    temp_dir: PathBuf,

    /// Minimum size reduction (percent) required to publish an optimized file
    #[arg(short, long, default_value = "1.0")]
    min_improvement: f64,

    /// Timeout for each external tool invocation, in seconds
    #[arg(long, default_value = "60")]
    tool_timeout: u64,

    /// Maximum accepted upload size in bytes
    #[arg(long, default_value = "52428800")]
    max_upload_bytes: usize,

    /// pngquant quality range for the lossy PNG pass, e.g. 65-90
    #[arg(long)]
    pngquant_quality: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config {
        port: args.port,
        public_dir: args.public_dir,
        temp_dir: args.temp_dir,
        min_improvement_percent: args.min_improvement,
        tool_timeout_secs: args.tool_timeout,
        max_upload_bytes: args.max_upload_bytes,
        pngquant_quality: args.pngquant_quality,
        ..Default::default()
    };
    config.validate()?;
    config.ensure_directories().await?;

    let registry = OptimizerRegistry::with_default_optimizers(&config);
    optimizers::report_available_tools().await;

    let config = Arc::new(config);
    let pipeline = Arc::new(UploadPipeline::new(config.clone(), Arc::new(registry)));
    let app = server::router(AppState::new(pipeline), &config);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl+C handler: {}", e);
        return;
    }
    info!("Shutting down");
}
