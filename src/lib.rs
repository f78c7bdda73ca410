//! # Pressroom Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tassonomia degli errori e mapping verso risposte HTTP
//! - `mime`: Sniffing del tipo media dai primi 512 byte
//! - `registry`: Mappa MIME type -> strategia di ottimizzazione
//! - `optimizers`: Adapter per tool esterni (jpegtran, optipng, pngquant, gifsicle)
//! - `policy`: Politica di confronto dimensioni prima/dopo
//! - `pipeline`: Orchestratore upload (staging, dispatch, publish, cleanup)
//! - `response`: Envelope JSON di successo/errore
//! - `server`: Router axum, handler upload, file statici
//!
//! ## Utilizzo:
//! ```rust,no_run
//! use std::sync::Arc;
//! use pressroom::{Config, OptimizerRegistry, UploadPipeline};
//!
//! let config = Arc::new(Config::default());
//! let registry = Arc::new(OptimizerRegistry::with_default_optimizers(&config));
//! let pipeline = UploadPipeline::new(config, registry);
//! ```

pub mod config;
pub mod error;
pub mod mime;
pub mod optimizers;
pub mod pipeline;
pub mod policy;
pub mod registry;
pub mod response;
pub mod server;
pub mod utils;

pub use config::Config;
pub use error::UploadError;
pub use optimizers::{OptimizationSummary, Optimizer};
pub use pipeline::UploadPipeline;
pub use policy::ComparisonPolicy;
pub use registry::OptimizerRegistry;
pub use response::{FileRef, ResponseEnvelope, UploadReport};
