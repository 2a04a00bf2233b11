//! iqmtk adapter for IQM quantum computers.
//!
//! This crate provides a backend implementation for running circuits on
//! IQM devices through the IQM Server REST API, as hosted by IQM Resonance.
//!
//! # Example
//!
//! ```ignore
//! use iqmtk_adapter_iqm::{IqmBackend, IqmBackendOptions, ProcessOptions};
//! use iqmtk_hal::Backend;
//! use iqmtk_ir::Circuit;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Token from the argument, the config file or IQM_TOKENS_FILE
//!     let backend = IqmBackend::new("garnet", IqmBackendOptions::new()).await?;
//!
//!     let circuit = backend.get_compiled_circuit(&Circuit::bell()?, 2)?;
//!     let result = backend.run_circuit(&circuit, 1000, ProcessOptions::new()).await?;
//!     println!("Counts: {:?}", result.get_counts());
//!     Ok(())
//! }
//! ```
//!
//! Tokens can be stored once with [`set_iqm_config`].

pub mod api;
pub mod auth;
mod backend;
pub mod config;
mod error;
pub mod translate;

pub use api::Metadata;
pub use backend::{BACKEND_NAME, DEFAULT_URL_BASE, IqmBackend, IqmBackendOptions};
pub use config::{IqmConfig, set_iqm_config, set_iqm_config_at};
pub use error::{IqmAuthenticationError, IqmDeviceUnsupportedError, IqmError, IqmResult};

// Re-export common types
pub use iqmtk_hal::{Backend, ProcessOptions, Shots};
