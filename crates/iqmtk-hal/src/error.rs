//! Error types for the HAL crate.

use iqmtk_compile::CompileError;
use iqmtk_ir::IrError;
use thiserror::Error;

/// Errors that can occur in HAL operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HalError {
    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The selected device cannot be driven by this backend.
    #[error("Device not supported: {0}")]
    DeviceUnsupported(String),

    /// Job execution failed.
    #[error("Job failed: {0}")]
    JobFailed(String),

    /// Job was cancelled.
    #[error("Job cancelled")]
    JobCancelled,

    /// Job not found.
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// Circuit does not satisfy the backend's requirements.
    #[error("Invalid circuit: {0}")]
    InvalidCircuit(String),

    /// Compilation failed.
    #[error("Compilation failed: {0}")]
    Compile(#[from] CompileError),

    /// Circuit construction failed.
    #[error("Circuit error: {0}")]
    Ir(#[from] IrError),

    /// Network error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Timeout waiting for job.
    #[error("Timeout waiting for job {0}")]
    Timeout(String),

    /// Invalid number of shots.
    #[error("Invalid shots: {0}")]
    InvalidShots(String),

    /// Malformed result handle.
    #[error("Invalid result handle: {0}")]
    InvalidHandle(String),

    /// Generic backend error.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type for HAL operations.
pub type HalResult<T> = Result<T, HalError>;
