//! Error types for the IQM adapter.

use iqmtk_hal::HalError;
use thiserror::Error;

/// Result type for IQM operations.
pub type IqmResult<T> = Result<T, IqmError>;

/// No API token was given, stored or found in a tokens file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("No IQM access credentials provided or found in config file.")]
pub struct IqmAuthenticationError;

/// The device reports a feature this backend cannot drive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("IQM device not supported: {0}")]
pub struct IqmDeviceUnsupportedError(pub String);

/// Errors that can occur when interacting with IQM.
#[derive(Debug, Error)]
pub enum IqmError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Config or tokens file could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No credentials available.
    #[error(transparent)]
    MissingCredentials(#[from] IqmAuthenticationError),

    /// The server rejected the credentials.
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// Unsupported device.
    #[error(transparent)]
    DeviceUnsupported(#[from] IqmDeviceUnsupportedError),

    /// A user-supplied coupling list does not fit the device.
    #[error("Invalid architecture: {0}")]
    InvalidArchitecture(String),

    /// Configuration problem.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Job not found.
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// Circuit cannot be expressed as IQM instructions.
    #[error("Translation error: {0}")]
    Translation(String),

    /// The server returned data this client cannot interpret.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// API error response.
    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },
}

impl From<IqmError> for HalError {
    fn from(e: IqmError) -> Self {
        match e {
            IqmError::Http(e) => HalError::Network(e),
            IqmError::Json(e) => HalError::Serialization(e),
            IqmError::MissingCredentials(e) => HalError::AuthenticationFailed(e.to_string()),
            IqmError::AuthFailed(msg) => HalError::AuthenticationFailed(msg),
            IqmError::DeviceUnsupported(e) => HalError::DeviceUnsupported(e.0),
            IqmError::JobNotFound(id) => HalError::JobNotFound(id),
            IqmError::Translation(msg) => HalError::InvalidCircuit(msg),
            IqmError::InvalidArchitecture(_) | IqmError::Config(_) | IqmError::Io(_) => {
                HalError::Configuration(e.to_string())
            }
            IqmError::UnexpectedResponse(_) | IqmError::ApiError { .. } => {
                HalError::Backend(e.to_string())
            }
        }
    }
}
