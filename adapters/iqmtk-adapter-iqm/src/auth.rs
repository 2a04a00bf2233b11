//! Credential resolution.
//!
//! A token is taken from the first of these that provides one:
//!
//! 1. the explicit `api_token` argument,
//! 2. the stored [`IqmConfig`],
//! 3. the tokens file named by `IQM_TOKENS_FILE`.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::config::IqmConfig;
use crate::error::{IqmAuthenticationError, IqmError, IqmResult};

/// Environment variable naming a tokens file written by an external
/// token manager.
pub const TOKENS_FILE_ENV: &str = "IQM_TOKENS_FILE";

/// Where a token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Passed by the caller.
    Argument,
    /// Stored in the config file.
    Config,
    /// Read from the tokens file.
    TokensFile,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Argument => write!(f, "argument"),
            CredentialSource::Config => write!(f, "config file"),
            CredentialSource::TokensFile => write!(f, "tokens file"),
        }
    }
}

/// A resolved API token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Bearer token.
    pub token: String,
    /// Where it was found.
    pub source: CredentialSource,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"[REDACTED]")
            .field("source", &self.source)
            .finish()
    }
}

#[derive(Deserialize)]
struct TokensFile {
    access_token: String,
}

/// Resolve credentials, reading `IQM_TOKENS_FILE` from the environment.
pub fn resolve_credentials(api_token: Option<&str>, config: &IqmConfig) -> IqmResult<Credentials> {
    let tokens_file = std::env::var_os(TOKENS_FILE_ENV)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from);
    resolve_credentials_with(api_token, config, tokens_file.as_deref())
}

/// Resolve credentials with an explicit tokens file location.
pub fn resolve_credentials_with(
    api_token: Option<&str>,
    config: &IqmConfig,
    tokens_file: Option<&Path>,
) -> IqmResult<Credentials> {
    let non_empty = |t: &&str| !t.trim().is_empty();

    let (token, source) = if let Some(token) = api_token.filter(non_empty) {
        (token.to_string(), CredentialSource::Argument)
    } else if let Some(token) = config.api_token.as_deref().filter(non_empty) {
        (token.to_string(), CredentialSource::Config)
    } else if let Some(path) = tokens_file {
        (read_tokens_file(path)?, CredentialSource::TokensFile)
    } else {
        return Err(IqmAuthenticationError.into());
    };

    debug!("Using IQM credentials from {}", source);
    Ok(Credentials { token, source })
}

fn read_tokens_file(path: &Path) -> IqmResult<String> {
    let text = fs::read_to_string(path).map_err(|e| {
        IqmError::Config(format!("Cannot read tokens file {}: {e}", path.display()))
    })?;
    let tokens: TokensFile = serde_json::from_str(&text)?;
    if tokens.access_token.trim().is_empty() {
        return Err(IqmAuthenticationError.into());
    }
    Ok(tokens.access_token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(token: Option<&str>) -> IqmConfig {
        IqmConfig {
            api_token: token.map(String::from),
        }
    }

    fn tokens_file(dir: &tempfile::TempDir, token: &str) -> PathBuf {
        let path = dir.path().join("tokens.json");
        fs::write(
            &path,
            format!(r#"{{"pid": 42, "timestamp": "2024-01-01T00:00:00", "access_token": "{token}", "refresh_token": "r"}}"#),
        )
        .unwrap();
        path
    }

    #[test]
    fn test_argument_wins() {
        let dir = tempfile::tempdir().unwrap();
        let file = tokens_file(&dir, "from-file");
        let creds =
            resolve_credentials_with(Some("arg"), &config(Some("stored")), Some(&file)).unwrap();
        assert_eq!(creds.token, "arg");
        assert_eq!(creds.source, CredentialSource::Argument);
    }

    #[test]
    fn test_config_before_tokens_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = tokens_file(&dir, "from-file");
        let creds = resolve_credentials_with(None, &config(Some("stored")), Some(&file)).unwrap();
        assert_eq!(creds.token, "stored");
        assert_eq!(creds.source, CredentialSource::Config);
    }

    #[test]
    fn test_tokens_file_last() {
        let dir = tempfile::tempdir().unwrap();
        let file = tokens_file(&dir, "from-file");
        let creds = resolve_credentials_with(Some(""), &config(None), Some(&file)).unwrap();
        assert_eq!(creds.token, "from-file");
        assert_eq!(creds.source, CredentialSource::TokensFile);
    }

    #[test]
    fn test_nothing_found() {
        let err = resolve_credentials_with(None, &config(None), None).unwrap_err();
        assert!(matches!(err, IqmError::MissingCredentials(_)));
        assert_eq!(
            err.to_string(),
            "No IQM access credentials provided or found in config file."
        );
    }

    #[test]
    fn test_unreadable_tokens_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_credentials_with(None, &config(None), Some(&dir.path().join("missing")))
            .unwrap_err();
        assert!(matches!(err, IqmError::Config(_)));
    }

    #[test]
    fn test_debug_redacts_token() {
        let creds = resolve_credentials_with(Some("secret"), &config(None), None).unwrap();
        assert!(!format!("{creds:?}").contains("secret"));
    }
}
