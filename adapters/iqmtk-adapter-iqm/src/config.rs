//! Stored IQM configuration.
//!
//! The config file is a JSON document shared by all iqmtk extensions:
//!
//! ```json
//! { "extensions": { "iqm": { "api_token": "..." } } }
//! ```
//!
//! Updating the IQM record leaves every other key in the file untouched.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{IqmError, IqmResult};

/// Environment variable overriding the config file location.
pub const CONFIG_FILE_ENV: &str = "IQMTK_CONFIG_FILE";

/// Key of the IQM record under `extensions`.
pub const EXTENSION_KEY: &str = "iqm";

/// Path of the config file: `$IQMTK_CONFIG_FILE`, or
/// `<config dir>/iqmtk/config.json`.
pub fn default_config_path() -> IqmResult<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_FILE_ENV).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    dirs::config_dir()
        .map(|dir| dir.join("iqmtk").join("config.json"))
        .ok_or_else(|| IqmError::Config("Cannot determine the user config directory".into()))
}

/// Config parameters for the IQM backend.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IqmConfig {
    /// IQM API token.
    #[serde(default)]
    pub api_token: Option<String>,
}

impl fmt::Debug for IqmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IqmConfig")
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl IqmConfig {
    /// Load from the default config file.
    pub fn from_default_config_file() -> IqmResult<Self> {
        Self::from_file(default_config_path()?)
    }

    /// Load from `path`. A missing file or missing record yields the
    /// default config.
    pub fn from_file(path: impl AsRef<Path>) -> IqmResult<Self> {
        let root = read_root(path.as_ref())?;
        let record = root
            .get("extensions")
            .and_then(|ext| ext.get(EXTENSION_KEY))
            .cloned()
            .unwrap_or(Value::Null);
        if record.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(record)?)
    }

    /// Write to the default config file.
    pub fn update_default_config_file(&self) -> IqmResult<()> {
        self.update_file(default_config_path()?)
    }

    /// Write the IQM record into `path`, creating the file and its parent
    /// directories as needed.
    pub fn update_file(&self, path: impl AsRef<Path>) -> IqmResult<()> {
        let path = path.as_ref();
        let mut root = read_root(path)?;

        let extensions = root
            .entry("extensions")
            .or_insert_with(|| Value::Object(Map::new()));
        let Value::Object(extensions) = extensions else {
            return Err(IqmError::Config(format!(
                "'extensions' in {} is not an object",
                path.display()
            )));
        };
        let record = extensions
            .entry(EXTENSION_KEY)
            .or_insert_with(|| Value::Object(Map::new()));
        if !record.is_object() {
            *record = Value::Object(Map::new());
        }
        if let Value::Object(record) = record {
            record.insert(
                "api_token".into(),
                self.api_token.clone().map_or(Value::Null, Value::String),
            );
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(&Value::Object(root))?)?;
        restrict_permissions(path)?;
        debug!("Updated IQM config in {}", path.display());
        Ok(())
    }
}

/// Set the stored IQM API token in the default config file.
///
/// With `None` the file is rewritten with its current token.
pub fn set_iqm_config(api_token: Option<&str>) -> IqmResult<()> {
    set_iqm_config_at(default_config_path()?, api_token)
}

/// Set the stored IQM API token in the config file at `path`.
pub fn set_iqm_config_at(path: impl AsRef<Path>, api_token: Option<&str>) -> IqmResult<()> {
    let path = path.as_ref();
    let mut config = IqmConfig::from_file(path)?;
    if let Some(token) = api_token {
        config.api_token = Some(token.to_string());
    }
    config.update_file(path)
}

fn read_root(path: &Path) -> IqmResult<Map<String, Value>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
        Err(e) => return Err(e.into()),
    };
    if text.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str(&text)? {
        Value::Object(root) => Ok(root),
        _ => Err(IqmError::Config(format!(
            "{} does not contain a JSON object",
            path.display()
        ))),
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> IqmResult<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> IqmResult<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = IqmConfig::from_file(dir.path().join("none.json")).unwrap();
        assert_eq!(config, IqmConfig::default());
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = IqmConfig {
            api_token: Some("secret".into()),
        };
        config.update_file(&path).unwrap();
        assert_eq!(IqmConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_update_preserves_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"theme": "dark", "extensions": {"other": {"k": 1}, "iqm": {"extra": true}}}"#,
        )
        .unwrap();

        set_iqm_config_at(&path, Some("tok")).unwrap();

        let root: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(root["theme"], "dark");
        assert_eq!(root["extensions"]["other"]["k"], 1);
        assert_eq!(root["extensions"]["iqm"]["extra"], true);
        assert_eq!(root["extensions"]["iqm"]["api_token"], "tok");
    }

    #[test]
    fn test_set_without_token_keeps_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        set_iqm_config_at(&path, Some("first")).unwrap();
        set_iqm_config_at(&path, None).unwrap();
        assert_eq!(
            IqmConfig::from_file(&path).unwrap().api_token.as_deref(),
            Some("first")
        );
    }

    #[test]
    fn test_non_object_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "[1, 2]").unwrap();
        assert!(matches!(IqmConfig::from_file(&path), Err(IqmError::Config(_))));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = IqmConfig {
            api_token: Some("secret".into()),
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("REDACTED"));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_private() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        set_iqm_config_at(&path, Some("tok")).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
