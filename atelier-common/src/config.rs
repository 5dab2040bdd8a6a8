//! Configuration loading and data directory resolution
//!
//! Settings are resolved with ENV → TOML → compiled-default priority.
//! The TOML file lives at `~/.config/atelier/atelier.toml` (or the
//! platform equivalent) and every key in it is optional.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Optional settings from the Atelier TOML config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Directory holding the primary database and branch databases
    pub data_dir: Option<String>,
    /// HTTP bind address, e.g. "127.0.0.1:5740"
    pub bind_addr: Option<String>,
    /// Generation provider API key
    pub gemini_api_key: Option<String>,
    /// Generation model override
    pub gemini_model: Option<String>,
    /// Path to the branch backend CLI tool
    pub branch_cli: Option<String>,
    /// Parent service identifier passed to the branch backend
    pub branch_service_id: Option<String>,
}

impl TomlConfig {
    /// Load the config file if present; a missing file yields defaults
    pub fn load() -> Result<Self> {
        match config_file_path() {
            Some(path) if path.exists() => Self::load_file(&path),
            _ => {
                tracing::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Parse one TOML config file
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            tracing::warn!("Config file {} is not valid TOML: {}", path.display(), e);
            Error::Config(format!("Parse {} failed: {}", path.display(), e))
        })
    }
}

/// Platform config file path: `<config dir>/atelier/atelier.toml`
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("atelier").join("atelier.toml"))
}

/// Resolve the data directory with ENV → TOML → OS-default priority
pub fn resolve_data_dir(toml_config: &TomlConfig) -> PathBuf {
    if let Ok(path) = std::env::var("ATELIER_DATA_DIR") {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.data_dir {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    default_data_dir()
}

/// OS-dependent default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("atelier"))
        .unwrap_or_else(|| PathBuf::from("./atelier_data"))
}

/// Resolve an optional string setting with ENV → TOML priority
pub fn resolve_optional(env_var: &str, toml_value: Option<&String>) -> Option<String> {
    if let Ok(value) = std::env::var(env_var) {
        if !value.trim().is_empty() {
            return Some(value);
        }
    }
    toml_value
        .filter(|v| !v.trim().is_empty())
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_toml_for_optional_settings() {
        std::env::set_var("ATELIER_TEST_SETTING", "from-env");
        let toml_value = Some("from-toml".to_string());
        let resolved = resolve_optional("ATELIER_TEST_SETTING", toml_value.as_ref());
        assert_eq!(resolved.as_deref(), Some("from-env"));
        std::env::remove_var("ATELIER_TEST_SETTING");
    }

    #[test]
    fn blank_env_falls_through_to_toml() {
        std::env::set_var("ATELIER_TEST_BLANK", "   ");
        let toml_value = Some("from-toml".to_string());
        let resolved = resolve_optional("ATELIER_TEST_BLANK", toml_value.as_ref());
        assert_eq!(resolved.as_deref(), Some("from-toml"));
        std::env::remove_var("ATELIER_TEST_BLANK");
    }

    #[test]
    fn missing_everything_yields_none() {
        assert_eq!(resolve_optional("ATELIER_TEST_UNSET", None), None);
    }

    #[test]
    fn valid_config_file_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("atelier.toml");
        std::fs::write(&path, "bind_addr = \"0.0.0.0:9000\"\n").unwrap();

        let config = TomlConfig::load_file(&path).unwrap();
        assert_eq!(config.bind_addr.as_deref(), Some("0.0.0.0:9000"));
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn malformed_config_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("atelier.toml");
        std::fs::write(&path, "bind_addr = [not toml").unwrap();

        let err = TomlConfig::load_file(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn data_dir_uses_toml_when_env_unset() {
        std::env::remove_var("ATELIER_DATA_DIR");
        let config = TomlConfig {
            data_dir: Some("/tmp/atelier-test".to_string()),
            ..Default::default()
        };
        assert_eq!(resolve_data_dir(&config), PathBuf::from("/tmp/atelier-test"));
    }
}
