//! Engine configuration
//!
//! Resolution order for every setting: environment variable, then the
//! shared TOML config file, then the built-in default.

use std::path::PathBuf;

use atelier_common::config::{resolve_data_dir, resolve_optional, TomlConfig};
use atelier_common::{Error, Result};

/// Default HTTP bind address
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5720";

/// Resolved engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Root data directory (primary store and branch files live here)
    pub data_dir: PathBuf,

    /// HTTP bind address
    pub bind_addr: String,

    /// Gemini API key (required)
    pub gemini_api_key: String,

    /// Generation model override
    pub gemini_model: Option<String>,

    /// Branch CLI command name or path; absent disables branching
    pub branch_cli: Option<String>,

    /// Parent service identifier passed to the branch CLI
    pub branch_service_id: Option<String>,
}

impl EngineConfig {
    /// Resolve the full configuration from the environment and the TOML file.
    pub fn resolve(toml: &TomlConfig) -> Result<Self> {
        let gemini_api_key =
            resolve_optional("ATELIER_GEMINI_API_KEY", toml.gemini_api_key.as_ref())
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| {
                    Error::Config(
                        "Gemini API key not configured; set ATELIER_GEMINI_API_KEY or \
                         gemini_api_key in the config file"
                            .to_string(),
                    )
                })?;

        Ok(Self {
            data_dir: resolve_data_dir(toml),
            bind_addr: resolve_optional("ATELIER_BIND_ADDR", toml.bind_addr.as_ref())
                .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            gemini_api_key,
            gemini_model: resolve_optional("ATELIER_GEMINI_MODEL", toml.gemini_model.as_ref()),
            branch_cli: resolve_optional("ATELIER_BRANCH_CLI", toml.branch_cli.as_ref()),
            branch_service_id: resolve_optional(
                "ATELIER_BRANCH_SERVICE_ID",
                toml.branch_service_id.as_ref(),
            ),
        })
    }
}
