//! Server settings.

use serde::{Deserialize, Serialize};

use crate::error::ServerError;

/// Address used when none is configured
pub const DEFAULT_LISTEN: &str = "127.0.0.1:7717";

/// Server settings, loadable from TOML
///
/// ```toml
/// listen = "0.0.0.0:7717"
/// default_principal = "anonymous"
/// allow_system = false
/// max_line_bytes = 1048576
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Socket address to bind
    pub listen: String,
    /// Principal for requests that do not name one
    pub default_principal: String,
    /// Whether requests may act as the built-in system principal
    pub allow_system: bool,
    /// Longest request line accepted, in bytes
    pub max_line_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
            default_principal: "anonymous".to_string(),
            allow_system: false,
            max_line_bytes: 1 << 20,
        }
    }
}

impl ServerConfig {
    /// Parse and validate TOML settings
    pub fn from_toml_str(text: &str) -> Result<Self, ServerError> {
        let config: ServerConfig =
            toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.listen.trim().is_empty() {
            return Err(ServerError::Config("`listen` must not be empty".into()));
        }
        if self.default_principal.trim().is_empty() {
            return Err(ServerError::Config(
                "`default_principal` must not be empty".into(),
            ));
        }
        if self.max_line_bytes == 0 {
            return Err(ServerError::Config("`max_line_bytes` must be positive".into()));
        }
        Ok(())
    }

    /// Builder-style override of the listen address
    pub fn with_listen(mut self, listen: impl Into<String>) -> Self {
        self.listen = listen.into();
        self
    }
}
