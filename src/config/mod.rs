//! Configuration for the authentication bridge.
//!
//! The bridge is configured via a TOML file, with support for environment
//! variable interpolation using `${VAR_NAME}` syntax.
//!
//! # Example
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [sso]
//! url = "https://sso.example.edu/cas"
//! service = "https://app.example.edu/auth/login"
//! ```

mod host;
mod observability;
mod server;
mod sso;

use std::path::Path;

pub use host::*;
pub use observability::*;
use serde::{Deserialize, Serialize};
pub use server::*;
pub use sso::*;

/// Root configuration for the authentication bridge.
///
/// All sections except `[sso]` and `[host]` have workable defaults; those
/// two carry required settings and are checked at load time.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// The SSO service the bridge authenticates against.
    #[serde(default)]
    pub sso: CasConfig,

    /// The host application whose native flow is the fallback.
    #[serde(default)]
    pub host: HostConfig,

    /// Observability configuration (logging).
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl BridgeConfig {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables in the format `${VAR_NAME}` are expanded.
    /// Missing required variables cause an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e, path.as_ref().to_path_buf()))?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;

        let config: BridgeConfig = toml::from_str(&expanded).map_err(ConfigError::Parse)?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration for consistency and completeness.
    ///
    /// Required-setting violations are fatal here, at initialization: the
    /// bridge refuses to start half-configured rather than failing at
    /// request time.
    fn validate(&self) -> Result<(), ConfigError> {
        self.sso.validate()?;
        self.host.validate()?;

        if self.sso.lookup_user_in_host
            && self.host.lookup_url.as_deref().unwrap_or("").is_empty()
        {
            return Err(ConfigError::Validation(
                "sso.lookup_user_in_host is enabled but host.lookup_url is not set".into(),
            ));
        }

        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

/// Expand environment variables in the format `${VAR_NAME}`.
///
/// Variables inside comments are left untouched.
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = regex::Regex::new(r"\$\{([^}]+)\}").unwrap();
    let mut result = String::with_capacity(input.len());

    for line in input.lines() {
        // Find if there's a comment on this line
        let comment_pos = line.find('#');

        // Process the line, only expanding variables that appear before any comment
        let mut line_result = String::with_capacity(line.len());
        let mut last_end = 0;

        for cap in re.captures_iter(line) {
            let match_start = cap.get(0).unwrap().start();

            // Skip if this variable is inside a comment
            if let Some(pos) = comment_pos {
                if match_start >= pos {
                    continue;
                }
            }

            // Add text before this match
            line_result.push_str(&line[last_end..match_start]);

            // Expand the variable
            let var_name = &cap[1];
            let value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
            line_result.push_str(&value);

            last_end = cap.get(0).unwrap().end();
        }

        // Add remaining text after last match
        line_result.push_str(&line[last_end..]);
        result.push_str(&line_result);
        result.push('\n');
    }

    // Remove trailing newline if input didn't have one
    if !input.ends_with('\n') {
        result.pop();
    }

    Ok(result)
}
