use serde::{Deserialize, Serialize};

/// Observability configuration (logging).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ObservabilityConfig {
    /// Console logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Console logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log filter used when `RUST_LOG` is not set
    /// (e.g. `"info"`, `"portcullis=debug"`).
    #[serde(default = "default_level")]
    pub level: String,

    /// Console output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Whether to include timestamps. Disable when a collector (systemd,
    /// docker) stamps lines itself.
    #[serde(default = "default_true")]
    pub timestamps: bool,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            timestamps: true,
        }
    }
}

/// Console log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, human-oriented output for local development.
    Pretty,

    /// Single-line output.
    #[default]
    Compact,

    /// Structured JSON, one object per line.
    Json,
}
