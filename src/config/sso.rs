use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Settings for the CAS SSO service the bridge authenticates against.
///
/// Loaded once at startup and never mutated afterwards: every request reads
/// the same immutable view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CasConfig {
    /// Base URL of the SSO service (e.g. `https://sso.example.edu/cas`).
    /// Required.
    #[serde(default)]
    pub url: String,

    /// Service identifier registered with the SSO service. Sent with every
    /// ticket validation and login redirect. Required.
    #[serde(default)]
    pub service: String,

    /// Landing page after a complete SSO logout. Empty means none.
    #[serde(default)]
    pub redirect_url: String,

    /// Whether logging out of the host application also terminates the SSO
    /// session. When false, logout redirects back to the SSO login page
    /// instead.
    #[serde(default)]
    pub logout_completely: bool,

    /// Whether a verified principal must additionally exist as a user record
    /// in the host application.
    #[serde(default)]
    pub lookup_user_in_host: bool,

    /// Timeout for the ticket-validation round-trip, in seconds. A hung SSO
    /// service surfaces as a validation failure instead of hanging the
    /// request.
    #[serde(default = "default_validation_timeout_secs")]
    pub validation_timeout_secs: u64,
}

fn default_validation_timeout_secs() -> u64 {
    10
}

impl Default for CasConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            service: String::new(),
            redirect_url: String::new(),
            logout_completely: false,
            lookup_user_in_host: false,
            validation_timeout_secs: default_validation_timeout_secs(),
        }
    }
}

impl CasConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::Validation(
                "sso.url is required: the bridge cannot run without the SSO service URL".into(),
            ));
        }
        if url::Url::parse(&self.url).is_err() {
            return Err(ConfigError::Validation(format!(
                "sso.url is not a valid URL: {}",
                self.url
            )));
        }
        if self.service.is_empty() {
            return Err(ConfigError::Validation(
                "sso.service is required: the service identifier registered with the SSO service"
                    .into(),
            ));
        }
        Ok(())
    }
}
