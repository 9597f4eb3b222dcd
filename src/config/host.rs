use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Endpoints of the host application the bridge delegates native flows to.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct HostConfig {
    /// Endpoint receiving the request parameters for native authentication.
    /// Answers 200 with the principal in the body, or 204/401 for "not
    /// authenticated". Required.
    #[serde(default)]
    pub authenticate_url: String,

    /// Endpoint performing native session teardown. Required.
    #[serde(default)]
    pub logout_url: String,

    /// The host's own login page, used to prompt natively when SSO is
    /// bypassed. Required.
    #[serde(default)]
    pub login_page: String,

    /// User-record lookup endpoint; the username is appended as a path
    /// segment. 200 means found, 404 means not found. Required when
    /// `sso.lookup_user_in_host` is enabled.
    #[serde(default)]
    pub lookup_url: Option<String>,
}

impl HostConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("host.authenticate_url", &self.authenticate_url),
            ("host.logout_url", &self.logout_url),
            ("host.login_page", &self.login_page),
        ] {
            if value.is_empty() {
                return Err(ConfigError::Validation(format!("{key} is required")));
            }
        }
        Ok(())
    }
}
