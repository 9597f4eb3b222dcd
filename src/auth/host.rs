//! The boundary to the host application's native authentication.
//!
//! The bridge composes with, rather than replaces, the host's own
//! login/logout flow: when SSO is bypassed the request is delegated across
//! this boundary untouched, and a verified principal can optionally be
//! checked against the host's user store.

use async_trait::async_trait;
use reqwest::Url;

use super::request::AuthRequest;
use crate::config::HostConfig;

/// A user record resolved from the host application's store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostUser {
    pub username: String,
}

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("host request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("host endpoint returned HTTP {0}")]
    Status(http::StatusCode),

    #[error("invalid host endpoint URL: {0}")]
    InvalidEndpoint(String),
}

/// The host application's native authentication flow.
#[async_trait]
pub trait HostBoundary: Send + Sync {
    /// Native credential check. `None` means the host did not authenticate
    /// the request (absent or wrong credentials), which is a normal outcome,
    /// not an error.
    async fn authenticate(&self, request: &AuthRequest) -> Result<Option<String>, HostError>;

    /// Native session teardown.
    async fn logout(&self, request: &AuthRequest) -> Result<(), HostError>;

    /// Where the host prompts for credentials natively, if anywhere.
    async fn request_authenticate(
        &self,
        request: &AuthRequest,
    ) -> Result<Option<String>, HostError>;
}

/// Resolves a verified principal to a local user record. Absence of a
/// record is a normal outcome, not an error.
#[async_trait]
pub trait IdentityLookup: Send + Sync {
    async fn load_by_name(&self, name: &str) -> Result<Option<HostUser>, HostError>;
}

/// Host boundary over HTTP, for running the bridge as a standalone service
/// in front of a host application.
///
/// Contract: the authenticate endpoint receives the request parameters as a
/// form POST and answers 200 with the principal as the response body (an
/// empty body, 204 or 401 mean "not authenticated"); the lookup endpoint
/// takes the username as a path segment and answers 200 for a known user,
/// 404 for an unknown one.
pub struct RemoteHost {
    config: HostConfig,
    http_client: reqwest::Client,
}

impl RemoteHost {
    pub fn new(config: HostConfig, http_client: reqwest::Client) -> Self {
        Self {
            config,
            http_client,
        }
    }
}

#[async_trait]
impl HostBoundary for RemoteHost {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Option<String>, HostError> {
        let form: Vec<(&str, &str)> = request.param_pairs().collect();
        let response = self
            .http_client
            .post(&self.config.authenticate_url)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if status == http::StatusCode::NO_CONTENT || status == http::StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(HostError::Status(status));
        }

        let body = response.text().await?;
        let principal = body.trim();
        if principal.is_empty() {
            Ok(None)
        } else {
            Ok(Some(principal.to_string()))
        }
    }

    async fn logout(&self, request: &AuthRequest) -> Result<(), HostError> {
        let form: Vec<(&str, &str)> = request.param_pairs().collect();
        let response = self
            .http_client
            .post(&self.config.logout_url)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(HostError::Status(status))
        }
    }

    async fn request_authenticate(
        &self,
        _request: &AuthRequest,
    ) -> Result<Option<String>, HostError> {
        Ok(Some(self.config.login_page.clone()))
    }
}

#[async_trait]
impl IdentityLookup for RemoteHost {
    async fn load_by_name(&self, name: &str) -> Result<Option<HostUser>, HostError> {
        let Some(lookup_url) = self.config.lookup_url.as_deref() else {
            return Ok(None);
        };

        let mut url =
            Url::parse(lookup_url).map_err(|e| HostError::InvalidEndpoint(format!("{lookup_url}: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| HostError::InvalidEndpoint(format!("cannot extend path of {lookup_url}")))?
            .push(name);

        let response = self.http_client.get(url).send().await?;

        let status = response.status();
        if status == http::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(HostError::Status(status));
        }

        Ok(Some(HostUser {
            username: name.to_string(),
        }))
    }
}
