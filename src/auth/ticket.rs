//! Service-ticket validation against the SSO service.
//!
//! The CAS 2.0 exchange is one GET to `/serviceValidate` with the ticket and
//! the registered service identifier, answered by a small XML document that
//! either names the authenticated principal or rejects the ticket.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

/// A redeemed ticket: the SSO service vouched for this principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CasAssertion {
    pub principal: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("validation request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("validation timed out after {0:?}")]
    Timeout(Duration),

    #[error("validation endpoint returned HTTP {0}")]
    Status(http::StatusCode),

    #[error("ticket rejected by the SSO service ({code}): {message}")]
    Rejected { code: String, message: String },

    #[error("malformed validation response: {0}")]
    Malformed(String),

    #[error("invalid SSO service URL: {0}")]
    InvalidEndpoint(String),
}

/// One round-trip to the SSO service: ticket and service identifier in,
/// principal-bearing assertion or failure out. No retries; callers decide
/// what a failure means.
#[async_trait]
pub trait TicketValidator: Send + Sync {
    async fn validate(&self, ticket: &str, service: &str)
    -> Result<CasAssertion, ValidationError>;
}

static FAILURE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?s)<cas:authenticationFailure\s+code="([^"]*)"[^>]*>(.*?)</cas:authenticationFailure>"#,
    )
    .expect("failure pattern compiles")
});

static SUCCESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<cas:authenticationSuccess[\s/>]").expect("success pattern compiles"));

static USER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<cas:user>(.*?)</cas:user>").expect("user pattern compiles"));

/// CAS 2.0 service-ticket validator.
///
/// The round-trip is wrapped in an explicit timeout; a hung SSO service
/// surfaces as [`ValidationError::Timeout`] instead of hanging the request.
pub struct Cas20TicketValidator {
    base_url: String,
    http_client: reqwest::Client,
    timeout: Duration,
}

impl Cas20TicketValidator {
    pub fn new(base_url: impl Into<String>, http_client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            http_client,
            timeout,
        }
    }
}

#[async_trait]
impl TicketValidator for Cas20TicketValidator {
    async fn validate(
        &self,
        ticket: &str,
        service: &str,
    ) -> Result<CasAssertion, ValidationError> {
        let endpoint = format!("{}/serviceValidate", self.base_url.trim_end_matches('/'));
        let mut url = reqwest::Url::parse(&endpoint)
            .map_err(|e| ValidationError::InvalidEndpoint(format!("{endpoint}: {e}")))?;
        url.query_pairs_mut()
            .append_pair("ticket", ticket)
            .append_pair("service", service);

        tracing::debug!(service = %service, "Validating service ticket");

        let response = tokio::time::timeout(self.timeout, self.http_client.get(url).send())
            .await
            .map_err(|_| ValidationError::Timeout(self.timeout))??;

        let status = response.status();
        if !status.is_success() {
            return Err(ValidationError::Status(status));
        }

        let body = tokio::time::timeout(self.timeout, response.text())
            .await
            .map_err(|_| ValidationError::Timeout(self.timeout))??;

        parse_service_response(&body)
    }
}

/// Parse a CAS 2.0 `serviceValidate` response body.
pub(crate) fn parse_service_response(body: &str) -> Result<CasAssertion, ValidationError> {
    if let Some(caps) = FAILURE_RE.captures(body) {
        return Err(ValidationError::Rejected {
            code: caps[1].to_string(),
            message: caps[2].trim().to_string(),
        });
    }

    if !SUCCESS_RE.is_match(body) {
        return Err(ValidationError::Malformed(
            "no authentication status element".to_string(),
        ));
    }

    let user = USER_RE.captures(body).ok_or_else(|| {
        ValidationError::Malformed("authentication success carries no principal element".to_string())
    })?;

    Ok(CasAssertion {
        principal: user[1].trim().to_string(),
    })
}
