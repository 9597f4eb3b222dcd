//! The authentication decision engine.
//!
//! One inbound request, one outcome. The engine decides whether SSO applies,
//! drives the ticket-validation exchange when it does, and otherwise hands
//! the request to the host's native flow untouched. Logout and the
//! credential prompt follow the same applicability decision.

use std::sync::Arc;

use super::{
    error::AuthError,
    host::{HostBoundary, IdentityLookup},
    redirect::RedirectPolicy,
    request::{AuthRequest, DISABLE_SSO_PARAM, ERROR_MESSAGE_ATTR, USER_IN_HOST_ATTR},
    ticket::TicketValidator,
};
use crate::config::CasConfig;

/// Message surfaced when the SSO service keeps asserting an identity the
/// host has no record of.
const NO_HOST_RECORD_MSG: &str =
    "Unable to retrieve a matching user record from the host application.";

/// Result of the main authentication flow. Exactly one per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// SSO was bypassed; the host's native flow ran and this is its verdict.
    Native(Option<String>),

    /// SSO applies but no ticket has been issued yet: the request is awaiting
    /// the redirect round-trip. Not an error.
    AwaitingTicket,

    /// The SSO service vouched for this principal. `found_in_host` is set
    /// only when host identity lookup is enabled.
    Authenticated {
        principal: String,
        found_in_host: Option<bool>,
    },
}

/// Result of the logout flow. Native teardown has already run; `redirect` is
/// the SSO target to send the browser to afterwards, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoutOutcome {
    pub redirect: Option<String>,
}

/// Result of the presentation flow (prompting for credentials).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestAuthOutcome {
    /// SSO bypassed: the host prompts natively, optionally via this redirect.
    Native(Option<String>),

    /// Authentication must fail outright with this message. Rendering it as
    /// an explicit 401 breaks the redirect loop with the SSO service.
    Denied(String),

    /// Send the browser to the SSO login page.
    Redirect(String),
}

/// The bridge's decision engine. Stateless across requests: everything here
/// is immutable after construction and shared read-only.
pub struct CasGateway {
    redirects: RedirectPolicy,
    service: String,
    lookup_user_in_host: bool,
    validator: Arc<dyn TicketValidator>,
    host: Arc<dyn HostBoundary>,
    lookup: Arc<dyn IdentityLookup>,
}

impl CasGateway {
    pub fn new(
        sso: &CasConfig,
        validator: Arc<dyn TicketValidator>,
        host: Arc<dyn HostBoundary>,
        lookup: Arc<dyn IdentityLookup>,
    ) -> Self {
        Self {
            redirects: RedirectPolicy::new(sso),
            service: sso.service.clone(),
            lookup_user_in_host: sso.lookup_user_in_host,
            validator,
            host,
            lookup,
        }
    }

    /// Whether SSO applies to this request.
    ///
    /// The bypass parameter disables SSO for the request, unless a ticket is
    /// simultaneously present: then a silent round-trip has already completed
    /// and the ticket must be validated rather than discarded.
    pub fn should_use_sso(&self, request: &AuthRequest) -> bool {
        let mut use_sso = true;

        for name in request.param_names() {
            if name.eq_ignore_ascii_case(DISABLE_SSO_PARAM) {
                tracing::debug!(param = %name, "SSO flagged to be disabled for this request");
                use_sso = false;
            }
        }

        if !use_sso && request.ticket().is_some() {
            tracing::debug!("Ticket present, overriding the bypass parameter");
            use_sso = true;
        }

        tracing::debug!(use_sso, "SSO applicability computed");
        use_sso
    }

    /// Produce the authentication outcome for one inbound request.
    pub async fn authenticate(&self, request: &mut AuthRequest) -> Result<AuthOutcome, AuthError> {
        if !self.should_use_sso(request) {
            tracing::debug!("Delegating to the host's native authentication");
            let principal = self
                .host
                .authenticate(request)
                .await
                .map_err(AuthError::Security)?;
            tracing::debug!(principal = ?principal, "Native authentication returned");
            return Ok(AuthOutcome::Native(principal));
        }

        let Some(ticket) = request.ticket().map(str::to_string) else {
            tracing::debug!("Cannot validate without a ticket, awaiting the redirect round-trip");
            return Ok(AuthOutcome::AwaitingTicket);
        };

        let assertion = self
            .validator
            .validate(&ticket, &self.service)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, service = %self.service, "Service ticket validation failed");
                AuthError::ValidationFailed(e)
            })?;

        if assertion.principal.is_empty() {
            tracing::warn!("Assertion carries an empty principal");
            return Err(AuthError::EmptyPrincipal);
        }
        let principal = assertion.principal;

        tracing::info!(principal = %principal, "Authenticated via SSO");

        let found_in_host = if self.lookup_user_in_host {
            let found = match self.lookup.load_by_name(&principal).await {
                Ok(Some(user)) => {
                    tracing::debug!(username = %user.username, "Principal found in the host application");
                    true
                }
                Ok(None) => {
                    tracing::debug!(principal = %principal, "Principal not found in the host application");
                    false
                }
                Err(e) => {
                    // Lookup problems degrade to "not found", never fail the flow.
                    tracing::warn!(error = %e, principal = %principal, "Host identity lookup failed");
                    false
                }
            };
            request.set_attribute(USER_IN_HOST_ATTR, if found { "true" } else { "false" });
            Some(found)
        } else {
            None
        };

        Ok(AuthOutcome::Authenticated {
            principal,
            found_in_host,
        })
    }

    /// Tear down the native session and compute the SSO redirect, if any.
    ///
    /// Native logout runs first, unconditionally: host session teardown must
    /// not depend on the SSO redirect decision.
    pub async fn logout(&self, request: &mut AuthRequest) -> Result<LogoutOutcome, AuthError> {
        let use_sso = self.should_use_sso(request);

        tracing::debug!("Running the host's native logout");
        self.host
            .logout(request)
            .await
            .map_err(AuthError::Security)?;

        if !use_sso {
            tracing::debug!("SSO not in play, native logout stands alone");
            return Ok(LogoutOutcome { redirect: None });
        }

        let redirect = self.redirects.logout_url();
        tracing::info!(
            redirect = %redirect,
            complete = self.redirects.logout_completely(),
            "Redirecting after logout"
        );
        Ok(LogoutOutcome {
            redirect: Some(redirect),
        })
    }

    /// Decide how to prompt for credentials when none were presented.
    pub async fn request_authenticate(
        &self,
        request: &mut AuthRequest,
    ) -> Result<RequestAuthOutcome, AuthError> {
        if !self.should_use_sso(request) {
            tracing::debug!("Delegating the credential prompt to the host");
            let target = self
                .host
                .request_authenticate(request)
                .await
                .map_err(AuthError::Security)?;
            return Ok(RequestAuthOutcome::Native(target));
        }

        let mut message = request.attribute(ERROR_MESSAGE_ATTR).map(str::to_string);

        if message.is_none() && request.attribute(USER_IN_HOST_ATTR) == Some("false") {
            message = Some(NO_HOST_RECORD_MSG.to_string());
        }

        if let Some(message) = message {
            // A redirect here would bounce forever between the bridge and
            // the SSO service.
            tracing::warn!(reason = %message, "Refusing to redirect, reporting failure");
            return Ok(RequestAuthOutcome::Denied(message));
        }

        let gateway = request.ticket().is_some();
        let url = self.redirects.login_url(gateway);
        tracing::debug!(redirect = %url, gateway, "Redirecting to the SSO login page");
        Ok(RequestAuthOutcome::Redirect(url))
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Mutex,
            atomic::{AtomicBool, Ordering},
        },
        time::Duration,
    };

    use async_trait::async_trait;
    use rstest::rstest;

    use super::*;
    use crate::auth::{
        host::{HostError, HostUser},
        ticket::{CasAssertion, ValidationError},
    };

    fn settings() -> CasConfig {
        CasConfig {
            url: "https://sso.example".to_string(),
            service: "https://app.example/cb".to_string(),
            ..Default::default()
        }
    }

    fn request(pairs: &[(&str, &str)]) -> AuthRequest {
        AuthRequest::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    enum Verdict {
        Principal(&'static str),
        Unreachable,
        Reject,
    }

    struct StubValidator {
        verdict: Verdict,
        called: AtomicBool,
    }

    impl StubValidator {
        fn with(verdict: Verdict) -> Arc<Self> {
            Arc::new(Self {
                verdict,
                called: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl TicketValidator for StubValidator {
        async fn validate(
            &self,
            _ticket: &str,
            _service: &str,
        ) -> Result<CasAssertion, ValidationError> {
            self.called.store(true, Ordering::SeqCst);
            match self.verdict {
                Verdict::Principal(p) => Ok(CasAssertion {
                    principal: p.to_string(),
                }),
                Verdict::Unreachable => Err(ValidationError::Timeout(Duration::from_secs(5))),
                Verdict::Reject => Err(ValidationError::Rejected {
                    code: "INVALID_TICKET".to_string(),
                    message: "unknown ticket".to_string(),
                }),
            }
        }
    }

    #[derive(Default)]
    struct StubHost {
        native_principal: Option<&'static str>,
        calls: Mutex<Vec<&'static str>>,
    }

    impl StubHost {
        fn anonymous() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn with_principal(principal: &'static str) -> Arc<Self> {
            Arc::new(Self {
                native_principal: Some(principal),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HostBoundary for StubHost {
        async fn authenticate(&self, _request: &AuthRequest) -> Result<Option<String>, HostError> {
            self.calls.lock().unwrap().push("authenticate");
            Ok(self.native_principal.map(str::to_string))
        }

        async fn logout(&self, _request: &AuthRequest) -> Result<(), HostError> {
            self.calls.lock().unwrap().push("logout");
            Ok(())
        }

        async fn request_authenticate(
            &self,
            _request: &AuthRequest,
        ) -> Result<Option<String>, HostError> {
            self.calls.lock().unwrap().push("request_authenticate");
            Ok(Some("https://app.example/login".to_string()))
        }
    }

    enum LookupBehavior {
        Found,
        NotFound,
        Failing,
    }

    struct StubLookup(LookupBehavior);

    #[async_trait]
    impl IdentityLookup for StubLookup {
        async fn load_by_name(&self, name: &str) -> Result<Option<HostUser>, HostError> {
            match self.0 {
                LookupBehavior::Found => Ok(Some(HostUser {
                    username: name.to_string(),
                })),
                LookupBehavior::NotFound => Ok(None),
                LookupBehavior::Failing => Err(HostError::InvalidEndpoint(
                    "lookup store offline".to_string(),
                )),
            }
        }
    }

    fn gateway(
        sso: CasConfig,
        validator: Arc<StubValidator>,
        host: Arc<StubHost>,
        lookup: LookupBehavior,
    ) -> CasGateway {
        CasGateway::new(&sso, validator, host, Arc::new(StubLookup(lookup)))
    }

    // ─── Applicability ───────────────────────────────────────────────────────

    #[rstest]
    #[case::bypass_alone(&[("disableCAS", "")], false)]
    #[case::bypass_case_insensitive(&[("DISABLECAS", "yes")], false)]
    #[case::bypass_with_ticket(&[("disableCAS", ""), ("ticket", "ST-1")], true)]
    #[case::bypass_with_empty_ticket(&[("disableCAS", ""), ("ticket", "")], false)]
    #[case::ticket_alone(&[("ticket", "ST-1")], true)]
    #[case::neither(&[], true)]
    fn test_should_use_sso(#[case] params: &[(&str, &str)], #[case] expected: bool) {
        let gw = gateway(
            settings(),
            StubValidator::with(Verdict::Principal("jsmith")),
            StubHost::anonymous(),
            LookupBehavior::NotFound,
        );
        assert_eq!(gw.should_use_sso(&request(params)), expected);
    }

    // ─── Authenticate ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_authenticate_without_ticket_awaits_redirect() {
        let validator = StubValidator::with(Verdict::Principal("jsmith"));
        let gw = gateway(
            settings(),
            validator.clone(),
            StubHost::anonymous(),
            LookupBehavior::NotFound,
        );

        let outcome = gw.authenticate(&mut request(&[])).await.unwrap();
        assert_eq!(outcome, AuthOutcome::AwaitingTicket);
        assert!(!validator.called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_authenticate_empty_ticket_awaits_redirect() {
        let validator = StubValidator::with(Verdict::Principal("jsmith"));
        let gw = gateway(
            settings(),
            validator.clone(),
            StubHost::anonymous(),
            LookupBehavior::NotFound,
        );

        let outcome = gw
            .authenticate(&mut request(&[("ticket", "")]))
            .await
            .unwrap();
        assert_eq!(outcome, AuthOutcome::AwaitingTicket);
        assert!(!validator.called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_authenticate_bypass_delegates_to_host() {
        let validator = StubValidator::with(Verdict::Principal("jsmith"));
        let host = StubHost::with_principal("local-user");
        let gw = gateway(
            settings(),
            validator.clone(),
            host.clone(),
            LookupBehavior::NotFound,
        );

        let outcome = gw
            .authenticate(&mut request(&[("disableCAS", "")]))
            .await
            .unwrap();
        assert_eq!(outcome, AuthOutcome::Native(Some("local-user".to_string())));
        assert_eq!(host.calls(), vec!["authenticate"]);
        assert!(!validator.called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_authenticate_valid_ticket() {
        let gw = gateway(
            settings(),
            StubValidator::with(Verdict::Principal("jsmith")),
            StubHost::anonymous(),
            LookupBehavior::NotFound,
        );

        let outcome = gw
            .authenticate(&mut request(&[("ticket", "ST-1")]))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            AuthOutcome::Authenticated {
                principal: "jsmith".to_string(),
                found_in_host: None,
            }
        );
    }

    #[tokio::test]
    async fn test_authenticate_validator_failure_preserves_cause() {
        let gw = gateway(
            settings(),
            StubValidator::with(Verdict::Unreachable),
            StubHost::anonymous(),
            LookupBehavior::NotFound,
        );

        let err = gw
            .authenticate(&mut request(&[("ticket", "ST-1")]))
            .await
            .unwrap_err();
        match err {
            AuthError::ValidationFailed(cause) => {
                assert!(matches!(cause, ValidationError::Timeout(_)))
            }
            other => panic!("expected validation failure, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_authenticate_rejected_ticket_is_a_failure_not_native() {
        let host = StubHost::with_principal("local-user");
        let gw = gateway(
            settings(),
            StubValidator::with(Verdict::Reject),
            host.clone(),
            LookupBehavior::NotFound,
        );

        let err = gw
            .authenticate(&mut request(&[("ticket", "ST-1")]))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::ValidationFailed(_)));
        // The native flow must not run as a fallback.
        assert!(host.calls().is_empty());
    }

    #[tokio::test]
    async fn test_authenticate_empty_principal_fails() {
        let gw = gateway(
            settings(),
            StubValidator::with(Verdict::Principal("")),
            StubHost::anonymous(),
            LookupBehavior::NotFound,
        );

        let err = gw
            .authenticate(&mut request(&[("ticket", "ST-1")]))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmptyPrincipal));
    }

    #[tokio::test]
    async fn test_lookup_found_sets_attribute() {
        let mut sso = settings();
        sso.lookup_user_in_host = true;
        let gw = gateway(
            sso,
            StubValidator::with(Verdict::Principal("jsmith")),
            StubHost::anonymous(),
            LookupBehavior::Found,
        );

        let mut req = request(&[("ticket", "ST-1")]);
        let outcome = gw.authenticate(&mut req).await.unwrap();
        assert_eq!(
            outcome,
            AuthOutcome::Authenticated {
                principal: "jsmith".to_string(),
                found_in_host: Some(true),
            }
        );
        assert_eq!(req.attribute(USER_IN_HOST_ATTR), Some("true"));
    }

    #[tokio::test]
    async fn test_lookup_failure_degrades_to_not_found() {
        let mut sso = settings();
        sso.lookup_user_in_host = true;
        let gw = gateway(
            sso,
            StubValidator::with(Verdict::Principal("jsmith")),
            StubHost::anonymous(),
            LookupBehavior::Failing,
        );

        let mut req = request(&[("ticket", "ST-1")]);
        let outcome = gw.authenticate(&mut req).await.unwrap();
        assert_eq!(
            outcome,
            AuthOutcome::Authenticated {
                principal: "jsmith".to_string(),
                found_in_host: Some(false),
            }
        );
        assert_eq!(req.attribute(USER_IN_HOST_ATTR), Some("false"));
    }

    #[tokio::test]
    async fn test_lookup_disabled_sets_no_attribute() {
        let gw = gateway(
            settings(),
            StubValidator::with(Verdict::Principal("jsmith")),
            StubHost::anonymous(),
            LookupBehavior::Found,
        );

        let mut req = request(&[("ticket", "ST-1")]);
        gw.authenticate(&mut req).await.unwrap();
        assert_eq!(req.attribute(USER_IN_HOST_ATTR), None);
    }

    // ─── Logout ──────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_logout_runs_native_teardown_first() {
        let mut sso = settings();
        sso.logout_completely = true;
        sso.redirect_url = "https://app.example/bye".to_string();
        let host = StubHost::anonymous();
        let gw = gateway(
            sso,
            StubValidator::with(Verdict::Principal("jsmith")),
            host.clone(),
            LookupBehavior::NotFound,
        );

        let outcome = gw.logout(&mut request(&[])).await.unwrap();
        assert_eq!(host.calls(), vec!["logout"]);
        assert_eq!(
            outcome.redirect.as_deref(),
            Some("https://sso.example/logout?url=https%3A%2F%2Fapp.example%2Fbye")
        );
    }

    #[tokio::test]
    async fn test_logout_soft_redirects_to_sso_base_url() {
        let gw = gateway(
            settings(),
            StubValidator::with(Verdict::Principal("jsmith")),
            StubHost::anonymous(),
            LookupBehavior::NotFound,
        );

        let outcome = gw.logout(&mut request(&[])).await.unwrap();
        assert_eq!(outcome.redirect.as_deref(), Some("https://sso.example"));
    }

    #[tokio::test]
    async fn test_logout_bypass_has_no_redirect() {
        let host = StubHost::anonymous();
        let gw = gateway(
            settings(),
            StubValidator::with(Verdict::Principal("jsmith")),
            host.clone(),
            LookupBehavior::NotFound,
        );

        let outcome = gw
            .logout(&mut request(&[("disableCAS", "")]))
            .await
            .unwrap();
        assert_eq!(outcome.redirect, None);
        // Native teardown still ran.
        assert_eq!(host.calls(), vec!["logout"]);
    }

    #[tokio::test]
    async fn test_logout_ticket_overrides_bypass() {
        let gw = gateway(
            settings(),
            StubValidator::with(Verdict::Principal("jsmith")),
            StubHost::anonymous(),
            LookupBehavior::NotFound,
        );

        let outcome = gw
            .logout(&mut request(&[("disableCAS", ""), ("ticket", "ST-1")]))
            .await
            .unwrap();
        assert!(outcome.redirect.is_some());
    }

    // ─── Request authenticate ────────────────────────────────────────────────

    #[tokio::test]
    async fn test_request_authenticate_bypass_prompts_natively() {
        let host = StubHost::anonymous();
        let gw = gateway(
            settings(),
            StubValidator::with(Verdict::Principal("jsmith")),
            host.clone(),
            LookupBehavior::NotFound,
        );

        let outcome = gw
            .request_authenticate(&mut request(&[("disableCAS", "")]))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            RequestAuthOutcome::Native(Some("https://app.example/login".to_string()))
        );
        assert_eq!(host.calls(), vec!["request_authenticate"]);
    }

    #[tokio::test]
    async fn test_request_authenticate_redirects_without_gateway() {
        let gw = gateway(
            settings(),
            StubValidator::with(Verdict::Principal("jsmith")),
            StubHost::anonymous(),
            LookupBehavior::NotFound,
        );

        let outcome = gw.request_authenticate(&mut request(&[])).await.unwrap();
        assert_eq!(
            outcome,
            RequestAuthOutcome::Redirect(
                "https://sso.example/login?service=https%3A%2F%2Fapp.example%2Fcb".to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_request_authenticate_gateway_when_ticket_present() {
        let gw = gateway(
            settings(),
            StubValidator::with(Verdict::Principal("jsmith")),
            StubHost::anonymous(),
            LookupBehavior::NotFound,
        );

        let outcome = gw
            .request_authenticate(&mut request(&[("ticket", "ST-1")]))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            RequestAuthOutcome::Redirect(
                "https://sso.example/login?service=https%3A%2F%2Fapp.example%2Fcb&gateway=true"
                    .to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_request_authenticate_denies_when_user_not_in_host() {
        let gw = gateway(
            settings(),
            StubValidator::with(Verdict::Principal("jsmith")),
            StubHost::anonymous(),
            LookupBehavior::NotFound,
        );

        let mut req = request(&[]);
        req.set_attribute(USER_IN_HOST_ATTR, "false");
        let outcome = gw.request_authenticate(&mut req).await.unwrap();
        assert_eq!(outcome, RequestAuthOutcome::Denied(NO_HOST_RECORD_MSG.to_string()));
    }

    #[tokio::test]
    async fn test_request_authenticate_existing_message_wins() {
        let gw = gateway(
            settings(),
            StubValidator::with(Verdict::Principal("jsmith")),
            StubHost::anonymous(),
            LookupBehavior::NotFound,
        );

        let mut req = request(&[]);
        req.set_attribute(ERROR_MESSAGE_ATTR, "session expired");
        req.set_attribute(USER_IN_HOST_ATTR, "false");
        let outcome = gw.request_authenticate(&mut req).await.unwrap();
        assert_eq!(
            outcome,
            RequestAuthOutcome::Denied("session expired".to_string())
        );
    }
}
