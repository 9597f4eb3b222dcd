//! Redirect target construction for the SSO round-trips.
//!
//! Pure computation: the decision engine decides *whether* to redirect,
//! this module decides *where*. The actual HTTP redirect is issued by the
//! route layer.

use crate::config::CasConfig;

const LOGIN_PATH: &str = "/login?";
const LOGOUT_PATH: &str = "/logout";
const SERVICE_PARAM: &str = "service";
const GATEWAY_PARAM: &str = "gateway";

/// Computes the outbound redirect targets for SSO login and logout.
#[derive(Debug, Clone)]
pub struct RedirectPolicy {
    sso_url: String,
    service: String,
    redirect_url: String,
    logout_completely: bool,
}

impl RedirectPolicy {
    pub fn new(sso: &CasConfig) -> Self {
        Self {
            sso_url: sso.url.clone(),
            service: sso.service.clone(),
            redirect_url: sso.redirect_url.clone(),
            logout_completely: sso.logout_completely,
        }
    }

    /// The SSO login page carrying the registered service identifier.
    ///
    /// With `gateway` set the SSO service is asked to attempt a silent
    /// re-authentication against an existing SSO session instead of
    /// prompting for credentials again.
    pub fn login_url(&self, gateway: bool) -> String {
        let mut url = format!(
            "{}{}{}={}",
            self.sso_url,
            LOGIN_PATH,
            SERVICE_PARAM,
            encode(&self.service)
        );
        if gateway {
            url.push('&');
            url.push_str(GATEWAY_PARAM);
            url.push_str("=true");
        }
        url
    }

    /// Where to send the browser after native logout.
    ///
    /// When terminating the SSO session too, this is the SSO logout endpoint
    /// with an optional encoded landing page. Otherwise the bare SSO base
    /// URL: the next visit re-presents the SSO login page ("soft" logout).
    pub fn logout_url(&self) -> String {
        if !self.logout_completely {
            return self.sso_url.clone();
        }

        let mut url = format!("{}{}", self.sso_url, LOGOUT_PATH);
        if !self.redirect_url.is_empty() {
            url.push_str("?url=");
            url.push_str(&encode(&self.redirect_url));
        }
        url
    }

    pub fn logout_completely(&self) -> bool {
        self.logout_completely
    }
}

/// Percent-encode a query parameter value.
fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
