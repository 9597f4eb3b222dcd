//! Authentication routes bridging the host login flow to the SSO service.
//!
//! - `/auth/login` - runs the authentication decision for the request:
//!   validates a returned ticket, delegates to the host's native flow when
//!   SSO is bypassed, or redirects the browser to the SSO login page.
//! - `/auth/logout` - tears down the native session, then redirects to the
//!   SSO logout or login page depending on configuration.

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;

use crate::{
    AppState,
    auth::{AuthError, AuthOutcome, AuthRequest, RequestAuthOutcome},
};

/// Identity reported after a successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub authenticated: bool,
    pub principal: String,
    /// `"sso"` or `"native"`, depending on which flow vouched for the
    /// principal.
    pub source: &'static str,
    /// Identity-lookup result, present only when host lookup is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub found_in_host: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub logged_out: bool,
}

/// Login endpoint.
///
/// The decision engine runs first; when it ends without a credential (no
/// ticket yet, or the native flow did not authenticate) the presentation
/// flow decides between the SSO redirect, a native prompt, and an explicit
/// 401 that breaks a redirect loop.
#[tracing::instrument(name = "auth.login", skip(state, params))]
pub async fn login(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, AuthError> {
    let mut request = AuthRequest::new(params);

    match state.gateway.authenticate(&mut request).await? {
        AuthOutcome::Authenticated {
            principal,
            found_in_host,
        } => {
            if found_in_host == Some(false) {
                // Verified by the SSO service but unknown to the host: the
                // presentation flow turns this into a 401 instead of
                // bouncing back to the SSO service.
                return prompt(&state, &mut request).await;
            }
            Ok(Json(LoginResponse {
                authenticated: true,
                principal,
                source: "sso",
                found_in_host,
            })
            .into_response())
        }
        AuthOutcome::Native(Some(principal)) => Ok(Json(LoginResponse {
            authenticated: true,
            principal,
            source: "native",
            found_in_host: None,
        })
        .into_response()),
        AuthOutcome::Native(None) | AuthOutcome::AwaitingTicket => {
            prompt(&state, &mut request).await
        }
    }
}

/// Run the presentation flow and turn its outcome into a response.
async fn prompt(state: &AppState, request: &mut AuthRequest) -> Result<Response, AuthError> {
    match state.gateway.request_authenticate(request).await? {
        RequestAuthOutcome::Redirect(url) | RequestAuthOutcome::Native(Some(url)) => {
            Ok(Redirect::to(&url).into_response())
        }
        RequestAuthOutcome::Native(None) => {
            Ok((StatusCode::UNAUTHORIZED, "Authentication required").into_response())
        }
        RequestAuthOutcome::Denied(message) => {
            Ok((StatusCode::UNAUTHORIZED, message).into_response())
        }
    }
}

/// Logout endpoint.
#[tracing::instrument(name = "auth.logout", skip(state, params))]
pub async fn logout(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, AuthError> {
    let mut request = AuthRequest::new(params);

    let outcome = state.gateway.logout(&mut request).await?;

    match outcome.redirect {
        Some(url) => Ok(Redirect::to(&url).into_response()),
        None => Ok(Json(LogoutResponse { logged_out: true }).into_response()),
    }
}
