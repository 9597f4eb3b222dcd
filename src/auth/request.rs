//! The per-request surface the bridge reads and writes.
//!
//! Only a small slice of each inbound request matters here: its query
//! parameters, and a request-scoped attribute map used to hand state (an
//! error message, the identity-lookup result) from the authentication phase
//! to the presentation phase of the same request.

use std::collections::HashMap;

/// Parameter requesting the native login flow instead of SSO. Matched on
/// name only, case-insensitively; the value is ignored.
pub const DISABLE_SSO_PARAM: &str = "disableCAS";

/// Parameter carrying the opaque service ticket issued by the SSO service.
pub const TICKET_PARAM: &str = "ticket";

/// Attribute carrying an error message for the presentation phase.
pub const ERROR_MESSAGE_ATTR: &str = "msg";

/// Attribute recording the identity-lookup result (`"true"`/`"false"`).
pub const USER_IN_HOST_ATTR: &str = "userInDB";

/// One inbound authentication request. Parameters are fixed for the lifetime
/// of the request; attributes are read/write across its phases.
#[derive(Debug, Clone, Default)]
pub struct AuthRequest {
    params: HashMap<String, String>,
    attributes: HashMap<String, String>,
}

impl AuthRequest {
    pub fn new(params: HashMap<String, String>) -> Self {
        Self {
            params,
            attributes: HashMap::new(),
        }
    }

    /// Value of a parameter by exact name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// All parameter names present on the request.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    /// All parameters as name/value pairs.
    pub fn param_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The service ticket, if present and non-empty. An empty `ticket=`
    /// parameter is equivalent to no ticket at all.
    pub fn ticket(&self) -> Option<&str> {
        self.param(TICKET_PARAM).filter(|t| !t.is_empty())
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }
}
