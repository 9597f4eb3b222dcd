mod decision;
mod error;
mod host;
mod redirect;
mod request;
mod ticket;

pub use decision::{AuthOutcome, CasGateway, LogoutOutcome, RequestAuthOutcome};
pub use error::AuthError;
pub use host::{HostBoundary, HostError, HostUser, IdentityLookup, RemoteHost};
pub use request::AuthRequest;
pub use ticket::{Cas20TicketValidator, CasAssertion, TicketValidator, ValidationError};
