//! hrdesk session management
//!
//! [`SessionContext`] owns the signed-in identity and drives login, logout
//! and registration on top of an [`hrdesk_http::ApiClient`]. [`RouteGuard`]
//! is the coarse presence check applied before protected pages, and
//! [`Navigator`] is how the session tells its host where to go next.

pub mod context;
pub mod guard;
pub mod navigator;

pub use context::{SessionContext, SessionPhase, SessionState};
pub use guard::{GuardDecision, RouteGuard};
pub use navigator::{Navigator, Route};
