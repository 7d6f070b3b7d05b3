//! hrdesk HTTP client
//!
//! Typed access to the hrdesk REST backend. Every business call carries the
//! stored access credential, and an expired credential is renewed once,
//! shared by all requests that observed the expiry, before they are replayed.

#[macro_use]
extern crate tracing;

pub mod client;
pub mod types;

pub use client::{
    ApiClient, ApiClientBuilder, ApiRequest,
    error::ClientError,
    refresher::{RenewalError, SessionObserver},
    store::{FileTokenStore, MemoryTokenStore, NullTokenStore, TokenStore},
};
