//! Bearer credential attachment for business calls

use super::store::TokenStore;
use reqwest::RequestBuilder;
use std::sync::Arc;

/// Attaches the stored access credential to outgoing requests
#[derive(Clone)]
pub struct RequestAuthenticator {
    store: Arc<dyn TokenStore>,
}

impl RequestAuthenticator {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }

    /// Attach the current access credential, if any.
    ///
    /// Returns the credential that was attached so a later rejection can be
    /// compared against the store.
    pub fn authorize(&self, request: RequestBuilder) -> (RequestBuilder, Option<String>) {
        match self.store.access_token() {
            Some(access) => (request.bearer_auth(&access), Some(access)),
            None => (request, None),
        }
    }
}
