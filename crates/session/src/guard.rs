//! Presence-only route guard
//!
//! The guard runs before navigation and only asks whether an access
//! credential is stored. It never validates the credential or looks at the
//! identity; an expired credential is let through and dealt with by the
//! client's renewal on the first API call.

use crate::navigator::Route;
use hrdesk_core::GuardConfig;
use hrdesk_http::TokenStore;
use std::sync::Arc;

/// Pages that stay reachable without a credential
const PUBLIC_PAGES: &[&str] = &["/login", "/signup", "/forgot-password"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(Route),
}

pub struct RouteGuard {
    store: Arc<dyn TokenStore>,
    prefixes: Vec<String>,
}

impl RouteGuard {
    pub fn new<I, S>(store: Arc<dyn TokenStore>, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let prefixes = prefixes
            .into_iter()
            .map(Into::into)
            .map(|prefix: String| prefix.trim_end_matches('/').to_string())
            .filter(|prefix| !prefix.is_empty())
            .collect();
        Self { store, prefixes }
    }

    pub fn from_config(store: Arc<dyn TokenStore>, config: &GuardConfig) -> Self {
        Self::new(store, config.protected_prefixes.iter().cloned())
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Whether `path` falls under a protected prefix. `/admin` covers
    /// `/admin` and `/admin/...` but not `/administrator`.
    pub fn is_protected(&self, path: &str) -> bool {
        let path = strip_query(path);
        if PUBLIC_PAGES.iter().any(|page| under(path, page)) {
            return false;
        }
        self.prefixes.iter().any(|prefix| under(path, prefix))
    }

    pub fn check(&self, path: &str) -> GuardDecision {
        if !self.is_protected(path) || self.store.access_token().is_some() {
            return GuardDecision::Allow;
        }

        tracing::debug!(path, "no credential for protected page, redirecting to login");
        GuardDecision::Redirect(Route::Login)
    }
}

fn strip_query(path: &str) -> &str {
    path.split(['?', '#']).next().unwrap_or(path)
}

fn under(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hrdesk_core::CredentialPair;
    use hrdesk_http::MemoryTokenStore;

    fn guard(store: MemoryTokenStore) -> RouteGuard {
        RouteGuard::from_config(Arc::new(store), &GuardConfig::default())
    }

    #[test]
    fn redirects_protected_pages_without_credential() {
        let guard = guard(MemoryTokenStore::new());

        assert_eq!(guard.check("/admin"), GuardDecision::Redirect(Route::Login));
        assert_eq!(
            guard.check("/employee/attendance?month=10"),
            GuardDecision::Redirect(Route::Login)
        );
        assert_eq!(guard.check("/"), GuardDecision::Allow);
        assert_eq!(guard.check("/about"), GuardDecision::Allow);
    }

    #[test]
    fn matching_is_segment_aware() {
        let guard = guard(MemoryTokenStore::new());

        assert!(guard.is_protected("/admin/employees/3"));
        assert!(!guard.is_protected("/administrator"));
        assert!(!guard.is_protected("/employees"));
    }

    #[test]
    fn any_stored_credential_is_enough() {
        // an expired credential still passes; renewal happens on the first call
        let guard = guard(MemoryTokenStore::with_pair(CredentialPair::new(
            "expired", "r1",
        )));

        assert_eq!(guard.check("/admin/dashboard"), GuardDecision::Allow);
        assert_eq!(guard.check("/employee/leave"), GuardDecision::Allow);
    }

    #[test]
    fn auth_pages_are_always_public() {
        let guard = RouteGuard::new(Arc::new(MemoryTokenStore::new()), ["/", "/admin/"]);

        assert_eq!(guard.prefixes(), ["/admin".to_string()]);
        assert_eq!(guard.check("/login"), GuardDecision::Allow);
        assert_eq!(guard.check("/signup"), GuardDecision::Allow);
        assert_eq!(guard.check("/forgot-password"), GuardDecision::Allow);
    }
}
