use serde::{Deserialize, Serialize};
use std::fmt;

/// Access and refresh credentials issued by the backend.
///
/// Both values are opaque. The access credential authorizes individual API
/// calls; the refresh credential is only ever sent to the renewal endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    pub access: String,
    pub refresh: String,
}

impl CredentialPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
        }
    }

    /// Replace the access credential, keeping the refresh credential unless
    /// the backend rotated it.
    pub fn rotate(&self, access: impl Into<String>, refresh: Option<String>) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.unwrap_or_else(|| self.refresh.clone()),
        }
    }
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .finish()
    }
}

/// Coarse permission class reported by the backend as `user_type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Employee,
    #[default]
    Guest,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Employee => "employee",
            Self::Guest => "guest",
        }
    }

    /// Resolve a possibly missing role. Superusers without an explicit role
    /// are admins; everyone else falls back to guest.
    pub fn resolve(reported: Option<Self>, is_superuser: bool) -> Self {
        match reported {
            Some(role) => role,
            None if is_superuser => Self::Admin,
            None => Self::Guest,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "employee" => Ok(Self::Employee),
            "guest" => Ok(Self::Guest),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// The authenticated user, with its role already resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub employee_id: Option<String>,
    pub is_superuser: bool,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin || self.is_superuser
    }

    pub fn is_employee(&self) -> bool {
        self.role == Role::Employee
    }

    /// "First Last", or the email when both names are blank
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() {
            self.email.clone()
        } else {
            name.to_string()
        }
    }
}
