//! Wire schemas for the authentication endpoints

use hrdesk_core::{CredentialPair, Identity, Role};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a user identifies themselves at login
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginIdentifier {
    Email(String),
    EmployeeId(String),
}

impl LoginIdentifier {
    /// Employees may sign in with their employee number; anything containing
    /// an "@" (and every other role) is treated as an email address.
    pub fn for_role(identifier: &str, role: Role) -> Self {
        if role == Role::Employee && !identifier.contains('@') {
            Self::EmployeeId(identifier.to_string())
        } else {
            Self::Email(identifier.to_string())
        }
    }
}

/// `POST /api/auth/token/` body
#[derive(Clone, Serialize)]
pub struct LoginRequest {
    #[serde(flatten)]
    pub identifier: LoginIdentifier,
    pub password: String,
    pub user_type: Role,
}

impl LoginRequest {
    pub fn new(identifier: &str, password: impl Into<String>, role: Role) -> Self {
        Self {
            identifier: LoginIdentifier::for_role(identifier, role),
            password: password.into(),
            user_type: role,
        }
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("identifier", &self.identifier)
            .field("password", &"<redacted>")
            .field("user_type", &self.user_type)
            .finish()
    }
}

/// `POST /api/auth/token/` response
#[derive(Clone, Deserialize)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
    #[serde(default)]
    pub user: Option<UserResponse>,
}

impl LoginResponse {
    pub fn credentials(&self) -> CredentialPair {
        CredentialPair::new(self.access.clone(), self.refresh.clone())
    }
}

impl fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginResponse")
            .field("credentials", &self.credentials())
            .field("user", &self.user)
            .finish()
    }
}

/// `POST /api/auth/token/refresh/` body
#[derive(Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

/// `POST /api/auth/token/refresh/` response. `refresh` is only present when
/// the backend rotates refresh credentials.
#[derive(Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

/// `GET /api/auth/user/` response, also embedded in login responses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub user_type: Option<Role>,
    pub employee_id: Option<String>,
    pub is_superuser: Option<bool>,
}

impl From<UserResponse> for Identity {
    fn from(user: UserResponse) -> Self {
        let is_superuser = user.is_superuser.unwrap_or(false);
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role: Role::resolve(user.user_type, is_superuser),
            employee_id: user.employee_id,
            is_superuser,
        }
    }
}

/// `POST /api/auth/registration/` body
#[derive(Clone, Serialize)]
pub struct RegistrationRequest {
    pub email: String,
    pub password1: String,
    pub password2: String,
    pub first_name: String,
    pub last_name: String,
    pub user_type: Role,
}

impl RegistrationRequest {
    /// Registration for a guest account with a confirmed password
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        let password = password.into();
        Self {
            email: email.into(),
            password1: password.clone(),
            password2: password,
            first_name: first_name.into(),
            last_name: last_name.into(),
            user_type: Role::Guest,
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.user_type = role;
        self
    }
}

impl fmt::Debug for RegistrationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationRequest")
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("user_type", &self.user_type)
            .finish_non_exhaustive()
    }
}

/// `POST /api/auth/registration/` response. Backends that require email
/// verification answer without credentials.
#[derive(Default, Deserialize)]
pub struct RegistrationResponse {
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub refresh: Option<String>,
}

impl RegistrationResponse {
    pub fn credentials(&self) -> Option<CredentialPair> {
        match (&self.access, &self.refresh) {
            (Some(access), Some(refresh)) => Some(CredentialPair::new(access, refresh)),
            _ => None,
        }
    }
}
