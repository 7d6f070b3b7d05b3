//! Authentication API client methods

use super::{ApiClient, ApiRequest, ClientError};
use crate::types::{
    LoginRequest, LoginResponse, RegistrationRequest, RegistrationResponse, UserResponse,
};

pub const LOGIN_PATH: &str = "/api/auth/token/";
pub const REGISTRATION_PATH: &str = "/api/auth/registration/";
pub const USER_PATH: &str = "/api/auth/user/";

impl ApiClient {
    /// Exchange login credentials for a credential pair.
    ///
    /// Public endpoint: a 401 here means bad credentials and is never
    /// answered with a renewal. The returned pair is not stored.
    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ClientError> {
        let req = ApiRequest::post(LOGIN_PATH).json(request)?;
        self.execute_public(&req).await
    }

    /// Create an account
    pub async fn register(
        &self,
        request: &RegistrationRequest,
    ) -> Result<RegistrationResponse, ClientError> {
        let req = ApiRequest::post(REGISTRATION_PATH).json(request)?;
        self.execute_public(&req).await
    }

    /// Get the current user (requires authentication)
    pub async fn current_user(&self) -> Result<UserResponse, ClientError> {
        self.get(USER_PATH).await
    }
}
