//! Client error types

use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or request error
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server returned an error status
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Credentials were refused (login, registration, or a replayed call)
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The session could not be renewed and has been signed out
    #[error("Session expired, please sign in again")]
    SessionExpired,

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The backend rejected the request payload
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        fields: BTreeMap<String, Vec<String>>,
    },

    /// Forbidden
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Create error from HTTP status code
    pub fn from_status(status: reqwest::StatusCode, message: String) -> Self {
        match status.as_u16() {
            400 => Self::validation(message),
            401 => Self::AuthenticationFailed(detail(&message).unwrap_or(message)),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            _ => Self::ServerError {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Build a validation error from a DRF-style body:
    /// `{"field": ["msg", ..], "non_field_errors": [..], "detail": ".."}`
    fn validation(body: String) -> Self {
        let mut fields = BTreeMap::new();

        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&body) {
            for (field, value) in map {
                let messages = match value {
                    Value::String(message) => vec![message],
                    Value::Array(items) => items
                        .into_iter()
                        .map(|item| match item {
                            Value::String(message) => message,
                            other => other.to_string(),
                        })
                        .collect(),
                    other => vec![other.to_string()],
                };
                fields.insert(field, messages);
            }
        }

        let message = fields
            .iter()
            .find_map(|(field, messages)| {
                messages.first().map(|first| match field.as_str() {
                    "detail" | "non_field_errors" => first.clone(),
                    _ => format!("{field}: {first}"),
                })
            })
            .unwrap_or(body);

        Self::Validation { message, fields }
    }

    /// Whether this is a transport failure rather than a server answer
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Request(_))
    }

    /// Whether the caller has been signed out
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }

    /// Message suitable for showing to a user
    pub fn user_message(&self) -> String {
        match self {
            Self::AuthenticationFailed(message) | Self::Validation { message, .. } => {
                message.clone()
            }
            Self::SessionExpired => "Your session has expired. Please sign in again.".to_string(),
            other => other.to_string(),
        }
    }
}

/// Pull `detail` out of a JSON error body
fn detail(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get("detail")?
        .as_str()
        .map(ToString::to_string)
}
