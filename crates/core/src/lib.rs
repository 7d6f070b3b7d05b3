//! hrdesk core types and utilities

pub mod config;
pub mod error;
pub mod types;

pub use config::{ApiConfig, GuardConfig, Settings, StorageConfig};
pub use error::{CoreError, CoreResult};
pub use types::{CredentialPair, Identity, Role};
