//! CLI commands

use anyhow::{Result, anyhow};
use clap::Subcommand;
use hrdesk_core::{Identity, Role, Settings};
use hrdesk_http::types::RegistrationRequest;
use hrdesk_http::{ApiClient, ClientError, FileTokenStore, TokenStore};
use hrdesk_session::{GuardDecision, RouteGuard, SessionContext};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::navigator::TerminalNavigator;

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and store the issued credentials
    Login {
        /// Email address, or employee number for employees
        identifier: String,

        /// Portal to sign in to
        #[arg(short, long, default_value = "employee")]
        role: Role,

        /// Password
        #[arg(short, long, env = "HRDESK_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account
    Register {
        email: String,

        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        #[arg(short, long, default_value = "guest")]
        role: Role,

        #[arg(short, long, env = "HRDESK_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the stored credentials
    Logout,

    /// Show who the stored credentials belong to
    Whoami,

    /// Authenticated GET against the API, printed as JSON
    Get {
        /// Path relative to the base URL, e.g. /api/employees/
        path: String,
    },

    /// Show what the route guard decides for a page
    Guard { path: String },

    /// Print the effective settings
    Config,
}

impl Commands {
    pub async fn execute(self, settings: Settings) -> Result<()> {
        let credentials = FileTokenStore::open(settings.credentials_path());
        debug!(path = %credentials.path().display(), "using credential file");
        let store: Arc<dyn TokenStore> = Arc::new(credentials);

        match self {
            Self::Login {
                identifier,
                role,
                password,
            } => {
                let (session, navigator) = open_session(&settings, store)?;
                let identity = session
                    .login(&identifier, &password, role)
                    .await
                    .map_err(describe)?;
                println!("Signed in as {}", summary(&identity));
                if let Some(route) = navigator.last_route() {
                    println!("Home: {route}");
                }
            }
            Self::Register {
                email,
                first_name,
                last_name,
                role,
                password,
            } => {
                let (session, _) = open_session(&settings, store)?;
                let request =
                    RegistrationRequest::new(email, password, first_name, last_name).with_role(role);
                match session.register(&request).await.map_err(describe)? {
                    Some(identity) => println!("Account created, signed in as {}", summary(&identity)),
                    None => println!("Account created. Verify your e-mail address, then sign in."),
                }
            }
            Self::Logout => {
                let (session, _) = open_session(&settings, store)?;
                session.logout();
                println!("Signed out");
            }
            Self::Whoami => {
                let (session, _) = open_session(&settings, store)?;
                match session.restore().await {
                    Some(identity) => {
                        println!("{}", summary(&identity));
                        println!("  email:       {}", identity.email);
                        if let Some(employee_id) = &identity.employee_id {
                            println!("  employee id: {employee_id}");
                        }
                        println!("  admin:       {}", session.is_admin());
                        println!("  employee:    {}", session.is_employee());
                    }
                    None => println!("Not signed in"),
                }
            }
            Self::Get { path } => {
                let (session, _) = open_session(&settings, store)?;
                let body: Value = session.client().get(&path).await.map_err(describe)?;
                println!("{}", serde_json::to_string_pretty(&body)?);
            }
            Self::Guard { path } => {
                let guard = RouteGuard::from_config(store, &settings.guard);
                match guard.check(&path) {
                    GuardDecision::Allow => println!("allow {path}"),
                    GuardDecision::Redirect(route) => println!("redirect {path} -> {route}"),
                }
            }
            Self::Config => println!("{}", serde_json::to_string_pretty(&settings)?),
        }

        Ok(())
    }
}

fn open_session(
    settings: &Settings,
    store: Arc<dyn TokenStore>,
) -> Result<(SessionContext, Arc<TerminalNavigator>)> {
    let navigator = Arc::new(TerminalNavigator::default());
    let client = ApiClient::from_settings(settings, store)?;
    let session = SessionContext::new(client, navigator.clone());
    Ok((session, navigator))
}

fn summary(identity: &Identity) -> String {
    format!("{} ({})", identity.display_name(), identity.role)
}

/// Turn a client error into something worth printing
fn describe(error: ClientError) -> anyhow::Error {
    match error {
        error if error.is_session_expired() => {
            anyhow!("Not signed in or session expired, run `hrdesk login` first")
        }
        ClientError::Validation { message, fields } if fields.len() > 1 => {
            let details: Vec<String> = fields
                .into_iter()
                .map(|(field, messages)| format!("{field}: {}", messages.join(" ")))
                .collect();
            anyhow!("{message}\n{}", details.join("\n"))
        }
        other => anyhow!(other.user_message()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn expired_session_points_at_login() {
        let message = describe(ClientError::SessionExpired).to_string();
        assert!(message.contains("hrdesk login"));
    }

    #[test]
    fn lists_every_invalid_field() {
        let fields = BTreeMap::from([
            ("email".to_string(), vec!["Enter a valid email address.".to_string()]),
            ("password1".to_string(), vec!["This password is too short.".to_string()]),
        ]);
        let message = describe(ClientError::Validation {
            message: "email: Enter a valid email address.".to_string(),
            fields,
        })
        .to_string();

        assert!(message.contains("password1: This password is too short."));
    }
}
