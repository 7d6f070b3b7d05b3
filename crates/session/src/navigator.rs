use hrdesk_core::Identity;
use std::fmt;

/// Where the session wants the user to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Public landing page
    Landing,
    /// Login entry point
    Login,
    AdminHome,
    EmployeeHome,
    Path(String),
}

impl Route {
    pub fn as_path(&self) -> &str {
        match self {
            Self::Landing => "/",
            Self::Login => "/login",
            Self::AdminHome => "/admin/dashboard",
            Self::EmployeeHome => "/employee/dashboard",
            Self::Path(path) => path,
        }
    }

    /// Home page for a freshly signed-in user
    pub fn home_for(identity: &Identity) -> Self {
        if identity.is_admin() {
            Self::AdminHome
        } else if identity.is_employee() {
            Self::EmployeeHome
        } else {
            Self::Landing
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_path())
    }
}

/// Performs navigation requested by the session
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

#[cfg(test)]
mod tests {
    use super::*;
    use hrdesk_core::Role;

    fn identity(role: Role, is_superuser: bool) -> Identity {
        Identity {
            id: 1,
            email: "someone@example.com".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            role,
            employee_id: None,
            is_superuser,
        }
    }

    #[test]
    fn home_follows_role() {
        assert_eq!(Route::home_for(&identity(Role::Admin, false)), Route::AdminHome);
        assert_eq!(Route::home_for(&identity(Role::Guest, true)), Route::AdminHome);
        assert_eq!(
            Route::home_for(&identity(Role::Employee, false)),
            Route::EmployeeHome
        );
        assert_eq!(Route::home_for(&identity(Role::Guest, false)), Route::Landing);
    }

    #[test]
    fn paths() {
        assert_eq!(Route::AdminHome.as_path(), "/admin/dashboard");
        assert_eq!(Route::EmployeeHome.to_string(), "/employee/dashboard");
        assert_eq!(Route::Path("/leave".into()).as_path(), "/leave");
    }
}
