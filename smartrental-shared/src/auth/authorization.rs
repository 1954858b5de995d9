/// Role-based authorization
///
/// Every gated operation goes through [`require_role`]: the caller's role,
/// as carried by its access token, must be one of the allowed roles. Login
/// endpoints apply the same predicate through [`LoginPortal::admits`].
///
/// # Example
///
/// ```
/// use smartrental_shared::auth::authorization::{require_admin, require_role};
/// use smartrental_shared::auth::middleware::AuthContext;
/// use smartrental_shared::models::user::Role;
/// use uuid::Uuid;
///
/// let auth = AuthContext { user_id: Uuid::new_v4(), role: Role::Owner };
///
/// assert!(require_role(&auth, &[Role::Owner, Role::Tenant]).is_ok());
/// assert!(require_admin(&auth).is_err());
/// ```

use super::middleware::AuthContext;
use crate::models::user::Role;

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// Caller's role is not among the allowed roles
    #[error("Insufficient permissions: requires one of {allowed:?}, has {actual}")]
    InsufficientRole {
        allowed: Vec<Role>,
        actual: Role,
    },
}

/// Checks that the caller holds one of `allowed`
///
/// # Errors
///
/// Returns `AuthzError::InsufficientRole` otherwise
pub fn require_role(auth: &AuthContext, allowed: &[Role]) -> Result<(), AuthzError> {
    if !allowed.contains(&auth.role) {
        return Err(AuthzError::InsufficientRole {
            allowed: allowed.to_vec(),
            actual: auth.role,
        });
    }

    Ok(())
}

/// Checks that the caller is the admin
pub fn require_admin(auth: &AuthContext) -> Result<(), AuthzError> {
    require_role(auth, &[Role::Admin])
}

/// A login endpoint together with the roles it admits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginPortal {
    /// `/login/`
    Admin,

    /// `/login-user/`
    Member,
}

impl LoginPortal {
    /// Roles allowed to log in through this portal
    pub fn allowed_roles(&self) -> &'static [Role] {
        match self {
            LoginPortal::Admin => &[Role::Admin],
            LoginPortal::Member => &[Role::Owner, Role::Tenant],
        }
    }

    /// Whether a user with `role` may log in here
    pub fn admits(&self, role: Role) -> bool {
        self.allowed_roles().contains(&role)
    }
}
