/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and strength rules
/// - [`jwt`]: Access/refresh token pairs carrying the user's role
/// - [`middleware`]: Bearer token extraction into an [`middleware::AuthContext`]
/// - [`authorization`]: The role predicate every gated operation goes through
///
/// # Example
///
/// ```no_run
/// use smartrental_shared::auth::jwt::{issue_token_pair, validate_access_token, TokenLifetimes};
/// use smartrental_shared::auth::password::{hash_password, verify_password};
/// use smartrental_shared::models::user::Role;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Str0ng!Pass")?;
/// assert!(verify_password("Str0ng!Pass", &hash)?);
///
/// let secret = "a-secret-key-that-is-at-least-32-bytes";
/// let pair = issue_token_pair(Uuid::new_v4(), Role::Tenant, secret, &TokenLifetimes::default())?;
/// let claims = validate_access_token(&pair.access, secret)?;
/// assert_eq!(claims.role, Role::Tenant);
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
