/// Request authentication for Axum
///
/// A Bearer access token in the `Authorization` header is decoded into an
/// [`AuthContext`], which the API's auth layer inserts into request
/// extensions. Handlers read it back with Axum's `Extension` extractor.
///
/// Verification is stateless: the context is built from the token's claims
/// alone, without a database round-trip.
///
/// # Example
///
/// ```
/// use axum::Extension;
/// use smartrental_shared::auth::middleware::AuthContext;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("User: {}, role: {}", auth.user_id, auth.role)
/// }
/// ```

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::{validate_access_token, Claims, JwtError};
use crate::models::user::Role;

/// Authentication context added to request extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: Uuid,

    /// Role carried by the access token
    pub role: Role,
}

impl AuthContext {
    /// Creates auth context from validated access token claims
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            user_id: claims.sub,
            role: claims.role,
        }
    }
}

/// Error type for request authentication
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Missing authorization header
    #[error("Missing authorization header")]
    MissingCredentials,

    /// Invalid authorization header format
    #[error("{0}")]
    InvalidFormat(String),

    /// Token validation failed
    #[error("{0}")]
    InvalidToken(String),
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
            JwtError::InvalidIssuer { .. } => {
                AuthError::InvalidToken("Invalid token issuer".to_string())
            }
            JwtError::WrongTokenType { .. } => {
                AuthError::InvalidToken("Expected an access token".to_string())
            }
            _ => AuthError::InvalidToken("Invalid token".to_string()),
        }
    }
}

/// Extracts the raw token from an `Authorization: Bearer <token>` header
///
/// # Errors
///
/// - `AuthError::MissingCredentials` if the header is absent or not ASCII
/// - `AuthError::InvalidFormat` if it is not a non-empty Bearer token
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

    Ok(token)
}

/// Authenticates a request from its headers
///
/// # Example
///
/// ```
/// use axum::http::{header, HeaderMap, HeaderValue};
/// use smartrental_shared::auth::jwt::{create_token, Claims, TokenType};
/// use smartrental_shared::auth::middleware::authenticate;
/// use smartrental_shared::models::user::Role;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let token = create_token(&Claims::new(Uuid::new_v4(), Role::Admin, TokenType::Access), "secret")?;
///
/// let mut headers = HeaderMap::new();
/// headers.insert(header::AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", token))?);
///
/// let auth = authenticate(&headers, "secret")?;
/// assert_eq!(auth.role, Role::Admin);
/// # Ok(())
/// # }
/// ```
pub fn authenticate(headers: &HeaderMap, secret: &str) -> Result<AuthContext, AuthError> {
    let token = bearer_token(headers)?;
    let claims = validate_access_token(token, secret)?;

    Ok(AuthContext::from_claims(&claims))
}
