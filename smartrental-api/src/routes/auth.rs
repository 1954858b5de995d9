/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /register/` - Register the sole admin
/// - `POST /login/` - Admin login
/// - `POST /tenant_register/` - Tenant self-registration
/// - `POST /owner_register/` - Owner provisioning (admin only)
/// - `POST /login-user/` - Owner/tenant login
/// - `POST /token/refresh/` - Exchange a refresh token for an access token
/// - `GET /me/` - The caller's own profile
///
/// Login accepts the identifier under `identifier`, `email`, or `username`;
/// when several are sent the first non-blank one in that order wins. The
/// identifier is matched against emails first, then usernames.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ADMIN_EXISTS, EMAIL_TAKEN, INVALID_CREDENTIALS, USERNAME_TAKEN},
    extract::ValidJson,
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use smartrental_shared::{
    auth::{
        authorization::LoginPortal,
        jwt::{self, TokenPair},
        middleware::AuthContext,
        password,
    },
    models::user::{CreateUser, Role, User},
};
use tracing::{info, warn};
use validator::Validate;

use super::{
    normalize_email, normalize_optional, normalize_username, not_blank, UserSummary, UserView,
};

/// Registration request, shared by all three registration endpoints
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(
        custom(function = "not_blank"),
        length(max = 150, message = "Username must be at most 150 characters")
    )]
    pub username: String,

    #[serde(default)]
    #[validate(
        custom(function = "not_blank"),
        email(message = "Enter a valid email address."),
        length(max = 254, message = "Email must be at most 254 characters")
    )]
    pub email: String,

    #[serde(default)]
    #[validate(
        custom(function = "not_blank"),
        length(max = 128, message = "Password must be at most 128 characters")
    )]
    pub password: String,

    #[validate(length(max = 15, message = "Phone must be at most 15 characters"))]
    pub phone: Option<String>,

    #[validate(length(max = 255, message = "Address must be at most 255 characters"))]
    pub address: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email or username
    #[serde(default)]
    pub identifier: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub password: String,
}

impl LoginRequest {
    /// The first non-blank of `identifier`, `email`, `username`
    fn identifier(&self) -> ApiResult<&str> {
        [&self.identifier, &self.email, &self.username]
            .into_iter()
            .filter_map(|value| value.as_deref().map(str::trim))
            .find(|value| !value.is_empty())
            .ok_or_else(|| ApiError::invalid_field("identifier", "This field may not be blank."))
    }
}

/// Refresh request
#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[serde(default, alias = "refresh_token")]
    #[validate(custom(function = "not_blank"))]
    pub refresh: String,
}

/// Successful registration or login
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub message: String,
    pub user: UserSummary,
    pub tokens: TokenPair,
}

/// Owner provisioned by the admin; no tokens are handed to the admin
#[derive(Debug, Serialize, Deserialize)]
pub struct OwnerRegisteredResponse {
    pub message: String,
    pub user: UserSummary,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub user: UserView,
}

impl RegisterRequest {
    /// Checks password strength and uniqueness, then hashes the password
    async fn into_new_user(self, state: &AppState, role: Role) -> ApiResult<CreateUser> {
        password::validate_password_strength(&self.password)
            .map_err(|msg| ApiError::invalid_field("password", msg))?;

        let username = normalize_username(&self.username);
        let email = normalize_email(&self.email);

        if User::username_taken(&state.db, &username, None).await? {
            return Err(ApiError::Duplicate(USERNAME_TAKEN.to_string()));
        }
        if User::email_taken(&state.db, &email, None).await? {
            return Err(ApiError::Duplicate(EMAIL_TAKEN.to_string()));
        }

        // Hashing is CPU-bound; keep it off the async workers
        let password_hash =
            tokio::task::spawn_blocking(move || password::hash_password(&self.password))
                .await
                .map_err(|e| ApiError::InternalError(format!("Hashing task failed: {}", e)))??;

        Ok(CreateUser {
            username,
            email,
            password_hash,
            role,
            phone: normalize_optional(self.phone),
            address: normalize_optional(self.address),
        })
    }
}

fn issue_tokens(state: &AppState, user: &User) -> ApiResult<TokenPair> {
    Ok(jwt::issue_token_pair(
        user.id,
        user.role,
        state.jwt_secret(),
        &state.token_lifetimes(),
    )?)
}

fn registered(
    message: &str,
    state: &AppState,
    user: &User,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: message.to_string(),
            user: UserSummary::from(user),
            tokens: issue_tokens(state, user)?,
        }),
    ))
}

/// Register the sole admin
///
/// # Endpoint
///
/// ```text
/// POST /register/
/// Content-Type: application/json
///
/// {
///   "username": "admin",
///   "email": "admin@smartrental.io",
///   "password": "Adm1n#Secure",
///   "phone": "0123456789"
/// }
/// ```
///
/// # Response (201)
///
/// ```json
/// {
///   "message": "Admin registered successfully.",
///   "user": { "id": "uuid", "username": "admin", "email": "admin@smartrental.io", "role": "admin" },
///   "tokens": { "access": "eyJ...", "refresh": "eyJ..." }
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed, or username/email taken
/// - `403 Forbidden`: An admin already exists
pub async fn register_admin(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    if User::admin_exists(&state.db).await? {
        warn!("Rejected admin registration: an admin already exists");
        return Err(ApiError::Forbidden(ADMIN_EXISTS.to_string()));
    }

    let data = req.into_new_user(&state, Role::Admin).await?;

    let admin = User::create_sole_admin(&state.db, data).await.map_err(|e| {
        warn!(error = %e, "Admin registration lost the race or failed");
        ApiError::from(e)
    })?;

    info!(user_id = %admin.id, "Admin registered");
    registered("Admin registered successfully.", &state, &admin)
}

/// Tenant self-registration
///
/// Same body and response shape as [`register_admin`].
pub async fn register_tenant(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let data = req.into_new_user(&state, Role::Tenant).await?;
    let tenant = User::create(&state.db, data).await?;

    info!(user_id = %tenant.id, "Tenant registered");
    registered("Tenant registered successfully.", &state, &tenant)
}

/// Owner provisioning by the admin
///
/// Requires an admin access token. Returns the new owner's summary without
/// tokens; the owner logs in through `/login-user/`.
pub async fn register_owner(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidJson(req): ValidJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<OwnerRegisteredResponse>)> {
    let data = req.into_new_user(&state, Role::Owner).await?;
    let owner = User::create(&state.db, data).await?;

    info!(user_id = %owner.id, admin_id = %auth.user_id, "Owner registered by admin");

    Ok((
        StatusCode::CREATED,
        Json(OwnerRegisteredResponse {
            message: "Owner registered successfully by admin.".to_string(),
            user: UserSummary::from(&owner),
        }),
    ))
}

/// Admin login
///
/// # Endpoint
///
/// ```text
/// POST /login/
/// Content-Type: application/json
///
/// { "email": "admin@smartrental.io", "password": "Adm1n#Secure" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Identifier or password missing
/// - `401 Unauthorized`: Unknown identifier, wrong password, or inactive account
/// - `403 Forbidden`: Correct credentials for a non-admin account
pub async fn login_admin(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    login(&state, LoginPortal::Admin, req).await.map(Json)
}

/// Owner and tenant login
///
/// Same contract as [`login_admin`], admitting owners and tenants only.
pub async fn login_user(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    login(&state, LoginPortal::Member, req).await.map(Json)
}

async fn login(state: &AppState, portal: LoginPortal, req: LoginRequest) -> ApiResult<AuthResponse> {
    let invalid = || ApiError::Unauthorized(INVALID_CREDENTIALS.to_string());

    let user = User::find_by_identifier(&state.db, req.identifier()?)
        .await?
        .ok_or_else(|| {
            warn!(?portal, "Login failed: unknown identifier");
            invalid()
        })?;

    let hash = user.password_hash.clone();
    let valid = tokio::task::spawn_blocking(move || password::verify_password(&req.password, &hash))
        .await
        .map_err(|e| ApiError::InternalError(format!("Verification task failed: {}", e)))??;

    if !valid || !user.is_active {
        warn!(user_id = %user.id, ?portal, active = user.is_active, "Login failed");
        return Err(invalid());
    }

    if !portal.admits(user.role) {
        warn!(user_id = %user.id, role = %user.role, ?portal, "Login through the wrong portal");
        let message = match portal {
            LoginPortal::Admin => "This login is only for admin.",
            LoginPortal::Member => "This login is only for owner or tenant.",
        };
        return Err(ApiError::Forbidden(message.to_string()));
    }

    User::update_last_login(&state.db, user.id).await?;

    info!(user_id = %user.id, role = %user.role, "User logged in");

    Ok(AuthResponse {
        message: match portal {
            LoginPortal::Admin => "Admin login successful.",
            LoginPortal::Member => "Login successful.",
        }
        .to_string(),
        user: UserSummary::from(&user),
        tokens: issue_tokens(state, &user)?,
    })
}

/// Exchange a refresh token for a new access token
///
/// The user is re-read so the new token carries the current role, and
/// deleted or deactivated accounts are refused.
///
/// # Endpoint
///
/// ```text
/// POST /token/refresh/
/// Content-Type: application/json
///
/// { "refresh": "eyJ..." }
/// ```
pub async fn refresh(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let claims = jwt::validate_refresh_token(&req.refresh, state.jwt_secret())?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| ApiError::Unauthorized("User not found or inactive.".to_string()))?;

    let access = jwt::create_token(
        &jwt::Claims::with_expiration(
            user.id,
            user.role,
            jwt::TokenType::Access,
            state.token_lifetimes().access,
        )?,
        state.jwt_secret(),
    )?;

    Ok(Json(RefreshResponse { access }))
}

/// The caller's own profile
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<MeResponse>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found.".to_string()))?;

    Ok(Json(MeResponse {
        user: UserView::from(user),
    }))
}
