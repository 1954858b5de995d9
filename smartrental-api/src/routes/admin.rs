/// Admin management of owners and tenants
///
/// Every route here sits behind the admin gate in [`crate::app`]. The admin
/// account itself is out of reach: lookups, updates, and deletes only match
/// owners and tenants, so an admin ID answers 404.
///
/// # Endpoints
///
/// - `GET /admin/users/?role=owner|tenant`
/// - `GET /admin/users/:id/`
/// - `PUT /admin/users/:id/`
/// - `DELETE /admin/users/:id/`
/// - `GET /admin/tenants/`
/// - `GET /admin/tenants/:id/`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, EMAIL_TAKEN, USERNAME_TAKEN},
    extract::ValidJson,
};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Deserializer, Serialize};
use smartrental_shared::{
    auth::middleware::AuthContext,
    models::user::{Role, UpdateUser, User},
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::{normalize_email, normalize_optional, normalize_username, not_blank, UserView};

const USER_NOT_FOUND: &str = "User not found.";
const TENANT_NOT_FOUND: &str = "Tenant not found.";

/// Query string for `GET /admin/users/`
#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    pub role: Option<String>,
}

impl ListUsersQuery {
    fn role(&self) -> ApiResult<Option<Role>> {
        match self.role.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some("owner") => Ok(Some(Role::Owner)),
            Some("tenant") => Ok(Some(Role::Tenant)),
            Some(_) => Err(ApiError::invalid_field(
                "role",
                "Role filter must be owner or tenant.",
            )),
        }
    }
}

/// Partial update; absent fields are left unchanged
///
/// `phone` and `address` may be `null` to clear them.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(
        custom(function = "not_blank"),
        length(max = 150, message = "Username must be at most 150 characters")
    )]
    pub username: Option<String>,

    #[validate(
        email(message = "Enter a valid email address."),
        length(max = 254, message = "Email must be at most 254 characters")
    )]
    pub email: Option<String>,

    #[serde(default, deserialize_with = "deserialize_some")]
    #[validate(length(max = 15, message = "Phone must be at most 15 characters"))]
    pub phone: Option<Option<String>>,

    #[serde(default, deserialize_with = "deserialize_some")]
    #[validate(length(max = 255, message = "Address must be at most 255 characters"))]
    pub address: Option<Option<String>>,

    pub is_active: Option<bool>,

    pub role: Option<Role>,
}

/// Distinguishes an explicit `null` (`Some(None)`) from a missing field (`None`)
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl UpdateUserRequest {
    fn into_update(self) -> ApiResult<UpdateUser> {
        if let Some(role) = self.role {
            if !role.is_managed() {
                return Err(ApiError::invalid_field("role", "Role must be owner or tenant."));
            }
        }

        Ok(UpdateUser {
            username: self.username.as_deref().map(normalize_username),
            email: self.email.as_deref().map(normalize_email),
            phone: self.phone.map(normalize_optional),
            address: self.address.map(normalize_optional),
            is_active: self.is_active,
            role: self.role,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserListResponse {
    pub users: Vec<UserView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TenantListResponse {
    pub tenants: Vec<UserView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub user: UserView,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TenantResponse {
    pub tenant: UserView,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserUpdatedResponse {
    pub message: String,
    pub user: UserView,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// IDs that are not UUIDs cannot name a user
fn parse_id(raw: &str, not_found: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::NotFound(not_found.to_string()))
}

/// List owners and tenants
///
/// # Response
///
/// ```json
/// {
///   "users": [
///     {
///       "id": "uuid",
///       "username": "tenant1",
///       "email": "tenant1@example.com",
///       "role": "tenant",
///       "phone": null,
///       "address": "12 Harbour Road",
///       "is_active": true,
///       "created_at": "2025-01-01T00:00:00Z",
///       "updated_at": "2025-01-01T00:00:00Z",
///       "last_login_at": null
///     }
///   ]
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: `role` is neither `owner` nor `tenant`
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> ApiResult<Json<UserListResponse>> {
    let users = User::list_managed(&state.db, query.role()?).await?;

    Ok(Json(UserListResponse {
        users: users.into_iter().map(UserView::from).collect(),
    }))
}

/// Fetch one owner or tenant
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<UserResponse>> {
    let id = parse_id(&id, USER_NOT_FOUND)?;

    let user = User::find_managed(&state.db, id, None)
        .await?
        .ok_or_else(|| ApiError::NotFound(USER_NOT_FOUND.to_string()))?;

    Ok(Json(UserResponse {
        user: UserView::from(user),
    }))
}

/// Partially update an owner or tenant
///
/// # Endpoint
///
/// ```text
/// PUT /admin/users/:id/
/// Content-Type: application/json
///
/// { "address": "12 Harbour Road", "phone": null }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Invalid field, admin role requested, or username/email taken
/// - `404 Not Found`: No owner or tenant with this ID
pub async fn update_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<UpdateUserRequest>,
) -> ApiResult<Json<UserUpdatedResponse>> {
    let id = parse_id(&id, USER_NOT_FOUND)?;
    let update = req.into_update()?;

    if let Some(username) = &update.username {
        if User::username_taken(&state.db, username, Some(id)).await? {
            return Err(ApiError::Duplicate(USERNAME_TAKEN.to_string()));
        }
    }
    if let Some(email) = &update.email {
        if User::email_taken(&state.db, email, Some(id)).await? {
            return Err(ApiError::Duplicate(EMAIL_TAKEN.to_string()));
        }
    }

    let user = User::update_managed(&state.db, id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound(USER_NOT_FOUND.to_string()))?;

    info!(user_id = %user.id, admin_id = %auth.user_id, "User updated by admin");

    Ok(Json(UserUpdatedResponse {
        message: "User updated successfully.".to_string(),
        user: UserView::from(user),
    }))
}

/// Delete an owner or tenant
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let id = parse_id(&id, USER_NOT_FOUND)?;

    if !User::delete_managed(&state.db, id).await? {
        return Err(ApiError::NotFound(USER_NOT_FOUND.to_string()));
    }

    info!(user_id = %id, admin_id = %auth.user_id, "User deleted by admin");

    Ok(Json(MessageResponse {
        message: "User deleted successfully.".to_string(),
    }))
}

/// List tenants only
pub async fn list_tenants(State(state): State<AppState>) -> ApiResult<Json<TenantListResponse>> {
    let tenants = User::list_managed(&state.db, Some(Role::Tenant)).await?;

    Ok(Json(TenantListResponse {
        tenants: tenants.into_iter().map(UserView::from).collect(),
    }))
}

/// Fetch one tenant; owners answer 404 here
pub async fn get_tenant(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<TenantResponse>> {
    let id = parse_id(&id, TENANT_NOT_FOUND)?;

    let tenant = User::find_managed(&state.db, id, Some(Role::Tenant))
        .await?
        .ok_or_else(|| ApiError::NotFound(TENANT_NOT_FOUND.to_string()))?;

    Ok(Json(TenantResponse {
        tenant: UserView::from(tenant),
    }))
}
