/// User model and database operations
///
/// A single `users` table holds every account. The `role` column decides what
/// the account may do: there is exactly one admin, any number of owners (who
/// list properties) and tenants (who rent them).
///
/// # Schema
///
/// ```sql
/// CREATE TYPE user_role AS ENUM ('admin', 'owner', 'tenant');
///
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     username VARCHAR(150) NOT NULL UNIQUE,
///     email VARCHAR(254) NOT NULL,
///     password_hash VARCHAR(255) NOT NULL,
///     role user_role NOT NULL,
///     phone VARCHAR(15),
///     address VARCHAR(255),
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login_at TIMESTAMPTZ
/// );
///
/// CREATE UNIQUE INDEX users_email_key ON users (LOWER(email));
/// CREATE UNIQUE INDEX users_single_admin_idx ON users (role) WHERE role = 'admin';
/// ```
///
/// # Managed users
///
/// Admin management operations (`find_managed`, `list_managed`,
/// `update_managed`, `delete_managed`) only ever see owners and tenants. The
/// admin row is invisible to them, so it cannot be edited or deleted through
/// the management API.
///
/// # Example
///
/// ```no_run
/// use smartrental_shared::models::user::{CreateUser, Role, User};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let user = User::create(&pool, CreateUser {
///     username: "tenant1".to_string(),
///     email: "tenant1@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     role: Role::Tenant,
///     phone: Some("0123456789".to_string()),
///     address: None,
/// }).await?;
///
/// // Login accepts either the email or the username
/// let found = User::find_by_identifier(&pool, "tenant1").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use std::fmt;
use uuid::Uuid;

/// Name of the partial unique index that allows a single admin row
pub const SINGLE_ADMIN_INDEX: &str = "users_single_admin_idx";

/// Unique constraint on `users.username`
pub const USERNAME_CONSTRAINT: &str = "users_username_key";

/// Unique constraint on `users.email`
pub const EMAIL_CONSTRAINT: &str = "users_email_key";

const USER_COLUMNS: &str = "id, username, email, password_hash, role, phone, address, \
                            is_active, created_at, updated_at, last_login_at";

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Platform administrator (at most one)
    Admin,

    /// Property owner
    Owner,

    /// Tenant renting a property
    Tenant,
}

impl Role {
    /// Converts role to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Owner => "owner",
            Role::Tenant => "tenant",
        }
    }

    /// Owners and tenants are the roles an admin manages
    pub fn is_managed(&self) -> bool {
        matches!(self, Role::Owner | Role::Tenant)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User model representing an account of any role
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Unique login name
    pub username: String,

    /// Email address, unique ignoring case
    pub email: String,

    /// Argon2id password hash
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Account role
    pub role: Role,

    /// Optional phone number
    pub phone: Option<String>,

    /// Optional postal address
    pub address: Option<String>,

    /// Inactive accounts cannot log in or refresh tokens
    pub is_active: bool,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,

    /// When the user last logged in (None if never)
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Input for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Login name (already trimmed)
    pub username: String,

    /// Email address (already trimmed and lowercased)
    pub email: String,

    /// Argon2id password hash (NOT plaintext password!)
    pub password_hash: String,

    /// Role of the new account
    pub role: Role,

    /// Optional phone number
    pub phone: Option<String>,

    /// Optional postal address
    pub address: Option<String>,
}

/// Input for updating a managed user
///
/// All fields are optional. Only non-None fields will be updated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    /// New username
    pub username: Option<String>,

    /// New email address
    pub email: Option<String>,

    /// New phone number (use Some(None) to clear)
    pub phone: Option<Option<String>>,

    /// New address (use Some(None) to clear)
    pub address: Option<Option<String>>,

    /// Activate or deactivate the account
    pub is_active: Option<bool>,

    /// Move the account between owner and tenant
    pub role: Option<Role>,
}

/// Error type for sole-admin registration
#[derive(Debug, thiserror::Error)]
pub enum AdminRegistrationError {
    /// An admin account already exists
    #[error("An admin account already exists")]
    AdminExists,

    /// Database error
    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for AdminRegistrationError {
    fn from(err: sqlx::Error) -> Self {
        // Losing the race against the partial unique index means the same thing
        // as failing the existence check
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.constraint() == Some(SINGLE_ADMIN_INDEX) {
                return AdminRegistrationError::AdminExists;
            }
        }
        AdminRegistrationError::Database(err)
    }
}

impl User {
    /// Creates a new user in the database
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Username or email already exists (unique constraint violation)
    /// - `data.role` is admin and an admin already exists
    /// - Database connection fails
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        Self::insert(pool, data).await
    }

    async fn insert<'e, E>(executor: E, data: CreateUser) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO users (username, email, password_hash, role, phone, address) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&query)
            .bind(data.username)
            .bind(data.email)
            .bind(data.password_hash)
            .bind(data.role)
            .bind(data.phone)
            .bind(data.address)
            .fetch_one(executor)
            .await
    }

    /// Creates the one and only admin account
    ///
    /// The check-and-insert runs inside a transaction that first locks the
    /// single row of `admin_registration_guard`. Concurrent registrations queue
    /// on that lock; once the first commits, every later one sees the new admin
    /// and fails with [`AdminRegistrationError::AdminExists`].
    ///
    /// `data.role` is ignored; the account is always created as an admin.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use smartrental_shared::models::user::{AdminRegistrationError, CreateUser, Role, User};
    /// # use sqlx::PgPool;
    /// # async fn example(pool: PgPool, data: CreateUser) -> Result<(), AdminRegistrationError> {
    /// match User::create_sole_admin(&pool, data).await {
    ///     Ok(admin) => println!("Admin {} registered", admin.username),
    ///     Err(AdminRegistrationError::AdminExists) => println!("Please log in instead"),
    ///     Err(e) => return Err(e),
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn create_sole_admin(
        pool: &PgPool,
        mut data: CreateUser,
    ) -> Result<Self, AdminRegistrationError> {
        data.role = Role::Admin;

        let mut tx = pool.begin().await?;

        sqlx::query("SELECT id FROM admin_registration_guard WHERE id = 1 FOR UPDATE")
            .fetch_one(&mut *tx)
            .await?;

        let admin_exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE role = 'admin')")
                .fetch_one(&mut *tx)
                .await?;

        if admin_exists {
            tx.rollback().await?;
            return Err(AdminRegistrationError::AdminExists);
        }

        let admin = Self::insert(&mut *tx, data).await?;
        tx.commit().await?;

        Ok(admin)
    }

    /// Checks whether an admin account exists
    pub async fn admin_exists(pool: &PgPool) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE role = 'admin')")
            .fetch_one(pool)
            .await
    }

    /// Finds a user of any role by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by email address, ignoring case
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)");

        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by exact username
    pub async fn find_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    /// Resolves a login identifier to a user
    ///
    /// The identifier is tried as an email first, then as a username.
    /// Surrounding whitespace is ignored.
    pub async fn find_by_identifier(
        pool: &PgPool,
        identifier: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Ok(None);
        }

        if let Some(user) = Self::find_by_email(pool, identifier).await? {
            return Ok(Some(user));
        }

        Self::find_by_username(pool, identifier).await
    }

    /// Checks whether a username is taken, optionally ignoring one user
    ///
    /// `except` lets an update keep its own username without tripping the check.
    pub async fn username_taken(
        pool: &PgPool,
        username: &str,
        except: Option<Uuid>,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM users WHERE username = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(username)
        .bind(except)
        .fetch_one(pool)
        .await
    }

    /// Checks whether an email is taken, optionally ignoring one user
    pub async fn email_taken(
        pool: &PgPool,
        email: &str,
        except: Option<Uuid>,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM users WHERE LOWER(email) = LOWER($1) AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(email)
        .bind(except)
        .fetch_one(pool)
        .await
    }

    /// Finds an owner or tenant by ID
    ///
    /// Returns None for unknown IDs and for the admin account. When `role` is
    /// given, only a user with that role matches.
    pub async fn find_managed(
        pool: &PgPool,
        id: Uuid,
        role: Option<Role>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE id = $1 AND role <> 'admin' AND ($2::user_role IS NULL OR role = $2)"
        );

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(role)
            .fetch_optional(pool)
            .await
    }

    /// Lists owners and tenants, newest first
    ///
    /// When `role` is given, only users with that role are returned.
    pub async fn list_managed(pool: &PgPool, role: Option<Role>) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE role <> 'admin' AND ($1::user_role IS NULL OR role = $1) \
             ORDER BY created_at DESC"
        );

        sqlx::query_as::<_, User>(&query)
            .bind(role)
            .fetch_all(pool)
            .await
    }

    /// Applies a partial update to an owner or tenant
    ///
    /// Only non-None fields in `data` are written; `updated_at` is always
    /// bumped. Returns None if no managed user has this ID.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The new username or email belongs to another user
    /// - `data.role` is admin (rejected by the single-admin index)
    /// - Database connection fails
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use smartrental_shared::models::user::{User, UpdateUser};
    /// # use sqlx::PgPool;
    /// # use uuid::Uuid;
    /// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
    /// let update = UpdateUser {
    ///     address: Some(Some("12 Harbour Road".to_string())),
    ///     ..Default::default()
    /// };
    ///
    /// if let Some(user) = User::update_managed(&pool, user_id, update).await? {
    ///     println!("Updated {}", user.username);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn update_managed(
        pool: &PgPool,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        // Build dynamic update query based on which fields are present
        let mut query = String::from("UPDATE users SET updated_at = NOW()");
        let mut bind_count = 1;

        let mut push_column = |query: &mut String, column: &str| {
            bind_count += 1;
            query.push_str(&format!(", {} = ${}", column, bind_count));
        };

        if data.username.is_some() {
            push_column(&mut query, "username");
        }
        if data.email.is_some() {
            push_column(&mut query, "email");
        }
        if data.phone.is_some() {
            push_column(&mut query, "phone");
        }
        if data.address.is_some() {
            push_column(&mut query, "address");
        }
        if data.is_active.is_some() {
            push_column(&mut query, "is_active");
        }
        if data.role.is_some() {
            push_column(&mut query, "role");
        }

        query.push_str(&format!(
            " WHERE id = $1 AND role <> 'admin' RETURNING {USER_COLUMNS}"
        ));

        let mut q = sqlx::query_as::<_, User>(&query).bind(id);

        if let Some(username) = data.username {
            q = q.bind(username);
        }
        if let Some(email) = data.email {
            q = q.bind(email);
        }
        if let Some(phone) = data.phone {
            q = q.bind(phone);
        }
        if let Some(address) = data.address {
            q = q.bind(address);
        }
        if let Some(is_active) = data.is_active {
            q = q.bind(is_active);
        }
        if let Some(role) = data.role {
            q = q.bind(role);
        }

        q.fetch_optional(pool).await
    }

    /// Deletes an owner or tenant by ID
    ///
    /// Returns true if a user was deleted, false if no managed user had this
    /// ID (including the admin's ID).
    pub async fn delete_managed(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1 AND role <> 'admin'")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Updates the last login timestamp for a user
    ///
    /// This is typically called after successful authentication.
    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET last_login_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts users holding a role
    pub async fn count_by_role(pool: &PgPool, role: Role) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = $1")
            .bind(role)
            .fetch_one(pool)
            .await
    }
}
