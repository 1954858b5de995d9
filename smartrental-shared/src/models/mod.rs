/// Database models for SmartRental
///
/// # Models
///
/// - `user`: User accounts, the role discriminator, and admin-guarded registration
///
/// # Example
///
/// ```no_run
/// use smartrental_shared::models::user::{CreateUser, Role, User};
/// use smartrental_shared::db::pool::{create_pool, PoolConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(PoolConfig::new("postgresql://localhost/smartrental")).await?;
///
/// let new_user = CreateUser {
///     username: "jdoe".to_string(),
///     email: "jdoe@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     role: Role::Tenant,
///     phone: None,
///     address: None,
/// };
///
/// let user = User::create(&pool, new_user).await?;
/// # Ok(())
/// # }
/// ```

pub mod user;
