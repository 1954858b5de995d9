/// Integration tests for the user model
///
/// Skipped when DATABASE_URL is not set. Every test works with freshly named
/// users so the suite can share one database and run in parallel.

use futures::future::join_all;
use smartrental_shared::auth::password::hash_password;
use smartrental_shared::db::migrations::run_migrations;
use smartrental_shared::db::pool::{create_pool, PoolConfig};
use smartrental_shared::models::user::{
    AdminRegistrationError, CreateUser, Role, UpdateUser, User, EMAIL_CONSTRAINT,
    USERNAME_CONSTRAINT,
};
use sqlx::PgPool;
use uuid::Uuid;

async fn test_pool() -> Option<PgPool> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping database test");
        return None;
    };

    let pool = create_pool(PoolConfig::new(url)).await.expect("Failed to create pool");
    run_migrations(&pool).await.expect("Migrations failed");
    Some(pool)
}

fn new_user(role: Role) -> CreateUser {
    let tag = Uuid::new_v4().simple().to_string();
    CreateUser {
        username: format!("user_{}", &tag[..12]),
        email: format!("{}@example.com", &tag[..12]),
        // Hashing is not what these tests exercise
        password_hash: "$argon2id$v=19$m=65536,t=3,p=4$c2FsdA$aGFzaA".to_string(),
        role,
        phone: None,
        address: None,
    }
}

fn violated_constraint(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) => db_err.constraint().map(str::to_string),
        _ => None,
    }
}

#[tokio::test]
async fn test_create_and_find_user() {
    let Some(pool) = test_pool().await else { return };

    let data = CreateUser {
        phone: Some("0123456789".to_string()),
        ..new_user(Role::Tenant)
    };
    let user = User::create(&pool, data.clone()).await.expect("Create failed");

    assert_eq!(user.username, data.username);
    assert_eq!(user.role, Role::Tenant);
    assert_eq!(user.phone.as_deref(), Some("0123456789"));
    assert!(user.is_active);
    assert!(user.last_login_at.is_none());

    let found = User::find_by_id(&pool, user.id).await.unwrap().expect("User not found");
    assert_eq!(found.email, data.email);
}

#[tokio::test]
async fn test_duplicate_username_and_email_hit_constraints() {
    let Some(pool) = test_pool().await else { return };

    let data = new_user(Role::Owner);
    User::create(&pool, data.clone()).await.expect("Create failed");

    let same_username = CreateUser {
        email: format!("other_{}", data.email),
        ..data.clone()
    };
    let err = User::create(&pool, same_username).await.unwrap_err();
    assert_eq!(violated_constraint(&err).as_deref(), Some(USERNAME_CONSTRAINT));

    let same_email_other_case = CreateUser {
        username: format!("{}_2", data.username),
        email: data.email.to_uppercase(),
        ..data.clone()
    };
    let err = User::create(&pool, same_email_other_case).await.unwrap_err();
    assert_eq!(violated_constraint(&err).as_deref(), Some(EMAIL_CONSTRAINT));
}

#[tokio::test]
async fn test_taken_checks() {
    let Some(pool) = test_pool().await else { return };

    let user = User::create(&pool, new_user(Role::Tenant)).await.unwrap();

    assert!(User::username_taken(&pool, &user.username, None).await.unwrap());
    assert!(!User::username_taken(&pool, &user.username, Some(user.id)).await.unwrap());
    assert!(User::email_taken(&pool, &user.email.to_uppercase(), None).await.unwrap());
    assert!(!User::email_taken(&pool, &user.email, Some(user.id)).await.unwrap());
    assert!(!User::username_taken(&pool, "no_such_user_anywhere", None).await.unwrap());
}

#[tokio::test]
async fn test_find_by_identifier() {
    let Some(pool) = test_pool().await else { return };

    let user = User::create(&pool, new_user(Role::Owner)).await.unwrap();

    let by_email = User::find_by_identifier(&pool, &user.email.to_uppercase()).await.unwrap();
    assert_eq!(by_email.map(|u| u.id), Some(user.id));

    let by_username = User::find_by_identifier(&pool, &format!("  {} ", user.username))
        .await
        .unwrap();
    assert_eq!(by_username.map(|u| u.id), Some(user.id));

    assert!(User::find_by_identifier(&pool, "").await.unwrap().is_none());
    assert!(User::find_by_identifier(&pool, "ghost@example.com").await.unwrap().is_none());
}

#[tokio::test]
async fn test_partial_update_changes_only_given_fields() {
    let Some(pool) = test_pool().await else { return };

    let data = CreateUser {
        phone: Some("0987654321".to_string()),
        ..new_user(Role::Tenant)
    };
    let user = User::create(&pool, data).await.unwrap();

    let update = UpdateUser {
        address: Some(Some("12 Harbour Road".to_string())),
        ..Default::default()
    };
    let updated = User::update_managed(&pool, user.id, update)
        .await
        .unwrap()
        .expect("User should be updatable");

    assert_eq!(updated.address.as_deref(), Some("12 Harbour Road"));
    assert_eq!(updated.username, user.username);
    assert_eq!(updated.email, user.email);
    assert_eq!(updated.phone, user.phone);
    assert_eq!(updated.role, user.role);
    assert!(updated.updated_at >= user.updated_at);

    let cleared = User::update_managed(
        &pool,
        user.id,
        UpdateUser {
            phone: Some(None),
            role: Some(Role::Owner),
            is_active: Some(false),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();

    assert!(cleared.phone.is_none());
    assert_eq!(cleared.address.as_deref(), Some("12 Harbour Road"));
    assert_eq!(cleared.role, Role::Owner);
    assert!(!cleared.is_active);
}

#[tokio::test]
async fn test_update_unknown_user_returns_none() {
    let Some(pool) = test_pool().await else { return };

    let result = User::update_managed(
        &pool,
        Uuid::new_v4(),
        UpdateUser {
            address: Some(Some("nowhere".to_string())),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert!(result.is_none());
}

#[tokio::test]
async fn test_managed_listing_and_role_filter() {
    let Some(pool) = test_pool().await else { return };

    let owner = User::create(&pool, new_user(Role::Owner)).await.unwrap();
    let tenant = User::create(&pool, new_user(Role::Tenant)).await.unwrap();

    let everyone = User::list_managed(&pool, None).await.unwrap();
    assert!(everyone.iter().all(|u| u.role != Role::Admin));
    assert!(everyone.iter().any(|u| u.id == owner.id));
    assert!(everyone.iter().any(|u| u.id == tenant.id));

    let tenants = User::list_managed(&pool, Some(Role::Tenant)).await.unwrap();
    assert!(tenants.iter().all(|u| u.role == Role::Tenant));
    assert!(!tenants.iter().any(|u| u.id == owner.id));

    assert!(User::find_managed(&pool, owner.id, Some(Role::Tenant)).await.unwrap().is_none());
    assert!(User::find_managed(&pool, owner.id, None).await.unwrap().is_some());
}

#[tokio::test]
async fn test_delete_managed() {
    let Some(pool) = test_pool().await else { return };

    let user = User::create(&pool, new_user(Role::Tenant)).await.unwrap();

    assert!(User::delete_managed(&pool, user.id).await.unwrap());
    assert!(User::find_managed(&pool, user.id, None).await.unwrap().is_none());
    assert!(!User::delete_managed(&pool, user.id).await.unwrap());
    assert!(!User::delete_managed(&pool, Uuid::new_v4()).await.unwrap());
}

#[tokio::test]
async fn test_update_last_login() {
    let Some(pool) = test_pool().await else { return };

    let user = User::create(&pool, new_user(Role::Owner)).await.unwrap();
    assert!(User::update_last_login(&pool, user.id).await.unwrap());

    let user = User::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert!(user.last_login_at.is_some());
}

#[tokio::test]
async fn test_concurrent_admin_registration_yields_one_admin() {
    let Some(pool) = test_pool().await else { return };

    let had_admin = User::admin_exists(&pool).await.unwrap();

    let attempts = (0..8).map(|_| {
        let pool = pool.clone();
        async move {
            // Requested role is overridden
            User::create_sole_admin(&pool, new_user(Role::Tenant)).await
        }
    });
    let results = join_all(attempts).await;

    let created: Vec<&User> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(AdminRegistrationError::AdminExists)))
        .count();

    if had_admin {
        assert!(created.is_empty());
    } else {
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].role, Role::Admin);
    }
    assert_eq!(created.len() + rejected, results.len());
    assert_eq!(User::count_by_role(&pool, Role::Admin).await.unwrap(), 1);

    // Management operations never see the admin
    let admin_id: Uuid = sqlx::query_scalar("SELECT id FROM users WHERE role = 'admin'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(User::find_managed(&pool, admin_id, None).await.unwrap().is_none());
    assert!(!User::delete_managed(&pool, admin_id).await.unwrap());
}

#[tokio::test]
async fn test_real_password_hash_is_stored_verbatim() {
    let Some(pool) = test_pool().await else { return };

    let hash = hash_password("Tenant#2024").unwrap();
    let user = User::create(
        &pool,
        CreateUser {
            password_hash: hash.clone(),
            ..new_user(Role::Tenant)
        },
    )
    .await
    .unwrap();

    assert_eq!(user.password_hash, hash);
}
