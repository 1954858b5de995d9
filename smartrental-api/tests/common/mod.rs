//! Shared helpers for router-level tests
//!
//! `TestContext::without_database` builds the full router over a lazily
//! connected pool, which is enough for anything rejected before a query
//! runs. `TestContext::with_database` needs DATABASE_URL and returns None
//! when it is unset, so database tests skip themselves.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use smartrental_api::app::{build_router, AppState};
use smartrental_api::config::{ApiConfig, Config, DatabaseConfig, JwtConfig};
use smartrental_shared::auth::jwt::{create_token, Claims, TokenType};
use smartrental_shared::db::migrations::run_migrations;
use smartrental_shared::db::pool::{create_lazy_pool, create_pool, PoolConfig};
use smartrental_shared::models::user::Role;
use sqlx::PgPool;
use tower::Service as _;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-secret-key-at-least-32-bytes-long";

/// A password that satisfies the strength rules
pub const PASSWORD: &str = "Rent#2024ok";

pub struct TestContext {
    pub db: PgPool,
    pub app: Router,
}

fn test_config(database_url: &str) -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            production: false,
        },
        database: DatabaseConfig {
            url: database_url.to_string(),
            max_connections: 5,
        },
        jwt: JwtConfig {
            secret: JWT_SECRET.to_string(),
            access_ttl_minutes: 60,
            refresh_ttl_days: 7,
        },
    }
}

impl TestContext {
    pub fn without_database() -> Self {
        let config = test_config("postgresql://nobody@127.0.0.1:1/unreachable");
        let pool = create_lazy_pool(&PoolConfig {
            min_connections: 0,
            acquire_timeout_seconds: 1,
            ..config.database.pool_config()
        })
        .expect("lazy pool");

        Self {
            app: build_router(AppState::new(pool.clone(), config)),
            db: pool,
        }
    }

    pub async fn with_database() -> Option<Self> {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set, skipping database test");
            return None;
        };

        let config = test_config(&url);
        let pool = create_pool(config.database.pool_config())
            .await
            .expect("Failed to create pool");
        run_migrations(&pool).await.expect("Migrations failed");

        Some(Self {
            app: build_router(AppState::new(pool.clone(), config)),
            db: pool,
        })
    }

    /// Sends a request and returns the status and the JSON body (Null if empty)
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().call(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    /// Registers a tenant and returns `(id, username, email)`
    pub async fn register_tenant(&self) -> (Uuid, String, String) {
        let (username, email) = unique_credentials();
        let (status, body) = self
            .post(
                "/tenant_register/",
                None,
                json!({ "username": username, "email": email, "password": PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);

        (user_id(&body), username, email)
    }

    /// Provisions an owner through the admin endpoint and returns `(id, username, email)`
    pub async fn register_owner(&self) -> (Uuid, String, String) {
        let (username, email) = unique_credentials();
        let (status, body) = self
            .post(
                "/owner_register/",
                Some(&admin_token()),
                json!({ "username": username, "email": email, "password": PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);

        (user_id(&body), username, email)
    }
}

pub fn unique_credentials() -> (String, String) {
    let tag = Uuid::new_v4().simple().to_string();
    (format!("user_{}", &tag[..12]), format!("{}@example.com", &tag[..12]))
}

pub fn user_id(body: &Value) -> Uuid {
    body["user"]["id"]
        .as_str()
        .and_then(|id| Uuid::parse_str(id).ok())
        .expect("response has user.id")
}

/// Access token for an arbitrary user with `role`
///
/// The auth layer trusts the role claim, so no matching row is needed.
pub fn token_for(role: Role) -> String {
    create_token(&Claims::new(Uuid::new_v4(), role, TokenType::Access), JWT_SECRET).unwrap()
}

pub fn admin_token() -> String {
    token_for(Role::Admin)
}
