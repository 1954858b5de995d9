/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use smartrental_api::{app::{build_router, AppState}, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let app = build_router(AppState::new(pool, config));
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer, routes};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state, Next},
    response::Response,
    routing::{get, post},
    Extension, Router,
};
use smartrental_shared::auth::{
    authorization::require_admin,
    jwt::TokenLifetimes,
    middleware::{authenticate, AuthContext},
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    /// HS256 signing key
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    pub fn token_lifetimes(&self) -> TokenLifetimes {
        self.config.jwt.lifetimes()
    }
}

/// Builds the router with all routes and middleware
///
/// ```text
/// /
/// ├── GET    /health                 public
/// ├── POST   /register/              public, sole admin
/// ├── POST   /login/                 public, admin portal
/// ├── POST   /tenant_register/       public
/// ├── POST   /login-user/            public, owner/tenant portal
/// ├── POST   /token/refresh/         public
/// ├── GET    /me/                    any authenticated user
/// ├── POST   /owner_register/        admin
/// └── /admin/                        admin
///     ├── GET            /users/?role=
///     ├── GET|PUT|DELETE /users/:id/
///     ├── GET            /tenants/
///     └── GET            /tenants/:id/
/// ```
///
/// Outermost first: security headers, CORS, tracing, then per-route
/// authentication and the admin gate.
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/register/", post(routes::auth::register_admin))
        .route("/login/", post(routes::auth::login_admin))
        .route("/tenant_register/", post(routes::auth::register_tenant))
        .route("/login-user/", post(routes::auth::login_user))
        .route("/token/refresh/", post(routes::auth::refresh));

    let authenticated_routes = Router::new()
        .route("/me/", get(routes::auth::me))
        .layer(from_fn_with_state(state.clone(), jwt_auth_layer));

    let admin_routes = Router::new()
        .route("/owner_register/", post(routes::auth::register_owner))
        .route("/admin/users/", get(routes::admin::list_users))
        .route(
            "/admin/users/:id/",
            get(routes::admin::get_user)
                .put(routes::admin::update_user)
                .delete(routes::admin::delete_user),
        )
        .route("/admin/tenants/", get(routes::admin::list_tenants))
        .route("/admin/tenants/:id/", get(routes::admin::get_tenant))
        .layer(from_fn(admin_gate))
        .layer(from_fn_with_state(state.clone(), jwt_auth_layer));

    let cors = cors_layer(&state.config.api.cors_origins);

    Router::new()
        .merge(public_routes)
        .merge(authenticated_routes)
        .merge(admin_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Validates the Bearer access token and stores the [`AuthContext`]
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth = authenticate(req.headers(), state.jwt_secret())?;

    req.extensions_mut().insert(auth);

    Ok(next.run(req).await)
}

/// Lets only the admin through; runs after [`jwt_auth_layer`]
async fn admin_gate(
    Extension(auth): Extension<AuthContext>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Err(e) = require_admin(&auth) {
        tracing::warn!(user_id = %auth.user_id, error = %e, "Admin route refused");
        return Err(e.into());
    }

    Ok(next.run(req).await)
}
