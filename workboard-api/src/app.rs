//! Application state and router
//!
//! # Example
//!
//! ```no_run
//! use workboard_api::{app::{build_router, AppState}, config::Config};
//! use workboard_shared::audit::AuditRecorder;
//! use sqlx::PgPool;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! let pool = PgPool::connect(&config.database.url).await?;
//! let (audit, _writer) = AuditRecorder::spawn(pool.clone(), config.audit.channel_capacity);
//! let app = build_router(AppState::new(pool, config, audit));
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{get, patch, post, put},
    Router,
};
use sqlx::PgPool;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use workboard_shared::audit::AuditRecorder;
use workboard_shared::auth::verifier::{parse_bearer, verify_credential};
use workboard_shared::services::{
    AccountService, ProjectService, SessionService, TaskService, TenantService,
};

use crate::{config::Config, error::ApiError, routes};

/// Shared application state, cloned into every handler
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub audit: AuditRecorder,
    pub tenants: TenantService,
    pub sessions: SessionService,
    pub accounts: AccountService,
    pub projects: ProjectService,
    pub tasks: TaskService,
}

impl AppState {
    pub fn new(db: PgPool, config: Config, audit: AuditRecorder) -> Self {
        let sessions = SessionService::new(
            db.clone(),
            audit.clone(),
            config.jwt.secret.clone(),
            config.jwt.token_ttl(),
        );

        Self {
            tenants: TenantService::new(db.clone(), audit.clone()),
            accounts: AccountService::new(db.clone(), audit.clone()),
            projects: ProjectService::new(db.clone(), audit.clone()),
            tasks: TaskService::new(db.clone(), audit.clone()),
            sessions,
            db,
            config: Arc::new(config),
            audit,
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete router
///
/// ```text
/// /api
/// ├── GET    /health
/// ├── POST   /tenants                      register (public)
/// ├── POST   /auth/login                   (public)
/// ├── GET    /auth/me
/// ├── POST   /auth/logout
/// ├── GET    /tenants                      super_admin
/// ├── GET    /tenants/:id
/// ├── PUT    /tenants/:id
/// ├── POST   /tenants/:id/users
/// ├── GET    /tenants/:id/users
/// ├── PUT    /users/:id
/// ├── DELETE /users/:id
/// ├── POST   /projects
/// ├── GET    /projects
/// ├── PUT    /projects/:id
/// ├── DELETE /projects/:id
/// ├── POST   /projects/:id/tasks
/// ├── GET    /projects/:id/tasks
/// ├── PUT    /tasks/:id
/// └── PATCH  /tasks/:id/status
/// ```
///
/// Everything except health, registration and login sits behind
/// [`jwt_auth_layer`].
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/tenants", post(routes::tenants::register))
        .route("/auth/login", post(routes::auth::login));

    let protected_routes = Router::new()
        .route("/auth/me", get(routes::auth::me))
        .route("/auth/logout", post(routes::auth::logout))
        .route("/tenants", get(routes::tenants::list_tenants))
        .route(
            "/tenants/:tenant_id",
            get(routes::tenants::get_tenant).put(routes::tenants::update_tenant),
        )
        .route(
            "/tenants/:tenant_id/users",
            post(routes::users::create_user).get(routes::users::list_users),
        )
        .route(
            "/users/:user_id",
            put(routes::users::update_user).delete(routes::users::delete_user),
        )
        .route(
            "/projects",
            post(routes::projects::create_project).get(routes::projects::list_projects),
        )
        .route(
            "/projects/:project_id",
            put(routes::projects::update_project).delete(routes::projects::delete_project),
        )
        .route(
            "/projects/:project_id/tasks",
            post(routes::tasks::create_task).get(routes::tasks::list_tasks),
        )
        .route("/tasks/:task_id", put(routes::tasks::update_task))
        .route("/tasks/:task_id/status", patch(routes::tasks::update_task_status))
        .route_layer(middleware::from_fn_with_state(state.clone(), jwt_auth_layer));

    Router::new()
        .nest("/api", public_routes.merge(protected_routes))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.allows_any_origin() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

/// Verifies the bearer token and stores the caller's `AuthContext`
///
/// Role and tenant come from the account row, not the token.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let token = parse_bearer(header)?;
    let ctx = verify_credential(&state.db, token, state.jwt_secret()).await?;

    req.extensions_mut().insert(ctx);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use workboard_shared::db::pool::{create_lazy_pool, PoolConfig};

    /// Router over a pool that never connects
    fn test_app() -> Router {
        let config = test_config();
        let pool = create_lazy_pool(&PoolConfig {
            acquire_timeout: Duration::from_secs(1),
            min_connections: 0,
            ..PoolConfig::new(config.database.url.clone())
        })
        .unwrap();
        let (tx, _rx) = tokio::sync::mpsc::channel(16);

        build_router(AppState::new(pool, config, AuditRecorder::from_sender(tx)))
    }

    async fn send(request: Request<Body>) -> (StatusCode, Value) {
        let response = test_app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_protected_route_requires_token() {
        let (status, body) = send(
            Request::builder()
                .uri("/api/auth/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        assert_eq!(
            body["message"],
            "Authentication required. Please provide a valid token."
        );
    }

    #[tokio::test]
    async fn test_non_bearer_scheme_rejected() {
        let (status, _) = send(
            Request::builder()
                .uri("/api/projects")
                .header("authorization", "Basic dXNlcjpwYXNz")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_garbage_token_rejected() {
        let (status, body) = send(
            Request::builder()
                .method("PATCH")
                .uri(format!("/api/tasks/{}/status", uuid::Uuid::new_v4()))
                .header("authorization", "Bearer not.a.jwt")
                .header("content-type", "application/json")
                .body(Body::from(json!({"status": "completed"}).to_string()))
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid or expired token");
    }

    #[tokio::test]
    async fn test_register_rejects_short_subdomain() {
        let (status, body) = send(post_json(
            "/api/tenants",
            json!({
                "name": "Acme",
                "subdomain": "ab",
                "adminEmail": "a@acme.com",
                "adminPassword": "Password1",
                "adminFullName": "A",
            }),
        ))
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Subdomain must be between 3 and 63 characters");
    }

    #[tokio::test]
    async fn test_register_rejects_malformed_json() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/tenants")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_login_requires_tenant() {
        let (status, body) = send(post_json(
            "/api/auth/login",
            json!({"email": "a@acme.com", "password": "Password1"}),
        ))
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["message"],
            "Email, password, and tenant subdomain or tenant ID are required"
        );
    }

    #[tokio::test]
    async fn test_routes_live_under_api_prefix() {
        let (status, _) = send(
            Request::builder()
                .uri("/auth/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health_reports_disconnected_database() {
        let (status, body) = send(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "degraded");
        assert_eq!(body["data"]["database"], "disconnected");
    }
}
