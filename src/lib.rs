use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{delete, get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod store;

use handlers::{todos, users};
use store::{MemoryStore, TodoStore, UserStore};

/// Shared request state: the two external store collaborators.
///
/// The stores are the only cross-request state besides the read-only
/// config singleton; requests never share anything else.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub todos: Arc<dyn TodoStore>,
}

impl AppState {
    pub fn new(users: Arc<dyn UserStore>, todos: Arc<dyn TodoStore>) -> Self {
        Self { users, todos }
    }

    /// Postgres-backed state sharing one pool across both stores
    pub fn postgres(pool: sqlx::PgPool) -> Self {
        Self {
            users: Arc::new(store::postgres::PgUserStore::new(pool.clone())),
            todos: Arc::new(store::postgres::PgTodoStore::new(pool)),
        }
    }

    /// In-process state for development and tests
    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            users: store.clone(),
            todos: store,
        }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        // Public
        .merge(public_routes())
        // Protected (session auth required)
        .merge(protected_routes(state.clone()))
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        // Token acquisition
        .route("/users", post(users::register))
        .route("/users/login", post(users::login))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/todos", post(todos::create).get(todos::list))
        .route(
            "/todos/:id",
            get(todos::get).patch(todos::update).delete(todos::remove),
        )
        .route("/users/me", get(users::me))
        .route("/users/me/token", delete(users::logout))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ))
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "name": "Todo API (Rust)",
        "version": version,
        "description": "Personal to-do backend with token sessions (Axum)",
        "endpoints": {
            "home": "/ (public)",
            "health": "/health (public)",
            "users": "POST /users, POST /users/login (public - token acquisition)",
            "me": "GET /users/me, DELETE /users/me/token (protected)",
            "todos": "/todos[/:id] (protected, owner-scoped)",
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.users.ping().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "store": "ok"
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "degraded",
                "timestamp": now,
                "store_error": e.to_string()
            })),
        ),
    }
}
