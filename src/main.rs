use todo_api::{app, config, store, AppState};

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();
    tracing::info!("Starting Todo API in {:?} mode", config.environment);

    let state = match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let pool = store::postgres::connect(&url)
                .await
                .expect("database connection");
            store::postgres::ensure_schema(&pool)
                .await
                .expect("schema setup");
            AppState::postgres(pool)
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set, falling back to in-memory store");
            AppState::in_memory()
        }
    };

    let app = app(state);

    // Allow tests or deployments to override port via env
    let port = std::env::var("TODO_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("Todo API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}
