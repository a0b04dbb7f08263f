//! HTTP route assembly and server lifecycle.

use std::sync::Arc;

use anyhow::Context;
use axum::{response::Json, routing::get, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::{KanbanDb, StoreResult};
use crate::status::{CommandSessionSource, SessionSource};

use super::ApiError;

use super::boards as boards_api;
use super::status as status_api;
use super::subtasks as subtasks_api;
use super::tasks as tasks_api;

/// Shared application state.
pub struct AppState {
    /// The Kanban store
    pub db: Arc<KanbanDb>,
    /// Source of agent sessions for the status probe
    pub status_source: Arc<dyn SessionSource>,
}

impl AppState {
    /// Run a store operation on the blocking pool.
    ///
    /// SQLite calls hold the connection mutex and may wait on `busy_timeout`, so they
    /// stay off the async workers.
    pub async fn with_db<T, F>(&self, op: F) -> Result<T, ApiError>
    where
        F: FnOnce(&KanbanDb) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        match tokio::task::spawn_blocking(move || op(&db)).await {
            Ok(result) => Ok(result?),
            Err(e) => {
                tracing::error!(error = %e, "Store task failed");
                Err(ApiError::internal("Internal server error"))
            }
        }
    }
}

/// Build the application router around existing state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/status", get(status_api::get_status))
        .nest("/api/boards", boards_api::routes())
        .nest("/api/tasks", tasks_api::routes())
        .nest("/api/subtasks", subtasks_api::routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    // Schema setup and seeding happen here, once, before any request is served.
    let db = KanbanDb::open(&config.db_path)
        .with_context(|| format!("Failed to open database at {}", config.db_path.display()))?;
    tracing::info!("Opened database at {}", config.db_path.display());

    let status_source: Arc<dyn SessionSource> =
        Arc::new(CommandSessionSource::new(config.status_command.clone()));

    let state = Arc::new(AppState {
        db: Arc::new(db),
        status_source,
    });

    let app = router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Kanban server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, stopping server");
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
