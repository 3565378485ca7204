use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::config::{ensure_db_dir, LeadlineConfig};
use crate::ingest::IngestService;
use crate::provision::Provisioner;
use crate::storage::{FallbackChain, FileStore, SqliteStore};

pub mod error;
pub mod extract;
pub mod routes;

/// Server state
pub struct AppState {
    pub ingest: IngestService,
    /// Relational Store used by the admin listing
    pub store: Option<SqliteStore>,
    pub admin_token: Option<String>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(ingest: IngestService, admin_token: Option<String>) -> Self {
        let store = ingest.chain().relational().cloned();
        Self {
            ingest,
            store,
            admin_token,
            started_at: Instant::now(),
        }
    }
}

/// Stores, chain and provisioner wired together from configuration
pub struct Components {
    pub state: Arc<AppState>,
    pub provisioner: Provisioner,
}

pub fn compose(config: &LeadlineConfig) -> Components {
    let relational = if config.database.enabled {
        if let Err(e) = ensure_db_dir(&config.database.path) {
            tracing::warn!("Could not create database directory: {}", e);
        }
        Some(SqliteStore::open(config.database.pool_config()))
    } else {
        None
    };

    let file = FileStore::new(&config.fallback.path);
    let chain = FallbackChain::standard(relational.clone(), file);
    let ingest = IngestService::new(chain);

    Components {
        state: Arc::new(AppState::new(ingest, config.admin.token.clone())),
        provisioner: Provisioner::new(relational),
    }
}

pub fn build_router(state: Arc<AppState>, static_dir: Option<&Path>, cors: bool) -> Router {
    let mut app = Router::new()
        .route("/health", get(routes::health))
        .route("/api/submit-form", post(routes::submit_form));

    if state.admin_token.is_some() {
        app = app.route("/api/submissions", get(routes::list_submissions));
    } else {
        tracing::info!("No admin token configured, /api/submissions is disabled");
    }

    let mut app = match static_dir.filter(|dir| dir.is_dir()) {
        Some(dir) => app.fallback_service(
            ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html"))),
        ),
        None => app.fallback(routes::not_found),
    }
    .layer(TraceLayer::new_for_http());

    if cors {
        app = app.layer(CorsLayer::permissive());
    }

    app.with_state(state)
}

pub async fn start_server(config: &LeadlineConfig) -> anyhow::Result<()> {
    let Components { state, provisioner } = compose(config);

    let app = build_router(
        Arc::clone(&state),
        config.server.static_dir.as_deref(),
        config.server.cors,
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("Server failed to start on {}: {}", addr, e))?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    // After bind, never before: requests are served while the table is created.
    provisioner.spawn();

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => tracing::info!("SIGTERM received, shutting down..."),
                    _ = tokio::signal::ctrl_c() => tracing::info!("Interrupt received, shutting down..."),
                }
            }
            Err(e) => {
                tracing::warn!("Could not register SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Interrupt received, shutting down...");
    }
}
