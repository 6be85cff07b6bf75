pub mod response;

use crate::config::Config;
use crate::features::{self, FeatureState};
use crate::ingest::{PgRecordSink, PgSchemaStore};
use crate::middleware;
use axum::{response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use sqlx::PgPool;
use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;

/// Build the full application router with middleware
pub fn create_router(state: FeatureState, config: &Config) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", features::router(state))
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

/// Serve the API over PostgreSQL-backed stores until `shutdown` resolves.
pub async fn serve(
    config: Config,
    pool: PgPool,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let state = FeatureState::new(
        Arc::new(PgSchemaStore::new(pool.clone())),
        Arc::new(PgRecordSink::new(pool)),
        &config.ingest,
    );
    let app = create_router(state, &config);

    let addr: SocketAddr = config.bind_address().parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    let drain = Duration::from_secs(config.server.shutdown_timeout_secs);
    serve_until(listener, app, shutdown, drain).await
}

/// Serve `app` on `listener` until `shutdown` resolves, then give open
/// connections at most `drain` to finish.
pub async fn serve_until(
    listener: TcpListener,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
    drain: Duration,
) -> anyhow::Result<()> {
    let (signalled_tx, signalled_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            let _ = signalled_tx.send(());
        })
        .into_future();

    let drain_elapsed = async move {
        match signalled_rx.await {
            Ok(()) => tokio::time::sleep(drain).await,
            Err(_) => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        result = server => result?,
        _ = drain_elapsed => {
            tracing::warn!(drain_secs = drain.as_secs(), "Shutdown drain timed out, dropping open connections");
        },
    }

    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}
