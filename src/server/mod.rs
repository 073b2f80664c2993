//! Attendance web service: receives mirrored scans and serves the log.

pub mod routes;

use std::future::Future;

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use log::info;

use crate::db::Database;

#[derive(Clone)]
pub struct ServerState {
    pub db: Database,
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route(
            "/api/attendance",
            get(routes::list_attendance).post(routes::create_attendance),
        )
        .route("/api/attendance/:student_id", get(routes::student_attendance))
        .route("/api/summary", get(routes::attendance_summary))
        .with_state(state)
}

/// Serves the API on `bind` until `shutdown` resolves.
pub async fn serve(
    bind: &str,
    db: Database,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    info!("Server running at http://{}", listener.local_addr()?);

    axum::serve(listener, router(ServerState { db }))
        .with_graceful_shutdown(shutdown)
        .await
        .context("attendance server failed")
}
