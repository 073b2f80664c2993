//! Shared fixtures for async tests.

use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicU16, Ordering},
        Arc, Mutex,
    },
};

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde_json::Value;

/// Serves `router` on an ephemeral localhost port for the rest of the test.
pub async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("test server");
    });
    addr
}

/// Fake attendance endpoint that keeps every JSON body it receives and
/// answers with a fixed status.
#[derive(Clone)]
pub struct RecordingEndpoint {
    bodies: Arc<Mutex<Vec<Value>>>,
    status: Arc<AtomicU16>,
}

impl RecordingEndpoint {
    pub fn with_status(status: u16) -> Self {
        Self {
            bodies: Arc::new(Mutex::new(Vec::new())),
            status: Arc::new(AtomicU16::new(status)),
        }
    }

    /// Starts the server and returns the URL to POST to.
    pub async fn start(&self) -> String {
        let router = Router::new()
            .route("/api/attendance", post(record_body))
            .with_state(self.clone());
        let addr = serve(router).await;
        format!("http://{addr}/api/attendance")
    }

    pub fn bodies(&self) -> Vec<Value> {
        self.bodies.lock().expect("bodies lock").clone()
    }
}

async fn record_body(
    State(endpoint): State<RecordingEndpoint>,
    Json(body): Json<Value>,
) -> StatusCode {
    endpoint.bodies.lock().expect("bodies lock").push(body);
    StatusCode::from_u16(endpoint.status.load(Ordering::SeqCst))
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}
