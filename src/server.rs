use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::pipeline::Reader;
use crate::response::http_response;

pub fn router(reader: Arc<Reader>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/read", post(read_endpoint))
        .with_state(reader)
}

pub async fn serve(reader: Arc<Reader>, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router(reader))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

async fn read_endpoint(State(reader): State<Arc<Reader>>, Json(args): Json<Value>) -> Response {
    match reader.read_arguments(&args).await {
        Ok(result) => (StatusCode::OK, Json(http_response(result))).into_response(),
        Err(e) => (e.status(), Json(json!({"error": e.to_string()}))).into_response(),
    }
}
