//! `tcc serve` command: a minimal read-only admin HTTP API over the
//! transaction record store, plus a fire-and-forget execute endpoint.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use tcc_core::component::ComponentRegistry;
use tcc_core::engine::Engine;
use tcc_core::loader::{create_flow_loader, FlowSource};
use tcc_core::store::PgRecordStore;
use tcc_db::queries::tx_records;

use crate::components::build_registry;

const RECENT_LIMIT: i64 = 50;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn internal(err: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("{err:#}"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct ExecuteResponse {
    pub tx_id: Uuid,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(pool: PgPool) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/transactions", get(list_transactions))
        .route("/api/transactions/{id}", get(get_transaction))
        .route("/api/components", get(list_components))
        .route("/api/flows/{id}/execute", post(execute_flow))
        .layer(CorsLayer::permissive())
        .with_state(pool)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(pool: PgPool, bind: &str, port: u16) -> Result<()> {
    let app = build_router(pool);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!("tcc serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("tcc serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn index() -> axum::response::Response {
    let html = "<!DOCTYPE html>\
<html><head><title>tcc</title></head><body>\
<h1>tcc</h1>\
<p><a href=\"/api/transactions\">/api/transactions</a> | \
<a href=\"/api/components\">/api/components</a></p>\
</body></html>";
    Html(html).into_response()
}

async fn list_transactions(State(pool): State<PgPool>) -> Result<axum::response::Response, AppError> {
    let records = tx_records::list_recent(&pool, RECENT_LIMIT)
        .await
        .map_err(AppError::internal)?;
    Ok(Json(records).into_response())
}

async fn get_transaction(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<axum::response::Response, AppError> {
    let record = tx_records::get(&pool, id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("transaction {id} not found")))?;

    Ok(Json(record).into_response())
}

async fn list_components(State(pool): State<PgPool>) -> Result<axum::response::Response, AppError> {
    let registry = build_registry(pool);
    Ok(Json(registry.list_ids()).into_response())
}

/// Fires a transaction and returns its id immediately; runtime
/// transaction failures do not propagate as an HTTP error here -- the
/// caller is expected to poll `GET /api/transactions/:id` for the
/// terminal phase.
async fn execute_flow(
    State(pool): State<PgPool>,
    Path(flow_id): Path<String>,
    body: Option<Json<ExecuteRequest>>,
) -> Result<axum::response::Response, AppError> {
    let params = body.map(|Json(req)| req.params).unwrap_or(serde_json::Value::Null);

    let registry: Arc<ComponentRegistry> = Arc::new(build_registry(pool.clone()));
    let loader = create_flow_loader(FlowSource::Database(pool.clone()));
    let store = Arc::new(PgRecordStore::new(pool));
    let engine = Engine::new(loader, registry, store);

    let tx_id = engine
        .execute_transaction(&flow_id, params, tokio_util::sync::CancellationToken::new())
        .await
        .map_err(|e| AppError::bad_request(e.to_string()))?;

    Ok(Json(ExecuteResponse { tx_id }).into_response())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use sqlx::PgPool;
    use tower::ServiceExt;

    use tcc_db::queries::flows;
    use tcc_test_utils::{create_test_db, drop_test_db};

    async fn send_request(pool: PgPool, uri: &str) -> axum::response::Response {
        let app = super::build_router(pool);
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1_048_576).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_index_returns_html() {
        let (pool, db_name) = create_test_db().await;

        let resp = send_request(pool.clone(), "/").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp
            .headers()
            .get("content-type")
            .expect("should have content-type header")
            .to_str()
            .unwrap();
        assert!(content_type.contains("text/html"));

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_list_transactions_empty() {
        let (pool, db_name) = create_test_db().await;

        let resp = send_request(pool.clone(), "/api/transactions").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json, serde_json::json!([]));

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_get_transaction_not_found() {
        let (pool, db_name) = create_test_db().await;

        let random_id = uuid::Uuid::new_v4();
        let resp = send_request(pool.clone(), &format!("/api/transactions/{random_id}")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_list_components_returns_sorted_reference_ids() {
        let (pool, db_name) = create_test_db().await;

        let resp = send_request(pool.clone(), "/api/components").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json, serde_json::json!(["db", "http", "mq"]));

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_execute_flow_unknown_flow_returns_bad_request() {
        let (pool, db_name) = create_test_db().await;

        let app = super::build_router(pool.clone());
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/flows/missing-flow/execute")
                    .header("content-type", "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_execute_flow_with_empty_actions_commits() {
        let (pool, db_name) = create_test_db().await;

        let definition = serde_json::json!({ "name": "noop-flow", "actions": [] }).to_string();
        flows::upsert(&pool, "noop-flow", &definition).await.unwrap();

        let app = super::build_router(pool.clone());
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/flows/noop-flow/execute")
                    .header("content-type", "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert!(json.get("tx_id").is_some());

        pool.close().await;
        drop_test_db(&db_name).await;
    }
}
