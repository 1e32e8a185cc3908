//! Read-only REST API over the current ledger view
//!
//! Serves the validation report, the transaction feed and block lookups for
//! whatever snapshot the session currently holds. Every handler works from a
//! single `LedgerView`, so a response never mixes two snapshots.

use axum::{
    extract::{Path, Query, Request, State},
    http::{self, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};

use crate::blockchain::{Block, ValidationReport};
use crate::error::LedgerError;
use crate::index::IndexedTransaction;
use crate::session::{LedgerSession, LedgerSummary, LedgerView};

#[derive(Debug)]
pub enum ApiError {
    Ledger(LedgerError),
    InvalidInput(String),
    NotLoaded,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Ledger(LedgerError::NotFound(msg)) => (StatusCode::NOT_FOUND, msg),
            ApiError::Ledger(e @ LedgerError::MalformedInput(_)) => {
                (StatusCode::BAD_GATEWAY, e.to_string())
            }
            ApiError::Ledger(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotLoaded => (
                StatusCode::SERVICE_UNAVAILABLE,
                "No ledger snapshot has been loaded yet".to_string(),
            ),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Ledger(err)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub limit: Option<usize>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedResponse {
    pub count: usize,
    pub total: usize,
    pub transactions: Vec<IndexedTransaction>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockLocation {
    pub id: String,
    pub block_index: u64,
}

#[derive(Serialize)]
pub struct ChainResponse {
    pub chain: Vec<Block>,
    pub length: usize,
}

// ============================================================================
// Router
// ============================================================================

async fn logging_middleware(
    State(session): State<Arc<LedgerSession>>,
    req: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    let duration = start.elapsed();
    let status = response.status();
    let session_state = format!("{:?}", session.state().await);

    tracing::info!(
        method = %method,
        path = %path,
        status = %status.as_u16(),
        duration_ms = %duration.as_millis(),
        session_state = %session_state,
        "api.request"
    );

    response
}

pub fn build_api_router(session: Arc<LedgerSession>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![
            http::Method::GET,
            http::Method::POST,
            http::Method::OPTIONS,
        ])
        .allow_headers(vec![http::header::CONTENT_TYPE]);

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/validation", get(get_validation))
        .route("/summary", get(get_summary))
        .route("/blocks", get(get_blocks))
        .route("/transactions", get(get_transactions))
        .route("/transactions/:id/block", get(get_transaction_block))
        .route("/refresh", post(refresh))
        .layer(middleware::from_fn_with_state(session.clone(), logging_middleware))
        .with_state(session);

    Router::new().nest("/api", api_routes).layer(cors)
}

/// Bind `port` on all interfaces and serve the API until the process exits.
pub async fn run_api_server(
    session: Arc<LedgerSession>,
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = build_api_router(session);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(%addr, "ledger API listening");
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn current_view(session: &LedgerSession) -> Result<Arc<LedgerView>, ApiError> {
    session.current().await.ok_or(ApiError::NotLoaded)
}

async fn health_check(State(session): State<Arc<LedgerSession>>) -> impl IntoResponse {
    let state = session.state().await;
    let loaded = session.current().await.is_some();
    let status = if loaded {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(serde_json::json!({
            "status": if loaded { "healthy" } else { "unhealthy" },
            "session_state": state,
            "refreshes": session.refresh_count(),
            "timestamp": chrono::Utc::now().to_rfc3339()
        })),
    )
}

async fn get_validation(
    State(session): State<Arc<LedgerSession>>,
) -> Result<Json<ValidationReport>, ApiError> {
    let view = current_view(&session).await?;
    Ok(Json(view.report.clone()))
}

async fn get_summary(
    State(session): State<Arc<LedgerSession>>,
) -> Result<Json<LedgerSummary>, ApiError> {
    let view = current_view(&session).await?;
    Ok(Json(view.summary()))
}

async fn get_blocks(
    State(session): State<Arc<LedgerSession>>,
) -> Result<Json<ChainResponse>, ApiError> {
    let view = current_view(&session).await?;
    let chain = view.snapshot.blocks().to_vec();
    Ok(Json(ChainResponse {
        length: chain.len(),
        chain,
    }))
}

async fn get_transactions(
    State(session): State<Arc<LedgerSession>>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<FeedResponse>, ApiError> {
    if query.limit == Some(0) {
        return Err(ApiError::InvalidInput("limit must be at least 1".to_string()));
    }

    let view = current_view(&session).await?;
    let feed = view.index.all_transactions();
    let limit = query.limit.unwrap_or(feed.len());
    let transactions: Vec<IndexedTransaction> = feed.iter().take(limit).cloned().collect();

    Ok(Json(FeedResponse {
        count: transactions.len(),
        total: feed.len(),
        transactions,
    }))
}

async fn get_transaction_block(
    State(session): State<Arc<LedgerSession>>,
    Path(id): Path<String>,
) -> Result<Json<BlockLocation>, ApiError> {
    let view = current_view(&session).await?;
    let block_index = view.index.find_block_of(&id)?;
    Ok(Json(BlockLocation { id, block_index }))
}

async fn refresh(
    State(session): State<Arc<LedgerSession>>,
) -> Result<Json<LedgerSummary>, ApiError> {
    let view = session.refresh().await?;
    Ok(Json(view.summary()))
}
