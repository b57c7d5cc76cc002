//! REST boundary for the workflow engine.
//!
//! Thin axum handlers over [`TransitionEngine`]; every organization service
//! talks to the same parameterized transition endpoint instead of carrying
//! its own controller. Identity claims (`organization`, `actorId`, `admin`)
//! are supplied by the external auth middleware and passed through in the
//! request body.

use std::net::SocketAddr;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::domain::{
    Actor, ExportId, ExportStatus, NewExport, Organization, TransitionPayload,
};
use crate::engine::{TransitionEngine, TransitionRequest};
use crate::error::{ExportflowError, Result};
use crate::storage::{ExportFilter, ExportStore};

/// Body for `POST /exports`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBody {
    #[serde(flatten)]
    pub export: NewExport,
    pub actor_id: String,
}

/// Body for `POST /exports/{id}/transition`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionBody {
    pub target_status: ExportStatus,
    pub organization: Organization,
    pub actor_id: String,
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub payload: TransitionPayload,
}

/// Query parameters for `GET /exports`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub exporter_id: Option<String>,
    pub status: Option<ExportStatus>,
    pub limit: Option<i64>,
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl IntoResponse for ExportflowError {
    fn into_response(self) -> Response {
        let status = match &self {
            ExportflowError::NotFound(_) => StatusCode::NOT_FOUND,
            ExportflowError::InvalidTransition { .. }
            | ExportflowError::ConcurrentModification(_) => StatusCode::CONFLICT,
            ExportflowError::Unauthorized { .. } => StatusCode::FORBIDDEN,
            ExportflowError::MissingField(_) | ExportflowError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            ExportflowError::Serialization(_) | ExportflowError::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "Internal error");
        }
        let body = ErrorBody {
            error: self.kind().to_string(),
            // Do not leak internals for unexpected faults
            message: if status == StatusCode::INTERNAL_SERVER_ERROR {
                "internal server error".to_string()
            } else {
                self.to_string()
            },
        };
        (status, Json(body)).into_response()
    }
}

/// Build the router. Generic over the storage backend so tests can run it
/// against the in-memory store.
pub fn router<S: ExportStore + ?Sized + 'static>(engine: TransitionEngine<S>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/exports", post(submit_export::<S>).get(list_exports::<S>))
        .route("/exports/:id", get(get_export::<S>))
        .route("/exports/:id/transition", post(transition::<S>))
        .route("/exports/:id/history", get(get_history::<S>))
        .route("/exports/:id/approvals", get(get_approvals::<S>))
        .route("/exports/:id/summary", get(get_summary::<S>))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(engine)
}

/// Bind and serve until shutdown.
pub async fn serve<S: ExportStore + ?Sized + 'static>(
    addr: SocketAddr,
    engine: TransitionEngine<S>,
) -> Result<()> {
    let app = router(engine);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {addr}: {e}"))?;
    tracing::info!(%addr, "exportflow server listening");
    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {e}"))?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn submit_export<S: ExportStore + ?Sized + 'static>(
    State(engine): State<TransitionEngine<S>>,
    Json(body): Json<SubmitBody>,
) -> Result<impl IntoResponse> {
    let actor = Actor::new(body.actor_id, Organization::Exporter);
    let record = engine.submit(body.export, &actor).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn list_exports<S: ExportStore + ?Sized + 'static>(
    State(engine): State<TransitionEngine<S>>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse> {
    let records = engine
        .list(ExportFilter {
            exporter_id: query.exporter_id,
            status: query.status,
            limit: query.limit,
        })
        .await?;
    Ok(Json(records))
}

async fn get_export<S: ExportStore + ?Sized + 'static>(
    State(engine): State<TransitionEngine<S>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let record = engine.get(ExportId(id)).await?;
    Ok(Json(record))
}

async fn transition<S: ExportStore + ?Sized + 'static>(
    State(engine): State<TransitionEngine<S>>,
    Path(id): Path<Uuid>,
    Json(body): Json<TransitionBody>,
) -> Result<impl IntoResponse> {
    let actor = Actor {
        id: body.actor_id,
        organization: body.organization,
        admin: body.admin,
    };
    let record = engine
        .transition(TransitionRequest {
            export_id: ExportId(id),
            target_status: body.target_status,
            actor,
            payload: body.payload,
        })
        .await?;
    Ok(Json(record))
}

async fn get_history<S: ExportStore + ?Sized + 'static>(
    State(engine): State<TransitionEngine<S>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let entries = engine.history(ExportId(id)).await?;
    Ok(Json(entries))
}

async fn get_approvals<S: ExportStore + ?Sized + 'static>(
    State(engine): State<TransitionEngine<S>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let records = engine.approvals(ExportId(id)).await?;
    Ok(Json(records))
}

async fn get_summary<S: ExportStore + ?Sized + 'static>(
    State(engine): State<TransitionEngine<S>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let summary = engine.summary(ExportId(id)).await?;
    Ok(Json(summary))
}
