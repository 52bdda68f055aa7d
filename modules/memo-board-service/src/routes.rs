//! Axum route handlers for the memo board HTTP API.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use memo_board_types::*;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;

pub struct AppState {
    pub store: Arc<dyn MemoStore>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(store: Arc<dyn MemoStore>) -> Self {
        Self {
            store,
            start_time: Instant::now(),
        }
    }
}

pub type ApiError = (StatusCode, Json<ErrorBody>);

fn bad_request(msg: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorBody::new(msg)))
}

fn error_response(err: MemoError) -> ApiError {
    let status = match &err {
        MemoError::Validation(_) => StatusCode::BAD_REQUEST,
        MemoError::NotFound(_) => StatusCode::NOT_FOUND,
        MemoError::Storage(e) => {
            log::error!("Memo store failure: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(ErrorBody::new(err.to_string())))
}

// GET /memos
pub async fn list_memos(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Memo>>, ApiError> {
    state.store.list().await.map(Json).map_err(error_response)
}

// POST /memos
pub async fn create_memo(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateMemoRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Memo>), ApiError> {
    let Json(req) = payload.map_err(|e| bad_request(format!("Invalid request body: {}", e.body_text())))?;
    let text = req.text.unwrap_or_default();
    match state.store.create(&text).await {
        Ok(memo) => Ok((StatusCode::CREATED, Json(memo))),
        Err(e) => Err(error_response(e)),
    }
}

// PUT /memos
pub async fn add_comment(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AddCommentRequest>, JsonRejection>,
) -> Result<Json<Memo>, ApiError> {
    let Json(req) = payload.map_err(|e| bad_request(format!("Invalid request body: {}", e.body_text())))?;
    let (Some(memo_id), Some(comment)) = (req.memo_id, req.comment) else {
        return Err(bad_request("memoId and comment are required"));
    };
    state
        .store
        .append_comment(memo_id, &comment)
        .await
        .map(Json)
        .map_err(error_response)
}

// DELETE /memos?memoId=<id>[&commentId=<id>]
pub async fn delete_by_query(
    State(state): State<Arc<AppState>>,
    params: Result<Query<DeleteParams>, QueryRejection>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let Query(params) = params.map_err(|e| bad_request(format!("Invalid query: {}", e.body_text())))?;
    let memo_id = params.memo_id.ok_or_else(|| bad_request("memoId is required"))?;
    delete_target(&state, memo_id, params.comment_id).await
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentQuery {
    #[serde(default)]
    pub comment_id: Option<i64>,
}

// DELETE /memos/:id[?commentId=<id>]
pub async fn delete_by_path(
    State(state): State<Arc<AppState>>,
    memo_id: Result<Path<i64>, PathRejection>,
    params: Result<Query<CommentQuery>, QueryRejection>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let Path(memo_id) = memo_id.map_err(|e| bad_request(format!("Invalid memo id: {}", e.body_text())))?;
    let Query(params) = params.map_err(|e| bad_request(format!("Invalid query: {}", e.body_text())))?;
    delete_target(&state, memo_id, params.comment_id).await
}

async fn delete_target(
    state: &AppState,
    memo_id: i64,
    comment_id: Option<i64>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let response = match comment_id {
        Some(comment_id) => {
            let removed = state
                .store
                .delete_comment(memo_id, comment_id)
                .await
                .map_err(error_response)?;
            DeleteResponse {
                message: (if removed { "Comment deleted" } else { "Comment already absent" }).to_string(),
                removed,
            }
        }
        None => {
            let removed = state.store.delete_memo(memo_id).await.map_err(error_response)?;
            DeleteResponse {
                message: (if removed { "Memo deleted" } else { "Memo already absent" }).to_string(),
                removed,
            }
        }
    };
    Ok(Json(response))
}

// GET /status
pub async fn status(State(state): State<Arc<AppState>>) -> Result<Json<ServiceStatus>, ApiError> {
    let memos = state.store.list().await.map_err(error_response)?;
    Ok(Json(ServiceStatus {
        running: true,
        uptime_secs: state.start_time.elapsed().as_secs(),
        memo_count: memos.len(),
        comment_count: memos.iter().map(|m| m.comments.len()).sum(),
        backend: state.store.backend().to_string(),
    }))
}
