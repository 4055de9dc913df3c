//! Read-only access to recorded conversations.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use newsroom_store::{Feedback, Step, Thread};
use uuid::Uuid;

use crate::error::{Result, ServerError};
use crate::routes::pagination::PaginationParams;
use crate::state::AppState;

/// `GET /api/threads?skip=&limit=`, newest first.
pub async fn list_threads_handler(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Vec<Thread>>> {
    let limit = params.effective_limit();
    let threads = state
        .with_store_blocking(move |store| store.list_threads(params.skip, limit))
        .await?;
    Ok(Json(threads))
}

/// `GET /api/threads/{id}`
pub async fn get_thread_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Thread>> {
    state
        .with_store_blocking(move |store| store.get_thread(id))
        .await?
        .map(Json)
        .ok_or_else(|| ServerError::NotFound(format!("Thread {id} not found")))
}

/// `GET /api/threads/{id}/steps`, oldest first.
pub async fn list_steps_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Step>>> {
    let steps = state
        .with_store_blocking(move |store| {
            if store.get_thread(id)?.is_none() {
                return Ok(None);
            }
            store.list_steps(id).map(Some)
        })
        .await?;
    steps
        .map(Json)
        .ok_or_else(|| ServerError::NotFound(format!("Thread {id} not found")))
}

/// `GET /api/steps/{id}`
pub async fn get_step_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Step>> {
    state
        .with_store_blocking(move |store| store.get_step(id))
        .await?
        .map(Json)
        .ok_or_else(|| ServerError::NotFound(format!("Step {id} not found")))
}

/// `GET /api/threads/{id}/feedbacks`
pub async fn list_feedbacks_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Feedback>>> {
    let feedbacks = state
        .with_store_blocking(move |store| {
            if store.get_thread(id)?.is_none() {
                return Ok(None);
            }
            store.list_feedbacks(id).map(Some)
        })
        .await?;
    feedbacks
        .map(Json)
        .ok_or_else(|| ServerError::NotFound(format!("Thread {id} not found")))
}

/// `GET /api/feedbacks/{id}`
pub async fn get_feedback_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Feedback>> {
    state
        .with_store_blocking(move |store| store.get_feedback(id))
        .await?
        .map(Json)
        .ok_or_else(|| ServerError::NotFound(format!("Feedback {id} not found")))
}
