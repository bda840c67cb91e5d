//! HTTP routes for generation dispatch, prediction, job inspection, and
//! the realtime event stream.
//!
//! Requests are authenticated upstream; the owning user arrives in the
//! `X-User-Id` header set by the fronting proxy.

use crate::error::ApiError;
use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::request::Parts;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use fabula_core::GenerationKind;
use fabula_interface::GenerationJobRepository;
use fabula_pipeline::{BroadcastNotifier, DispatchReceipt, JobDispatcher};
use futures::Stream;
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// Dispatcher all generate/predict routes go through
    pub dispatcher: Arc<JobDispatcher>,
    /// Job log for the inspection routes
    pub jobs: Arc<dyn GenerationJobRepository>,
    /// Event fan-out backing the SSE stream
    pub notifier: BroadcastNotifier,
}

/// The authenticated user, from the `X-User-Id` header.
#[derive(Debug, Clone, Copy)]
pub struct UserId(pub i32);

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for UserId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<i32>().ok())
            .map(UserId)
            .ok_or_else(|| ApiError::bad_request("Missing or invalid X-User-Id header."))
    }
}

#[derive(Deserialize)]
struct ImagePrompt {
    prompt: String,
}

#[derive(Deserialize)]
struct PredictQuery {
    chapter: Option<i32>,
}

#[derive(Deserialize)]
struct JobsQuery {
    limit: Option<i64>,
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/stories/:story_id/generate/metadata",
            post(generate_metadata),
        )
        .route("/api/stories/:story_id/generate/arcs", post(generate_arcs))
        .route(
            "/api/stories/:story_id/generate/guide",
            post(generate_guide),
        )
        .route(
            "/api/stories/:story_id/generate/summaries",
            post(generate_summaries),
        )
        .route(
            "/api/stories/:story_id/generate/all_chapters",
            post(generate_all_chapters),
        )
        // `:chapter` is the 1-based chapter number here
        .route(
            "/api/stories/:story_id/chapters/:chapter/generate",
            post(generate_chapter),
        )
        .route("/api/stories/:story_id/cover_image", post(generate_cover))
        // and the chapter row id here, matching the stored image key
        .route(
            "/api/stories/:story_id/chapters/:chapter/image",
            post(generate_chapter_image),
        )
        .route("/api/stories/:story_id/predict/:kind", get(predict))
        .route("/api/jobs", get(list_jobs))
        .route("/api/jobs/:task_id", get(job_by_id))
        .route("/api/events", get(events))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn generate_metadata(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(story_id): Path<i32>,
) -> Result<Json<DispatchReceipt>, ApiError> {
    Ok(Json(
        state.dispatcher.dispatch_metadata(user_id, story_id).await?,
    ))
}

async fn generate_arcs(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(story_id): Path<i32>,
) -> Result<Json<DispatchReceipt>, ApiError> {
    Ok(Json(state.dispatcher.dispatch_arcs(user_id, story_id).await?))
}

async fn generate_guide(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(story_id): Path<i32>,
) -> Result<Json<DispatchReceipt>, ApiError> {
    Ok(Json(state.dispatcher.dispatch_guide(user_id, story_id).await?))
}

async fn generate_summaries(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(story_id): Path<i32>,
) -> Result<Json<DispatchReceipt>, ApiError> {
    Ok(Json(
        state
            .dispatcher
            .dispatch_summaries(user_id, story_id)
            .await?,
    ))
}

async fn generate_all_chapters(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(story_id): Path<i32>,
) -> Result<Json<Vec<DispatchReceipt>>, ApiError> {
    Ok(Json(
        state
            .dispatcher
            .dispatch_all_chapters(user_id, story_id)
            .await?,
    ))
}

async fn generate_chapter(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path((story_id, chapter_number)): Path<(i32, i32)>,
) -> Result<Json<DispatchReceipt>, ApiError> {
    Ok(Json(
        state
            .dispatcher
            .dispatch_chapter(user_id, story_id, chapter_number)
            .await?,
    ))
}

async fn generate_cover(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(story_id): Path<i32>,
    Json(body): Json<ImagePrompt>,
) -> Result<Json<DispatchReceipt>, ApiError> {
    Ok(Json(
        state
            .dispatcher
            .dispatch_cover_image(user_id, story_id, &body.prompt)
            .await?,
    ))
}

async fn generate_chapter_image(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path((story_id, chapter_id)): Path<(i32, i32)>,
    Json(body): Json<ImagePrompt>,
) -> Result<Json<DispatchReceipt>, ApiError> {
    Ok(Json(
        state
            .dispatcher
            .dispatch_chapter_image(user_id, story_id, chapter_id, &body.prompt)
            .await?,
    ))
}

/// Cost prediction without dispatching. Image kinds return the flat
/// per-image cost; text kinds return the full prediction breakdown.
async fn predict(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path((story_id, kind)): Path<(i32, String)>,
    Query(query): Query<PredictQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let kind: GenerationKind = kind
        .parse()
        .map_err(|_| ApiError::bad_request("Unknown generation kind."))?;
    if kind.tier().is_none() {
        let credit_cost = state.dispatcher.predict_image_cost()?;
        return Ok(Json(json!({ "credit_cost": credit_cost })));
    }
    let predicted = state
        .dispatcher
        .predict(user_id, story_id, kind, query.chapter)?;
    let value = serde_json::to_value(&predicted)
        .map_err(|_| ApiError::bad_request("Prediction could not be serialized."))?;
    Ok(Json(value))
}

async fn list_jobs(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Query(query): Query<JobsQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let jobs = state
        .jobs
        .jobs_for_user(user_id, query.limit.unwrap_or(20).clamp(1, 100))?;
    Ok(Json(json!({ "jobs": jobs })))
}

async fn job_by_id(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(task_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let record = state
        .jobs
        .by_task_id(&task_id)?
        .filter(|r| r.user_id == user_id)
        .ok_or_else(|| ApiError::not_found("Job not found."))?;
    Ok(Json(json!({ "job": record })))
}

/// Server-sent events carrying this user's generation outcomes.
async fn events(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.notifier.subscribe();
    let stream = futures::stream::unfold(rx, move |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok((owner, event)) if owner == user_id => {
                    // Serialization of our own event type cannot fail.
                    if let Ok(sse) = Event::default().event(event.name()).json_data(&event) {
                        return Some((Ok(sse), rx));
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(user_id, skipped, "event stream lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}
