// src/handlers/topic.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    error::AppError,
    models::topic::{
        ListTopicsParams, SlugValidation, TopicResponse, TopicSummary, ValidateTopicsRequest,
    },
    state::AppState,
};

/// Lists all topics, optionally with aggregate stats instead of a count.
pub async fn list_topics(
    State(state): State<AppState>,
    Query(params): Query<ListTopicsParams>,
) -> Result<impl IntoResponse, AppError> {
    let topics = state.topics.list_topics().await?;

    if params.include_stats {
        let summary = TopicSummary::from_topics(&topics);
        let topics: Vec<TopicResponse> = topics.into_iter().map(Into::into).collect();
        return Ok(Json(json!({ "topics": topics, "summary": summary })));
    }

    let total = topics.len();
    let topics: Vec<TopicResponse> = topics.into_iter().map(Into::into).collect();
    Ok(Json(json!({ "topics": topics, "total": total })))
}

/// Retrieves a single topic by slug.
pub async fn get_topic(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let topic = state
        .topics
        .find_by_slug(&slug)
        .await?
        .ok_or(AppError::NotFound(format!("Topic '{}' not found", slug)))?;

    Ok(Json(TopicResponse::from(topic)))
}

pub async fn validate_topics(
    State(state): State<AppState>,
    Json(payload): Json<ValidateTopicsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let topics = state.topics.list_topics().await?;
    Ok(Json(SlugValidation::resolve(&topics, &payload.slugs)))
}

/// Resolves slugs to topic ids, rejecting the request if any are unknown.
pub(crate) async fn resolve_topic_ids(
    state: &AppState,
    slugs: &[String],
) -> Result<SlugValidation, AppError> {
    let topics = state.topics.list_topics().await?;
    let resolved = SlugValidation::resolve(&topics, slugs);

    if !resolved.invalid.is_empty() {
        return Err(AppError::BadRequest(format!(
            "Unknown topics: {}",
            resolved.invalid.join(", ")
        )));
    }
    Ok(resolved)
}
