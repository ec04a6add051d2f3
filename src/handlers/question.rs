// src/handlers/question.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};

use crate::{
    error::AppError,
    handlers::topic::resolve_topic_ids,
    models::question::{
        DataValidation, ListQuestionsParams, QuestionFilter, QuestionPage, QuestionResponse,
    },
    state::AppState,
};

/// Lists questions with optional topic and image filters.
///
/// `topics` takes comma-separated slugs. `limit` defaults to 50 and is capped
/// at 1000; `randomize=true` returns a random page instead of id order.
pub async fn list_questions(
    State(state): State<AppState>,
    Query(params): Query<ListQuestionsParams>,
) -> Result<impl IntoResponse, AppError> {
    let slugs = params.topic_slugs();
    let topic_ids = if slugs.is_empty() {
        None
    } else {
        Some(resolve_topic_ids(&state, &slugs).await?.topic_ids)
    };

    let filter = QuestionFilter {
        topic_ids,
        has_images: params.has_images,
        limit: params
            .limit
            .unwrap_or(QuestionFilter::DEFAULT_LIMIT)
            .clamp(1, QuestionFilter::MAX_LIMIT),
        offset: params.offset.unwrap_or(0).max(0),
        randomize: params.randomize,
    };

    let (questions, total) = state.questions.list_questions(&filter).await?;

    Ok(Json(QuestionPage {
        questions: questions.iter().map(QuestionResponse::from).collect(),
        total,
    }))
}

pub async fn question_stats(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.questions.stats().await?))
}

/// Reports questions whose stored choices or answer key are malformed.
pub async fn validate_questions(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let issues = state.questions.find_invalid().await?;
    if !issues.is_empty() {
        tracing::warn!("{} questions failed validation", issues.len());
    }

    Ok(Json(DataValidation {
        issue_count: issues.len(),
        issues,
    }))
}

/// Retrieves a single question by internal id.
pub async fn get_question(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id: i64 = id
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid question id: {}", id)))?;

    let question = state
        .questions
        .get_by_id(id)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    Ok(Json(QuestionResponse::from(&question)))
}
