// src/handlers/session.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::AppError,
    handlers::quiz::assemble_quiz,
    models::quiz::{ActionResponse, AnswerRequest, GenerateQuizRequest, HistoryParams, SessionView},
    quiz::{AnswerOutcome, QuizSession},
    state::AppState,
};

fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest(format!("Invalid session id: {}", raw)))
}

async fn load(state: &AppState, raw_id: &str) -> Result<(Uuid, QuizSession), AppError> {
    let id = parse_id(raw_id)?;
    let session = state
        .sessions
        .find(id)
        .await?
        .ok_or(AppError::NotFound("Session not found".to_string()))?;
    Ok((id, session))
}

async fn persist(state: &AppState, id: Uuid, session: &QuizSession) -> Result<(), AppError> {
    if !state.sessions.save(id, session).await? {
        return Err(AppError::NotFound("Session not found".to_string()));
    }
    Ok(())
}

/// Generates a quiz and opens a session over it.
/// Returns 201 Created and the initial session view.
pub async fn create_session(
    State(state): State<AppState>,
    Json(payload): Json<GenerateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (quiz, _) = assemble_quiz(&state, &payload).await?;

    let session = QuizSession::new(quiz.questions, payload.mode, Utc::now())?;
    let id = state.sessions.create(&session).await?;

    tracing::info!(
        "Started {} session {} with {} questions",
        payload.mode.as_str(),
        id,
        session.questions().len()
    );

    Ok((StatusCode::CREATED, Json(SessionView::new(id, &session))))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (id, session) = load(&state, &id).await?;
    Ok(Json(SessionView::new(id, &session)))
}

/// Picks an answer. In immediate mode a second pick is ignored and
/// reported with `accepted: false`.
pub async fn select_answer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (id, mut session) = load(&state, &id).await?;

    let outcome = session.select_answer(payload.answer, Utc::now())?;
    let accepted = outcome != AnswerOutcome::Locked;
    if accepted {
        persist(&state, id, &session).await?;
    }

    Ok(Json(ActionResponse {
        accepted,
        session: SessionView::new(id, &session),
    }))
}

/// Commits an answer for the current question.
pub async fn submit_answer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (id, mut session) = load(&state, &id).await?;

    let outcome = session.submit_answer(payload.answer, Utc::now())?;
    let accepted = outcome != AnswerOutcome::Locked;
    if accepted {
        persist(&state, id, &session).await?;
    }

    Ok(Json(ActionResponse {
        accepted,
        session: SessionView::new(id, &session),
    }))
}

pub async fn advance(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (id, mut session) = load(&state, &id).await?;
    session.advance(Utc::now())?;
    persist(&state, id, &session).await?;

    if session.is_complete() {
        tracing::info!("Session {} completed", id);
    }
    Ok(Json(SessionView::new(id, &session)))
}

pub async fn retreat(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (id, mut session) = load(&state, &id).await?;
    session.retreat(Utc::now())?;
    persist(&state, id, &session).await?;
    Ok(Json(SessionView::new(id, &session)))
}

/// Ends the session early; unanswered questions score as incorrect.
pub async fn complete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (id, mut session) = load(&state, &id).await?;
    let summary = session.complete(Utc::now())?;
    persist(&state, id, &session).await?;

    tracing::info!(
        "Session {} completed: {}/{}",
        id,
        summary.score,
        summary.total_questions
    );
    Ok(Json(SessionView::new(id, &session)))
}

/// Lists completed sessions, newest first.
pub async fn history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, AppError> {
    let records = state.sessions.list_completed(params.limit()).await?;
    Ok(Json(records))
}
