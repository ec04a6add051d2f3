// src/handlers/health.rs

use axum::{Json, extract::State, response::IntoResponse};
use chrono::Utc;
use serde_json::json;

use crate::{error::AppError, state::AppState};

pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Pings the backing store. 500 when it is unreachable.
pub async fn health_db(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    state.topics.ping().await?;

    Ok(Json(json!({
        "status": "ok",
        "database": "connected",
        "timestamp": Utc::now().to_rfc3339(),
    })))
}

/// Endpoint index served at `/api`.
pub async fn api_index() -> impl IntoResponse {
    Json(json!({
        "name": "quiz-api",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "topics": "/api/topics",
            "questions": "/api/questions",
            "questionStats": "/api/questions/stats",
            "questionValidation": "/api/questions/validate",
            "generateQuiz": "/api/questions/generate-quiz",
            "sessions": "/api/sessions",
            "history": "/api/history",
            "images": "/api/images/{filename}",
        }
    }))
}
