// src/handlers/quiz.rs

use std::collections::{BTreeMap, HashMap};

use axum::{Json, extract::State, response::IntoResponse};
use validator::Validate;

use crate::{
    error::AppError,
    handlers::topic::resolve_topic_ids,
    models::{
        question::QuestionResponse,
        quiz::{GenerateQuizRequest, GenerateQuizResponse},
    },
    quiz::{GeneratedQuiz, QuizRequest, Sampler},
    state::AppState,
};

/// Validates the request, resolves slugs and runs the sampler.
/// Returns the quiz and its allocation keyed by slug.
pub(crate) async fn assemble_quiz(
    state: &AppState,
    payload: &GenerateQuizRequest,
) -> Result<(GeneratedQuiz, BTreeMap<String, u32>), AppError> {
    payload.validate()?;

    let resolved = resolve_topic_ids(state, &payload.topic_slugs).await?;
    let slug_of: HashMap<i64, &str> = resolved
        .topic_ids
        .iter()
        .copied()
        .zip(resolved.valid.iter().map(String::as_str))
        .collect();

    let request = QuizRequest {
        topic_ids: resolved.topic_ids.clone(),
        question_count: payload.question_count,
        strategy: payload.distribution_strategy,
    };

    let quiz = Sampler::new(state.questions.clone())
        .generate(&request)
        .await?;

    let allocation = quiz
        .plan
        .per_topic_allocation
        .iter()
        .filter_map(|(id, n)| slug_of.get(id).map(|slug| (slug.to_string(), *n)))
        .collect();

    Ok((quiz, allocation))
}

/// Generates a quiz over the selected topics.
///
/// Questions come back in quiz order with their answer keys; the client
/// scores them itself. Use `/api/sessions` for server-side scoring.
pub async fn generate_quiz(
    State(state): State<AppState>,
    Json(payload): Json<GenerateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (quiz, allocation) = assemble_quiz(&state, &payload).await?;

    Ok(Json(GenerateQuizResponse {
        questions: quiz.questions.iter().map(QuestionResponse::from).collect(),
        total: quiz.plan.question_ids.len(),
        question_ids: quiz.plan.question_ids,
        allocation,
        distribution: payload.distribution_strategy,
        mode: payload.mode,
    }))
}
