// src/models/quiz.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    models::question::{AnswerLetter, QuestionResponse},
    quiz::{
        DistributionStrategy, QuizAnswer, QuizMode, QuizResultSummary, QuizSession,
        session::SessionStatus,
    },
};

/// Body of `POST /api/questions/generate-quiz` and `POST /api/sessions`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateQuizRequest {
    #[validate(length(min = 1, message = "At least one topic must be selected."))]
    pub topic_slugs: Vec<String>,
    #[validate(range(min = 1, max = 1000, message = "questionCount must be between 1 and 1000."))]
    pub question_count: u32,
    pub mode: QuizMode,
    #[serde(default)]
    pub distribution_strategy: DistributionStrategy,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateQuizResponse {
    pub questions: Vec<QuestionResponse>,
    pub question_ids: Vec<i64>,
    /// Questions drawn per topic slug.
    pub allocation: BTreeMap<String, u32>,
    pub distribution: DistributionStrategy,
    pub total: usize,
    pub mode: QuizMode,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub answer: AnswerLetter,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<i64>,
}

impl HistoryParams {
    pub const DEFAULT_LIMIT: i64 = 20;
    pub const MAX_LIMIT: i64 = 100;

    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryView {
    #[serde(flatten)]
    pub summary: QuizResultSummary,
    pub percentage: u32,
}

/// Client view of a session.
///
/// The current question's answer key, and the committed answer with its
/// correctness, only appear once feedback is visible or the session is over.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub id: Uuid,
    pub mode: QuizMode,
    pub status: SessionStatus,
    pub current_index: usize,
    pub total_questions: usize,
    pub answered_count: usize,
    pub current_question: Option<QuestionResponse>,
    pub selected_answer: Option<AnswerLetter>,
    pub current_answer: Option<QuizAnswer>,
    pub feedback_visible: bool,
    pub summary: Option<SummaryView>,
}

impl SessionView {
    pub fn new(id: Uuid, session: &QuizSession) -> Self {
        let feedback_visible = session.feedback_visible();
        let current = session.current_question();

        let current_question = current.map(|q| {
            let response = QuestionResponse::from(q);
            if feedback_visible {
                response
            } else {
                response.without_answer()
            }
        });

        let committed = current.and_then(|q| session.answer_for(q.id));
        let selected_answer = session
            .pending_answer()
            .or_else(|| committed.map(|a| a.selected_answer));
        let current_answer = committed.filter(|_| feedback_visible).cloned();

        SessionView {
            id,
            mode: session.mode(),
            status: session.status(),
            current_index: session.current_index(),
            total_questions: session.questions().len(),
            answered_count: session.answered_count(),
            current_question,
            selected_answer,
            current_answer,
            feedback_visible,
            summary: session.summary().map(|s| SummaryView {
                percentage: s.percentage(),
                summary: s.clone(),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub accepted: bool,
    pub session: SessionView,
}
