// src/quiz/error.rs

use thiserror::Error;

use crate::repositories::StoreError;

#[derive(Debug, Error)]
pub enum QuizError {
    /// A topic id that the store does not know reached the sampler.
    #[error("Unknown topic id: {0}")]
    InvalidTopic(i64),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("No questions available for the selected topics")]
    InsufficientQuestions,

    #[error("Illegal state transition: {0}")]
    IllegalStateTransition(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type QuizResult<T> = Result<T, QuizError>;
