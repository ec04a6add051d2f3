// src/quiz/mod.rs

//! Quiz assembly and quiz-taking logic.
//!
//! `sampler` turns a set of topics into a concrete question list, `session`
//! drives one attempt at that list through answering and scoring. Neither
//! touches HTTP or SQL directly; they talk to storage through the
//! repository traits.

pub mod error;
pub mod sampler;
pub mod session;

use serde::{Deserialize, Serialize};

pub use error::QuizError;
pub use sampler::{GeneratedQuiz, QuizPlan, QuizRequest, Sampler};
pub use session::{Advance, AnswerOutcome, QuizAnswer, QuizResultSummary, QuizSession};

/// Feedback policy of a quiz attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuizMode {
    /// Correct answer shown right after each question.
    Immediate,
    /// No feedback until the end, answers may be changed.
    Practice,
}

impl QuizMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuizMode::Immediate => "immediate",
            QuizMode::Practice => "practice",
        }
    }
}

/// How a quiz's question count is split across the selected topics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistributionStrategy {
    #[default]
    Even,
    Proportional,
}
