// src/repositories/mod.rs

pub mod memory;
pub mod question_repository;
pub mod session_repository;
pub mod topic_repository;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    models::{
        question::{Question, QuestionFilter, QuestionStats},
        topic::Topic,
    },
    quiz::{QuizMode, QuizResultSummary, QuizSession},
};

pub use memory::InMemoryStore;
pub use question_repository::PgQuestionRepository;
pub use session_repository::PgSessionRepository;
pub use topic_repository::PgTopicRepository;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored record breaks a model invariant.
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// The reads the quiz sampler needs.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Number of questions in the topic, `None` if the topic does not exist.
    async fn count_available(&self, topic_id: i64) -> StoreResult<Option<u32>>;

    /// Up to `n` distinct questions of the topic, chosen uniformly at random.
    async fn sample_random(&self, topic_id: i64, n: u32) -> StoreResult<Vec<Question>>;

    async fn get_by_id(&self, id: i64) -> StoreResult<Option<Question>>;
}

#[async_trait]
pub trait QuestionRepository: QuestionSource {
    /// One page of matching questions plus the total number of matches.
    async fn list_questions(&self, filter: &QuestionFilter) -> StoreResult<(Vec<Question>, i64)>;

    async fn stats(&self) -> StoreResult<QuestionStats>;

    /// Original ids of questions whose choices or answer key are malformed.
    async fn find_invalid(&self) -> StoreResult<Vec<i64>>;
}

#[async_trait]
pub trait TopicRepository: Send + Sync {
    /// All topics ordered by name.
    async fn list_topics(&self) -> StoreResult<Vec<Topic>>;

    async fn find_by_slug(&self, slug: &str) -> StoreResult<Option<Topic>>;

    /// Rewrites every topic's cached `question_count`. Returns rows touched.
    async fn refresh_question_counts(&self) -> StoreResult<u64>;

    async fn ping(&self) -> StoreResult<()>;
}

/// A completed session as listed in the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: Uuid,
    pub mode: QuizMode,
    pub completed_at: DateTime<Utc>,
    pub topics: Vec<String>,
    pub summary: QuizResultSummary,
}

impl SessionRecord {
    pub fn from_session(id: Uuid, session: &QuizSession) -> Option<Self> {
        let summary = session.summary()?.clone();
        Some(SessionRecord {
            id,
            mode: session.mode(),
            completed_at: session.completed_at()?,
            topics: summary.per_topic_breakdown.keys().cloned().collect(),
            summary,
        })
    }
}

/// Key-value persistence for quiz sessions between requests.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create(&self, session: &QuizSession) -> StoreResult<Uuid>;

    async fn find(&self, id: Uuid) -> StoreResult<Option<QuizSession>>;

    /// Overwrites a stored session. `false` when no session has this id.
    async fn save(&self, id: Uuid, session: &QuizSession) -> StoreResult<bool>;

    /// Completed sessions, newest first.
    async fn list_completed(&self, limit: i64) -> StoreResult<Vec<SessionRecord>>;
}
