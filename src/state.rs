// src/state.rs

use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    config::Config,
    repositories::{
        InMemoryStore, PgQuestionRepository, PgSessionRepository, PgTopicRepository,
        QuestionRepository, SessionRepository, TopicRepository,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub topics: Arc<dyn TopicRepository>,
    pub questions: Arc<dyn QuestionRepository>,
    pub sessions: Arc<dyn SessionRepository>,
}

impl AppState {
    pub fn postgres(pool: PgPool, config: Config) -> Self {
        Self {
            config: Arc::new(config),
            topics: Arc::new(PgTopicRepository::new(pool.clone())),
            questions: Arc::new(PgQuestionRepository::new(pool.clone())),
            sessions: Arc::new(PgSessionRepository::new(pool)),
        }
    }

    /// All three repositories backed by one in-memory store.
    pub fn in_memory(store: Arc<InMemoryStore>, config: Config) -> Self {
        Self {
            config: Arc::new(config),
            topics: store.clone(),
            questions: store.clone(),
            sessions: store,
        }
    }
}
