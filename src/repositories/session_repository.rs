// src/repositories/session_repository.rs

use async_trait::async_trait;
use sqlx::{PgPool, types::Json};
use uuid::Uuid;

use crate::{
    quiz::QuizSession,
    repositories::{SessionRecord, SessionRepository, StoreError, StoreResult},
};

/// Decodes a stored `state` document. Documents that no longer form a valid
/// session are reported as corrupt rather than as database errors.
fn decode_state(id: Uuid, state: serde_json::Value) -> StoreResult<QuizSession> {
    serde_json::from_value(state)
        .map_err(|e| StoreError::Corrupt(format!("session {}: {}", id, e)))
}

/// Stores each session as one JSONB document in `quiz_sessions`.
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn create(&self, session: &QuizSession) -> StoreResult<Uuid> {
        let id = Uuid::new_v4();
        let state = serde_json::to_value(session)?;

        sqlx::query(
            r#"
            INSERT INTO quiz_sessions
            (id, mode, status, state, total_questions, started_at, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(id)
        .bind(session.mode().as_str())
        .bind(session.status().as_str())
        .bind(Json(state))
        .bind(session.questions().len() as i32)
        .bind(session.started_at())
        .bind(session.completed_at())
        .execute(&self.pool)
        .await?;

        tracing::debug!("Created quiz session {}", id);
        Ok(id)
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<QuizSession>> {
        let state = sqlx::query_scalar::<_, Json<serde_json::Value>>(
            "SELECT state FROM quiz_sessions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        state.map(|s| decode_state(id, s.0)).transpose()
    }

    async fn save(&self, id: Uuid, session: &QuizSession) -> StoreResult<bool> {
        let state = serde_json::to_value(session)?;

        let result = sqlx::query(
            r#"
            UPDATE quiz_sessions
            SET state = $2, status = $3, completed_at = $4, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(Json(state))
        .bind(session.status().as_str())
        .bind(session.completed_at())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_completed(&self, limit: i64) -> StoreResult<Vec<SessionRecord>> {
        let rows = sqlx::query_as::<_, (Uuid, Json<serde_json::Value>)>(
            r#"
            SELECT id, state
            FROM quiz_sessions
            WHERE status = 'completed'
            ORDER BY completed_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for (id, state) in rows {
            let session = decode_state(id, state.0)?;
            records.extend(SessionRecord::from_session(id, &session));
        }
        Ok(records)
    }
}
