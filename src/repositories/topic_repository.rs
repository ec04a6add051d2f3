// src/repositories/topic_repository.rs

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    models::topic::Topic,
    repositories::{StoreResult, TopicRepository},
};

pub struct PgTopicRepository {
    pool: PgPool,
}

impl PgTopicRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TopicRepository for PgTopicRepository {
    async fn list_topics(&self) -> StoreResult<Vec<Topic>> {
        let topics = sqlx::query_as::<_, Topic>(
            r#"
            SELECT id, slug, name, description, category, question_count
            FROM topics
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(topics)
    }

    async fn find_by_slug(&self, slug: &str) -> StoreResult<Option<Topic>> {
        let topic = sqlx::query_as::<_, Topic>(
            r#"
            SELECT id, slug, name, description, category, question_count
            FROM topics
            WHERE slug = $1
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(topic)
    }

    async fn refresh_question_counts(&self) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE topics t
            SET question_count = c.actual, updated_at = NOW()
            FROM (
                SELECT t2.id, COUNT(q.id)::INTEGER AS actual
                FROM topics t2
                LEFT JOIN questions q ON q.topic_id = t2.id
                GROUP BY t2.id
            ) c
            WHERE c.id = t.id AND t.question_count <> c.actual
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
