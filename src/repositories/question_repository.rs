// src/repositories/question_repository.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    models::question::{Question, QuestionFilter, QuestionRow, QuestionStats},
    repositories::{QuestionRepository, QuestionSource, StoreError, StoreResult},
};

/// Columns of `questions` joined with `topics`, matching `QuestionRow`.
const QUESTION_COLUMNS: &str = r#"
    q.id, q.original_id, q.topic_id,
    t.slug AS topic_slug, t.name AS topic_name,
    q.page_number, q.question_text, q.question_formatting, q.question_multiline,
    q.has_given_info, q.given_info_table, q.given_info_raw,
    q.choices, q.correct_answer, q.images
"#;

pub struct PgQuestionRepository {
    pool: PgPool,
}

impl PgQuestionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn into_questions(rows: Vec<QuestionRow>) -> StoreResult<Vec<Question>> {
    rows.into_iter()
        .map(|row| Question::try_from(row).map_err(StoreError::Corrupt))
        .collect()
}

/// Appends the WHERE clause shared by the page and count queries.
fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &QuestionFilter) {
    qb.push(" WHERE TRUE");

    if let Some(ids) = &filter.topic_ids {
        qb.push(" AND q.topic_id = ANY(");
        qb.push_bind(ids.clone());
        qb.push(")");
    }

    match filter.has_images {
        Some(true) => {
            qb.push(" AND jsonb_array_length(q.images) > 0");
        }
        Some(false) => {
            qb.push(" AND jsonb_array_length(q.images) = 0");
        }
        None => {}
    }
}

#[async_trait]
impl QuestionSource for PgQuestionRepository {
    async fn count_available(&self, topic_id: i64) -> StoreResult<Option<u32>> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(q.id)
            FROM topics t
            LEFT JOIN questions q ON q.topic_id = t.id
            WHERE t.id = $1
            GROUP BY t.id
            "#,
        )
        .bind(topic_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(count.map(|n| n as u32))
    }

    async fn sample_random(&self, topic_id: i64, n: u32) -> StoreResult<Vec<Question>> {
        let sql = format!(
            "SELECT {} FROM questions q JOIN topics t ON t.id = q.topic_id \
             WHERE q.topic_id = $1 ORDER BY RANDOM() LIMIT $2",
            QUESTION_COLUMNS
        );

        let rows = sqlx::query_as::<_, QuestionRow>(&sql)
            .bind(topic_id)
            .bind(n as i64)
            .fetch_all(&self.pool)
            .await?;

        into_questions(rows)
    }

    async fn get_by_id(&self, id: i64) -> StoreResult<Option<Question>> {
        let sql = format!(
            "SELECT {} FROM questions q JOIN topics t ON t.id = q.topic_id WHERE q.id = $1",
            QUESTION_COLUMNS
        );

        let row = sqlx::query_as::<_, QuestionRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| Question::try_from(r).map_err(StoreError::Corrupt))
            .transpose()
    }
}

#[async_trait]
impl QuestionRepository for PgQuestionRepository {
    async fn list_questions(&self, filter: &QuestionFilter) -> StoreResult<(Vec<Question>, i64)> {
        let mut count_query =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM questions q");
        push_filters(&mut count_query, filter);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut page_query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM questions q JOIN topics t ON t.id = q.topic_id",
            QUESTION_COLUMNS
        ));
        push_filters(&mut page_query, filter);

        if filter.randomize {
            page_query.push(" ORDER BY RANDOM()");
        } else {
            page_query.push(" ORDER BY q.original_id");
        }
        page_query.push(" LIMIT ");
        page_query.push_bind(filter.limit);
        page_query.push(" OFFSET ");
        page_query.push_bind(filter.offset);

        let rows: Vec<QuestionRow> = page_query
            .build_query_as()
            .fetch_all(&self.pool)
            .await?;

        Ok((into_questions(rows)?, total))
    }

    async fn stats(&self) -> StoreResult<QuestionStats> {
        let stats = sqlx::query_as::<_, QuestionStats>(
            r#"
            SELECT
                COUNT(*) AS total_questions,
                COUNT(*) FILTER (WHERE jsonb_array_length(images) > 0) AS questions_with_images,
                COUNT(*) FILTER (WHERE has_given_info) AS questions_with_given_info,
                COUNT(*) FILTER (WHERE question_multiline) AS multiline_questions
            FROM questions
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }

    async fn find_invalid(&self) -> StoreResult<Vec<i64>> {
        let sql = format!(
            "SELECT {} FROM questions q JOIN topics t ON t.id = q.topic_id ORDER BY q.original_id",
            QUESTION_COLUMNS
        );

        let rows = sqlx::query_as::<_, QuestionRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        // Uses the read-path conversion, so every row reads would reject is reported.
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let original_id = row.original_id;
                row.integrity_error().map(|reason| {
                    tracing::debug!("Question {} failed validation: {}", original_id, reason);
                    original_id
                })
            })
            .collect())
    }
}
