// src/models/topic.rs

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

/// Represents the 'topics' table in the database.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Topic {
    pub id: i64,

    /// Public identifier used by clients (e.g., "heat-exchangers").
    pub slug: String,

    pub name: String,

    pub description: Option<String>,

    pub category: String,

    /// Cached number of questions in this topic.
    /// Recomputed by the store, never by the quiz logic.
    pub question_count: i32,
}

/// DTO for returning a topic. The slug is exposed as `id`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicResponse {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: String,
    pub question_count: i32,
}

impl From<Topic> for TopicResponse {
    fn from(t: Topic) -> Self {
        TopicResponse {
            id: t.slug,
            name: t.name,
            description: t.description,
            category: t.category,
            question_count: t.question_count,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicSummary {
    pub total_topics: usize,
    pub total_questions: i64,
    pub categories: BTreeMap<String, usize>,
}

impl TopicSummary {
    pub fn from_topics(topics: &[Topic]) -> Self {
        let mut categories = BTreeMap::new();
        for t in topics {
            *categories.entry(t.category.clone()).or_insert(0) += 1;
        }

        TopicSummary {
            total_topics: topics.len(),
            total_questions: topics.iter().map(|t| t.question_count as i64).sum(),
            categories,
        }
    }
}

/// Query parameters for listing topics.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTopicsParams {
    #[serde(default)]
    pub include_stats: bool,
}

/// DTO for validating a batch of topic slugs.
#[derive(Debug, Deserialize)]
pub struct ValidateTopicsRequest {
    pub slugs: Vec<String>,
}

/// Outcome of resolving slugs against the known topics.
#[derive(Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlugValidation {
    pub valid: Vec<String>,
    pub invalid: Vec<String>,
    /// Internal ids of the valid slugs, in request order.
    pub topic_ids: Vec<i64>,
}

impl SlugValidation {
    pub fn resolve(topics: &[Topic], slugs: &[String]) -> Self {
        let by_slug: HashMap<&str, i64> = topics.iter().map(|t| (t.slug.as_str(), t.id)).collect();

        let mut out = SlugValidation::default();
        for slug in slugs {
            match by_slug.get(slug.as_str()) {
                Some(id) => {
                    out.valid.push(slug.clone());
                    out.topic_ids.push(*id);
                }
                None => out.invalid.push(slug.clone()),
            }
        }
        out
    }
}
