// src/quiz/sampler.rs

use std::{
    collections::{BTreeMap, HashSet},
    sync::{Arc, Mutex},
};

use futures::future::try_join_all;
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde::Serialize;

use crate::{
    models::question::Question,
    quiz::{
        DistributionStrategy,
        error::{QuizError, QuizResult},
    },
    repositories::QuestionSource,
};

/// Upper bound on the number of questions in one quiz.
pub const MAX_QUESTION_COUNT: u32 = 1000;

/// Input to the sampler. Topic ids must already be resolved from slugs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizRequest {
    pub topic_ids: Vec<i64>,
    pub question_count: u32,
    pub strategy: DistributionStrategy,
}

impl QuizRequest {
    /// Checks bounds and returns the topic ids with duplicates removed,
    /// keeping first occurrence order.
    fn distinct_topics(&self) -> QuizResult<Vec<i64>> {
        if self.topic_ids.is_empty() {
            return Err(QuizError::InvalidRequest(
                "at least one topic must be selected".to_string(),
            ));
        }
        if self.question_count == 0 || self.question_count > MAX_QUESTION_COUNT {
            return Err(QuizError::InvalidRequest(format!(
                "questionCount must be between 1 and {}",
                MAX_QUESTION_COUNT
            )));
        }

        let mut seen = HashSet::new();
        Ok(self
            .topic_ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect())
    }
}

/// The concrete question selection for one quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizPlan {
    pub question_ids: Vec<i64>,
    /// Questions actually drawn per topic id. Sums to `question_ids.len()`.
    pub per_topic_allocation: BTreeMap<i64, u32>,
}

/// A plan together with the drawn questions, in plan order.
#[derive(Debug, Clone)]
pub struct GeneratedQuiz {
    pub plan: QuizPlan,
    pub questions: Vec<Question>,
}

/// Random permutation of the assembled quiz.
pub trait Shuffler: Send + Sync {
    fn shuffle(&self, questions: &mut [Question]);
}

/// Fisher-Yates over the thread-local RNG.
#[derive(Debug, Default)]
pub struct ThreadRngShuffler;

impl Shuffler for ThreadRngShuffler {
    fn shuffle(&self, questions: &mut [Question]) {
        questions.shuffle(&mut rand::thread_rng());
    }
}

/// Reproducible shuffling for tests and replays.
#[derive(Debug)]
pub struct SeededShuffler {
    rng: Mutex<StdRng>,
}

impl SeededShuffler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Shuffler for SeededShuffler {
    fn shuffle(&self, questions: &mut [Question]) {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        questions.shuffle(&mut *rng);
    }
}

/// Splits `question_count` across topics.
///
/// `pools` holds `(topic_id, available)` pairs in request order. The result
/// has the same order and every allocation is capped at the topic's pool.
///
/// * `Even`: `floor(count / n)` each, the first `count % n` topics get one more.
/// * `Proportional`: `round(count * available / total_available)` per topic,
///   rounding half up. The sum may drift from `count` and is not corrected.
pub fn allocate(
    strategy: DistributionStrategy,
    question_count: u32,
    pools: &[(i64, u32)],
) -> Vec<(i64, u32)> {
    if pools.is_empty() {
        return Vec::new();
    }

    match strategy {
        DistributionStrategy::Even => {
            let n = pools.len() as u32;
            let base = question_count / n;
            let remainder = (question_count % n) as usize;

            pools
                .iter()
                .enumerate()
                .map(|(i, &(topic_id, available))| {
                    let wanted = base + u32::from(i < remainder);
                    (topic_id, wanted.min(available))
                })
                .collect()
        }
        DistributionStrategy::Proportional => {
            let total: u64 = pools.iter().map(|&(_, available)| available as u64).sum();
            if total == 0 {
                return pools.iter().map(|&(topic_id, _)| (topic_id, 0)).collect();
            }

            let count = question_count as u64;
            pools
                .iter()
                .map(|&(topic_id, available)| {
                    // floor(x + 1/2) with x = count * available / total
                    let wanted = (2 * count * available as u64 + total) / (2 * total);
                    (topic_id, (wanted as u32).min(available))
                })
                .collect()
        }
    }
}

/// Assembles quizzes from a question source.
pub struct Sampler<S: ?Sized> {
    store: Arc<S>,
    shuffler: Arc<dyn Shuffler>,
}

impl<S: QuestionSource + ?Sized> Sampler<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_shuffler(store, Arc::new(ThreadRngShuffler))
    }

    pub fn with_shuffler(store: Arc<S>, shuffler: Arc<dyn Shuffler>) -> Self {
        Self { store, shuffler }
    }

    /// Selects the questions for a quiz.
    ///
    /// Under-filling is accepted: a topic whose pool is smaller than its
    /// allocation contributes its whole pool. Fails with
    /// `InsufficientQuestions` only when nothing at all could be drawn.
    /// Store failures are returned as-is, never retried.
    pub async fn generate(&self, request: &QuizRequest) -> QuizResult<GeneratedQuiz> {
        let topic_ids = request.distinct_topics()?;

        let pools = try_join_all(topic_ids.iter().map(|&id| self.pool_size(id))).await?;

        let total_available: u64 = pools.iter().map(|&(_, n)| n as u64).sum();
        if total_available == 0 {
            return Err(QuizError::InsufficientQuestions);
        }

        let allocation = allocate(request.strategy, request.question_count, &pools);
        tracing::debug!(
            "Allocating {} questions over {} topics ({:?}): {:?}",
            request.question_count,
            pools.len(),
            request.strategy,
            allocation
        );

        let draws = try_join_all(
            allocation
                .iter()
                .filter(|&&(_, n)| n > 0)
                .map(|&(id, n)| self.draw(id, n)),
        )
        .await?;

        // Every requested topic is reported, including empty ones.
        let mut per_topic_allocation: BTreeMap<i64, u32> =
            topic_ids.iter().map(|&id| (id, 0)).collect();
        let mut seen = HashSet::new();
        let mut questions = Vec::new();

        for (topic_id, drawn) in draws {
            for question in drawn {
                if !seen.insert(question.id) {
                    tracing::warn!("Question {} drawn twice, dropping duplicate", question.id);
                    continue;
                }
                *per_topic_allocation.entry(topic_id).or_insert(0) += 1;
                questions.push(question);
            }
        }

        if questions.is_empty() {
            return Err(QuizError::InsufficientQuestions);
        }

        self.shuffler.shuffle(&mut questions);

        let plan = QuizPlan {
            question_ids: questions.iter().map(|q| q.id).collect(),
            per_topic_allocation,
        };

        tracing::info!(
            "Generated quiz with {} of {} requested questions",
            plan.question_ids.len(),
            request.question_count
        );

        Ok(GeneratedQuiz { plan, questions })
    }

    async fn pool_size(&self, topic_id: i64) -> QuizResult<(i64, u32)> {
        match self.store.count_available(topic_id).await? {
            Some(available) => Ok((topic_id, available)),
            None => Err(QuizError::InvalidTopic(topic_id)),
        }
    }

    async fn draw(&self, topic_id: i64, n: u32) -> QuizResult<(i64, Vec<Question>)> {
        let mut drawn = self.store.sample_random(topic_id, n).await?;
        drawn.truncate(n as usize);
        Ok((topic_id, drawn))
    }
}
