// src/repositories/memory.rs

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use uuid::Uuid;

use crate::{
    models::{
        question::{Question, QuestionFilter, QuestionStats},
        topic::Topic,
    },
    quiz::QuizSession,
    repositories::{
        QuestionRepository, QuestionSource, SessionRecord, SessionRepository, StoreError,
        StoreResult, TopicRepository,
    },
};

#[derive(Debug)]
struct Inner {
    topics: Vec<Topic>,
    questions: Vec<Question>,
    sessions: HashMap<Uuid, QuizSession>,
    rng: StdRng,
}

/// Process-local store implementing every repository trait.
///
/// Backs the unit and HTTP test suites.
/// Keeps `Topic::question_count` in sync on every insert.
#[derive(Debug)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose random draws are reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            inner: Mutex::new(Inner {
                topics: Vec::new(),
                questions: Vec::new(),
                sessions: HashMap::new(),
                rng,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adds or replaces a topic (matched by id).
    pub fn insert_topic(&self, topic: Topic) {
        let mut inner = self.lock();
        inner.topics.retain(|t| t.id != topic.id);
        inner.topics.push(topic);
        recount(&mut inner);
    }

    /// Adds or replaces a question (matched by id). No validation happens
    /// here, so broken records can be staged for integrity checks.
    pub fn insert_question(&self, question: Question) {
        let mut inner = self.lock();
        inner.questions.retain(|q| q.id != question.id);
        inner.questions.push(question);
        recount(&mut inner);
    }
}

fn recount(inner: &mut Inner) {
    let mut counts: HashMap<i64, i32> = HashMap::new();
    for q in &inner.questions {
        *counts.entry(q.topic_id).or_insert(0) += 1;
    }
    for t in inner.topics.iter_mut() {
        t.question_count = counts.get(&t.id).copied().unwrap_or(0);
    }
}

fn checked(q: &Question) -> StoreResult<Question> {
    q.check_invariants()
        .map_err(|e| StoreError::Corrupt(format!("question {}: {}", q.original_id, e)))?;
    Ok(q.clone())
}

#[async_trait]
impl QuestionSource for InMemoryStore {
    async fn count_available(&self, topic_id: i64) -> StoreResult<Option<u32>> {
        let inner = self.lock();
        if !inner.topics.iter().any(|t| t.id == topic_id) {
            return Ok(None);
        }
        let n = inner.questions.iter().filter(|q| q.topic_id == topic_id).count();
        Ok(Some(n as u32))
    }

    async fn sample_random(&self, topic_id: i64, n: u32) -> StoreResult<Vec<Question>> {
        let mut inner = self.lock();
        let Inner { questions, rng, .. } = &mut *inner;

        let pool: Vec<&Question> = questions.iter().filter(|q| q.topic_id == topic_id).collect();
        let amount = (n as usize).min(pool.len());

        rand::seq::index::sample(rng, pool.len(), amount)
            .into_iter()
            .map(|i| checked(pool[i]))
            .collect()
    }

    async fn get_by_id(&self, id: i64) -> StoreResult<Option<Question>> {
        let inner = self.lock();
        inner.questions.iter().find(|q| q.id == id).map(checked).transpose()
    }
}

#[async_trait]
impl QuestionRepository for InMemoryStore {
    async fn list_questions(&self, filter: &QuestionFilter) -> StoreResult<(Vec<Question>, i64)> {
        let mut inner = self.lock();
        let Inner { questions, rng, .. } = &mut *inner;

        let mut matching: Vec<&Question> = questions.iter().filter(|q| filter.matches(q)).collect();
        let total = matching.len() as i64;

        if filter.randomize {
            matching.shuffle(rng);
        } else {
            matching.sort_by_key(|q| q.original_id);
        }

        let page = matching
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .map(checked)
            .collect::<StoreResult<Vec<_>>>()?;

        Ok((page, total))
    }

    async fn stats(&self) -> StoreResult<QuestionStats> {
        let inner = self.lock();
        let mut stats = QuestionStats::default();

        for q in &inner.questions {
            stats.total_questions += 1;
            stats.questions_with_images += i64::from(q.has_images());
            stats.questions_with_given_info += i64::from(q.given_information.is_some());
            stats.multiline_questions += i64::from(q.stem.multiline);
        }
        Ok(stats)
    }

    async fn find_invalid(&self) -> StoreResult<Vec<i64>> {
        let inner = self.lock();
        let mut ids: Vec<i64> = inner
            .questions
            .iter()
            .filter(|q| q.integrity_error().is_some())
            .map(|q| q.original_id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }
}

#[async_trait]
impl TopicRepository for InMemoryStore {
    async fn list_topics(&self) -> StoreResult<Vec<Topic>> {
        let mut topics = self.lock().topics.clone();
        topics.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(topics)
    }

    async fn find_by_slug(&self, slug: &str) -> StoreResult<Option<Topic>> {
        Ok(self.lock().topics.iter().find(|t| t.slug == slug).cloned())
    }

    async fn refresh_question_counts(&self) -> StoreResult<u64> {
        let mut inner = self.lock();
        let before: Vec<i32> = inner.topics.iter().map(|t| t.question_count).collect();
        recount(&mut inner);
        let changed = inner
            .topics
            .iter()
            .zip(before)
            .filter(|(t, old)| t.question_count != *old)
            .count();
        Ok(changed as u64)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl SessionRepository for InMemoryStore {
    async fn create(&self, session: &QuizSession) -> StoreResult<Uuid> {
        let id = Uuid::new_v4();
        self.lock().sessions.insert(id, session.clone());
        Ok(id)
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<QuizSession>> {
        Ok(self.lock().sessions.get(&id).cloned())
    }

    async fn save(&self, id: Uuid, session: &QuizSession) -> StoreResult<bool> {
        let mut inner = self.lock();
        match inner.sessions.get_mut(&id) {
            Some(stored) => {
                *stored = session.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_completed(&self, limit: i64) -> StoreResult<Vec<SessionRecord>> {
        let inner = self.lock();
        let mut records: Vec<SessionRecord> = inner
            .sessions
            .iter()
            .filter_map(|(id, s)| SessionRecord::from_session(*id, s))
            .collect();
        records.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        records.truncate(limit.max(0) as usize);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{
        models::question::{AnswerLetter, QuestionImage},
        quiz::QuizMode,
        test_utils::fixtures::{question, store_with_pools, topic},
    };

    #[tokio::test]
    async fn counts_follow_inserts_and_unknown_topic_is_none() {
        let store = store_with_pools(&[3, 0], 1);
        assert_eq!(store.count_available(1).await.unwrap(), Some(3));
        assert_eq!(store.count_available(2).await.unwrap(), Some(0));
        assert_eq!(store.count_available(9).await.unwrap(), None);

        let topics = store.list_topics().await.unwrap();
        assert_eq!(topics[0].question_count, 3);
        assert_eq!(topics[1].question_count, 0);
    }

    #[tokio::test]
    async fn sample_never_exceeds_pool_or_repeats() {
        let store = store_with_pools(&[4], 2);
        let drawn = store.sample_random(1, 10).await.unwrap();
        assert_eq!(drawn.len(), 4);

        let mut ids: Vec<i64> = drawn.iter().map(|q| q.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 4);
    }

    #[tokio::test]
    async fn list_filters_by_topic_and_images_and_paginates() {
        let store = store_with_pools(&[5, 5], 3);
        let mut with_image = question(9000, 2, AnswerLetter::B);
        with_image.images.push(QuestionImage {
            filename: "fig.png".to_string(),
            page: 1,
            position: "below".to_string(),
        });
        store.insert_question(with_image);

        let filter = QuestionFilter {
            topic_ids: Some(vec![2]),
            limit: 3,
            ..Default::default()
        };
        let (page, total) = store.list_questions(&filter).await.unwrap();
        assert_eq!(total, 6);
        assert_eq!(page.len(), 3);

        let filter = QuestionFilter {
            has_images: Some(true),
            limit: 50,
            ..Default::default()
        };
        let (page, total) = store.list_questions(&filter).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(page[0].id, 9000);

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_questions, 11);
        assert_eq!(stats.questions_with_images, 1);
    }

    #[tokio::test]
    async fn broken_questions_are_reported_and_refused() {
        let store = InMemoryStore::with_seed(4);
        store.insert_topic(topic(1, 0));
        let mut broken = question(1, 1, AnswerLetter::A);
        broken.choices.truncate(3);
        store.insert_question(broken);
        let mut repeated = question(2, 1, AnswerLetter::A);
        repeated.choices[1].letter = AnswerLetter::A;
        store.insert_question(repeated);
        store.insert_question(question(3, 1, AnswerLetter::B));

        assert_eq!(store.find_invalid().await.unwrap(), vec![1001, 1002]);
        assert!(matches!(
            store.get_by_id(1).await,
            Err(StoreError::Corrupt(_))
        ));
    }

    #[tokio::test]
    async fn sessions_round_trip_and_list_completed_newest_first() {
        let store = InMemoryStore::with_seed(5);
        let now = Utc::now();

        let mut first = QuizSession::new(vec![question(1, 1, AnswerLetter::A)], QuizMode::Practice, now).unwrap();
        let id1 = store.create(&first).await.unwrap();
        let mut second = first.clone();
        let id2 = store.create(&second).await.unwrap();
        let open = store.create(&first).await.unwrap();

        first.complete(now + chrono::Duration::seconds(10)).unwrap();
        second.complete(now + chrono::Duration::seconds(20)).unwrap();
        assert!(store.save(id1, &first).await.unwrap());
        assert!(store.save(id2, &second).await.unwrap());
        assert!(!store.save(Uuid::new_v4(), &first).await.unwrap());

        let history = store.list_completed(10).await.unwrap();
        assert_eq!(history.iter().map(|r| r.id).collect::<Vec<_>>(), vec![id2, id1]);
        assert!(!store.find(open).await.unwrap().unwrap().is_complete());
    }
}
