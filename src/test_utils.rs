// src/test_utils.rs

pub mod fixtures {
    use crate::models::{
        question::{AnswerLetter, Choice, Question, QuestionStem, TextFormatting, TopicRef},
        topic::Topic,
    };
    use crate::repositories::InMemoryStore;

    /// Slug of the topic with the given id in fixture data.
    pub fn topic_slug(topic_id: i64) -> String {
        format!("topic-{}", topic_id)
    }

    pub fn topic(id: i64, question_count: i32) -> Topic {
        Topic {
            id,
            slug: topic_slug(id),
            name: format!("Topic {}", id),
            description: None,
            category: "physics".to_string(),
            question_count,
        }
    }

    /// A well-formed question with choices A-D.
    pub fn question(id: i64, topic_id: i64, correct: AnswerLetter) -> Question {
        Question {
            id,
            original_id: 1000 + id,
            topic_id,
            topic: TopicRef {
                slug: topic_slug(topic_id),
                name: format!("Topic {}", topic_id),
            },
            page_number: None,
            stem: QuestionStem {
                text: format!("Question {}", id),
                formatting: TextFormatting::default(),
                multiline: false,
            },
            given_information: None,
            choices: AnswerLetter::ALL
                .iter()
                .map(|l| Choice {
                    letter: *l,
                    text: format!("Option {}", l),
                    formatting: TextFormatting::default(),
                    multiline: false,
                })
                .collect(),
            correct_answer: correct,
            images: vec![],
        }
    }

    /// Builds a seeded store where topic `i + 1` holds `pools[i]` questions.
    /// Question ids are `topic_id * 1000 + n`, every correct answer is `A`.
    pub fn store_with_pools(pools: &[usize], seed: u64) -> InMemoryStore {
        let store = InMemoryStore::with_seed(seed);
        for (i, size) in pools.iter().enumerate() {
            let topic_id = i as i64 + 1;
            store.insert_topic(topic(topic_id, 0));
            for n in 0..*size {
                store.insert_question(question(topic_id * 1000 + n as i64, topic_id, AnswerLetter::A));
            }
        }
        store
    }
}
