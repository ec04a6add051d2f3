// tests/api_tests.rs

use std::sync::Arc;

use quiz_api::{
    config::Config,
    models::{
        question::{AnswerLetter, Choice, Question, QuestionImage, QuestionStem, TextFormatting, TopicRef},
        topic::Topic,
    },
    repositories::InMemoryStore,
    routes,
    state::AppState,
};
use serde_json::{Value, json};

fn topic(id: i64, slug: &str, name: &str) -> Topic {
    Topic {
        id,
        slug: slug.to_string(),
        name: name.to_string(),
        description: None,
        category: "nuclear".to_string(),
        question_count: 0,
    }
}

fn question(id: i64, topic: &Topic, correct: AnswerLetter) -> Question {
    Question {
        id,
        original_id: id,
        topic_id: topic.id,
        topic: TopicRef {
            slug: topic.slug.clone(),
            name: topic.name.clone(),
        },
        page_number: Some(1),
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

/// Seeds two topics: "reactors" with 10 questions (one with an image) and
/// "thermo" with 10 questions. Every correct answer is `A`.
fn seeded_store() -> InMemoryStore {
    let store = InMemoryStore::with_seed(42);
    let reactors = topic(1, "reactors", "Reactor Theory");
    let thermo = topic(2, "thermo", "Thermodynamics");
    store.insert_topic(reactors.clone());
    store.insert_topic(thermo.clone());
    store.insert_topic(topic(3, "empty", "Empty Topic"));

    for n in 0..10 {
        let mut q = question(100 + n, &reactors, AnswerLetter::A);
        if n == 0 {
            q.images.push(QuestionImage {
                filename: "core.png".to_string(),
                page: 1,
                position: "above".to_string(),
            });
        }
        store.insert_question(q);
        store.insert_question(question(200 + n, &thermo, AnswerLetter::A));
    }
    store
}

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
async fn spawn_app() -> String {
    let config = Config {
        database_url: String::new(),
        rust_log: "error".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origin: "http://localhost:3000".to_string(),
        images_dir: "data/images".to_string(),
        log_dir: "logs".to_string(),
    };

    let state = AppState::in_memory(Arc::new(seeded_store()), config);
    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

async fn post_json(client: &reqwest::Client, url: String, body: Value) -> (u16, Value) {
    let response = client
        .post(url)
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request");
    let status = response.status().as_u16();
    (status, response.json().await.unwrap_or(Value::Null))
}

async fn get_json(client: &reqwest::Client, url: String) -> (u16, Value) {
    let response = client.get(url).send().await.expect("Failed to execute request");
    let status = response.status().as_u16();
    (status, response.json().await.unwrap_or(Value::Null))
}

#[tokio::test]
async fn unknown_path_404() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Act
    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn health_endpoints_report_ok() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let (status, body) = get_json(&client, format!("{}/health/db", address)).await;
    assert_eq!(status, 200);
    assert_eq!(body["database"], "connected");

    let (status, body) = get_json(&client, format!("{}/api", address)).await;
    assert_eq!(status, 200);
    assert_eq!(body["endpoints"]["sessions"], "/api/sessions");
}

#[tokio::test]
async fn topics_list_with_and_without_stats() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let (status, body) = get_json(&client, format!("{}/api/topics", address)).await;
    assert_eq!(status, 200);
    assert_eq!(body["total"], 3);
    // Ordered by name
    assert_eq!(body["topics"][0]["id"], "empty");
    assert_eq!(body["topics"][1]["questionCount"], 10);

    let (status, body) = get_json(&client, format!("{}/api/topics?includeStats=true", address)).await;
    assert_eq!(status, 200);
    assert_eq!(body["summary"]["totalTopics"], 3);
    assert_eq!(body["summary"]["totalQuestions"], 20);
    assert_eq!(body["summary"]["categories"]["nuclear"], 3);
}

#[tokio::test]
async fn validate_topic_slugs() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let (status, body) = post_json(
        &client,
        format!("{}/api/topics/validate", address),
        json!({ "slugs": ["thermo", "bogus"] }),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["valid"], json!(["thermo"]));
    assert_eq!(body["invalid"], json!(["bogus"]));
    assert_eq!(body["topicIds"], json!([2]));
}

#[tokio::test]
async fn list_questions_filters_and_paginates() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let (status, body) = get_json(
        &client,
        format!("{}/api/questions?topics=reactors&limit=4&offset=2", address),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["total"], 10);
    let ids: Vec<i64> = body["questions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|q| q["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![102, 103, 104, 105]);

    let (status, body) = get_json(&client, format!("{}/api/questions?hasImages=true", address)).await;
    assert_eq!(status, 200);
    assert_eq!(body["total"], 1);
    assert_eq!(body["questions"][0]["images"][0]["url"], "/api/images/core.png");

    let (status, body) = get_json(&client, format!("{}/api/questions?topics=nope", address)).await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn question_stats_and_integrity_check() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let (status, body) = get_json(&client, format!("{}/api/questions/stats", address)).await;
    assert_eq!(status, 200);
    assert_eq!(body["totalQuestions"], 20);
    assert_eq!(body["questionsWithImages"], 1);

    let (status, body) = get_json(&client, format!("{}/api/questions/validate", address)).await;
    assert_eq!(status, 200);
    assert_eq!(body["issueCount"], 0);
}

#[tokio::test]
async fn generate_quiz_even_split() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Act
    let (status, body) = post_json(
        &client,
        format!("{}/api/questions/generate-quiz", address),
        json!({
            "topicSlugs": ["reactors", "thermo"],
            "questionCount": 15,
            "mode": "practice"
        }),
    )
    .await;

    // Assert
    assert_eq!(status, 200);
    assert_eq!(body["total"], 15);
    assert_eq!(body["distribution"], "even");
    assert_eq!(body["mode"], "practice");
    assert_eq!(body["allocation"]["reactors"], 8);
    assert_eq!(body["allocation"]["thermo"], 7);

    let mut ids: Vec<i64> = body["questionIds"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_i64().unwrap())
        .collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 15);
}

#[tokio::test]
async fn generate_quiz_rejects_bad_requests() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let url = format!("{}/api/questions/generate-quiz", address);

    // Unknown slug
    let (status, body) = post_json(
        &client,
        url.clone(),
        json!({ "topicSlugs": ["bogus"], "questionCount": 5, "mode": "practice" }),
    )
    .await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("bogus"));

    // Count out of range
    let (status, _) = post_json(
        &client,
        url.clone(),
        json!({ "topicSlugs": ["thermo"], "questionCount": 0, "mode": "practice" }),
    )
    .await;
    assert_eq!(status, 400);

    // Nothing to draw from
    let (status, _) = post_json(
        &client,
        url.clone(),
        json!({ "topicSlugs": ["empty"], "questionCount": 5, "mode": "immediate" }),
    )
    .await;
    assert_eq!(status, 422);

    // Unknown mode is rejected by the JSON extractor
    let (status, _) = post_json(
        &client,
        url,
        json!({ "topicSlugs": ["thermo"], "questionCount": 5, "mode": "exam" }),
    )
    .await;
    assert_eq!(status, 422);
}

#[tokio::test]
async fn immediate_session_flow() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let (status, view) = post_json(
        &client,
        format!("{}/api/sessions", address),
        json!({ "topicSlugs": ["thermo"], "questionCount": 2, "mode": "immediate" }),
    )
    .await;
    assert_eq!(status, 201);
    assert_eq!(view["totalQuestions"], 2);
    assert!(view["currentQuestion"].get("correctAnswer").is_none());
    let id = view["id"].as_str().unwrap().to_string();
    let base = format!("{}/api/sessions/{}", address, id);

    // Advancing before answering is not allowed
    let (status, _) = post_json(&client, format!("{}/advance", base), json!({})).await;
    assert_eq!(status, 409);

    // First pick is recorded and feedback shown
    let (status, body) = post_json(&client, format!("{}/select", base), json!({ "answer": "B" })).await;
    assert_eq!(status, 200);
    assert_eq!(body["accepted"], true);
    assert_eq!(body["session"]["feedbackVisible"], true);
    assert_eq!(body["session"]["currentQuestion"]["correctAnswer"], "A");
    assert_eq!(body["session"]["currentAnswer"]["isCorrect"], false);

    // Second pick is ignored
    let (status, body) = post_json(&client, format!("{}/select", base), json!({ "answer": "A" })).await;
    assert_eq!(status, 200);
    assert_eq!(body["accepted"], false);
    assert_eq!(body["session"]["selectedAnswer"], "B");

    // Next question, answer correctly, advance past the end
    let (status, view) = post_json(&client, format!("{}/advance", base), json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(view["currentIndex"], 1);
    post_json(&client, format!("{}/submit", base), json!({ "answer": "A" })).await;
    let (status, view) = post_json(&client, format!("{}/advance", base), json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(view["status"], "completed");
    assert_eq!(view["summary"]["score"], 1);
    assert_eq!(view["summary"]["totalQuestions"], 2);
    assert_eq!(view["summary"]["percentage"], 50);

    // Completed sessions reject further actions
    let (status, _) = post_json(&client, format!("{}/select", base), json!({ "answer": "A" })).await;
    assert_eq!(status, 409);

    let (status, history) = get_json(&client, format!("{}/api/history", address)).await;
    assert_eq!(status, 200);
    assert_eq!(history[0]["id"], id);
    assert_eq!(history[0]["topics"], json!(["Thermodynamics"]));
}

#[tokio::test]
async fn practice_session_allows_changes_and_early_completion() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let (_, view) = post_json(
        &client,
        format!("{}/api/sessions", address),
        json!({
            "topicSlugs": ["reactors", "thermo"],
            "questionCount": 4,
            "mode": "practice",
            "distributionStrategy": "proportional"
        }),
    )
    .await;
    let base = format!("{}/api/sessions/{}", address, view["id"].as_str().unwrap());

    // Change of mind before moving on
    post_json(&client, format!("{}/select", base), json!({ "answer": "C" })).await;
    let (_, body) = post_json(&client, format!("{}/select", base), json!({ "answer": "A" })).await;
    assert_eq!(body["accepted"], true);
    assert_eq!(body["session"]["feedbackVisible"], false);
    assert!(body["session"]["currentQuestion"].get("correctAnswer").is_none());

    let (_, view) = post_json(&client, format!("{}/advance", base), json!({})).await;
    assert_eq!(view["answeredCount"], 1);

    let (_, view) = post_json(&client, format!("{}/retreat", base), json!({})).await;
    assert_eq!(view["currentIndex"], 0);
    assert_eq!(view["selectedAnswer"], "A");

    let (status, view) = post_json(&client, format!("{}/complete", base), json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(view["summary"]["score"], 1);
    assert_eq!(view["summary"]["answeredCount"], 1);
    assert_eq!(view["summary"]["totalQuestions"], 4);

    let (status, view) = get_json(&client, base).await;
    assert_eq!(status, 200);
    assert_eq!(view["status"], "completed");
    assert!(view["currentQuestion"].is_null());
}
