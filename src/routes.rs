// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::{
    handlers::{health, question, quiz, session, topic},
    state::AppState,
};

fn cors_layer(origin: &str) -> CorsLayer {
    let allow_origin = match origin.parse::<HeaderValue>() {
        Ok(value) => AllowOrigin::exact(value),
        Err(_) => {
            tracing::warn!("Invalid CORS_ORIGIN '{}', allowing no cross-origin requests", origin);
            AllowOrigin::list(Vec::<HeaderValue>::new())
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

/// Assembles the main application router.
///
/// * Merges all sub-routers (topics, questions, sessions, history).
/// * Serves question images from the configured directory.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origin);
    let images = ServeDir::new(&state.config.images_dir);

    let topic_routes = Router::new()
        .route("/", get(topic::list_topics))
        .route("/validate", post(topic::validate_topics))
        .route("/{slug}", get(topic::get_topic));

    let question_routes = Router::new()
        .route("/", get(question::list_questions))
        .route("/stats", get(question::question_stats))
        .route("/validate", get(question::validate_questions))
        .route("/generate-quiz", post(quiz::generate_quiz))
        .route("/{id}", get(question::get_question));

    let session_routes = Router::new()
        .route("/", post(session::create_session))
        .route("/{id}", get(session::get_session))
        .route("/{id}/select", post(session::select_answer))
        .route("/{id}/submit", post(session::submit_answer))
        .route("/{id}/advance", post(session::advance))
        .route("/{id}/retreat", post(session::retreat))
        .route("/{id}/complete", post(session::complete));

    Router::new()
        .route("/health", get(health::health))
        .route("/health/db", get(health::health_db))
        .route("/api", get(health::api_index))
        .route("/api/history", get(session::history))
        .nest("/api/topics", topic_routes)
        .nest("/api/questions", question_routes)
        .nest("/api/sessions", session_routes)
        .nest_service("/api/images", images)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
