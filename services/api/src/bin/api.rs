//! services/api/src/bin/api.rs

use api_lib::{
    adapters::CrewAdapter,
    config::Config,
    error::ApiError,
    web::{
        chat::{
            clear_definitions_handler, clear_homework_handler, definition_message_handler,
            definition_transcript_handler, homework_message_handler, homework_transcript_handler,
        },
        exams::{
            current_test_handler, generate_test_handler, record_answer_handler,
            submit_test_handler, test_history_handler,
        },
        outreach::{lead_email_handler, outreach_email_handler},
        rest::ApiDoc,
        routine::{clear_routine_handler, generate_routine_handler, get_routine_handler},
        state::AppState,
        status_handler,
        subjects::{add_subject_handler, list_subjects_handler, remove_subject_handler},
    },
};
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use study_companion_core::keystore::SessionStore;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");
    if config.gemini_api_key.is_some() {
        info!("Fallback API key configured from environment.");
    }

    // --- 2. Initialize the Keystore and Executor Adapter ---
    let store = Arc::new(SessionStore::new());
    let executor = Arc::new(CrewAdapter::new(
        config.llm_model.clone(),
        config.llm_api_base.clone(),
        config.scrape_max_chars,
    ));

    // --- 3. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        store,
        executor,
        config: config.clone(),
    });

    // --- 4. Create the Web Router ---
    let api_router = Router::new()
        .route("/status", get(status_handler))
        .route(
            "/subjects",
            post(add_subject_handler).get(list_subjects_handler),
        )
        .route("/subjects/{index}", delete(remove_subject_handler))
        .route(
            "/routine",
            post(generate_routine_handler)
                .get(get_routine_handler)
                .delete(clear_routine_handler),
        )
        .route("/tests", post(generate_test_handler))
        .route("/tests/current", get(current_test_handler))
        .route("/tests/answers", post(record_answer_handler))
        .route("/tests/submit", post(submit_test_handler))
        .route("/tests/history", get(test_history_handler))
        .route(
            "/chat/homework",
            post(homework_message_handler)
                .get(homework_transcript_handler)
                .delete(clear_homework_handler),
        )
        .route(
            "/chat/definitions",
            post(definition_message_handler)
                .get(definition_transcript_handler)
                .delete(clear_definitions_handler),
        )
        .route("/outreach/lead", post(lead_email_handler))
        .route("/outreach/email", post(outreach_email_handler))
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
