//! services/api/src/web/exams.rs
//!
//! Handlers for test generation, taking, and history.
//!
//! Generation dispatches the single-stage test-creator pipeline and parses
//! its JSON output; a parse failure surfaces the raw model text to the
//! user and installs nothing. Submission grades the current test, appends
//! one result to the history, and clears the test and its scratchpad.

use crate::web::protocol::{
    reject, reject_with_artifact, CurrentTestResponse, GenerateTestRequest, HandlerError,
    QuestionReview, RecordAnswerRequest, SubmitTestRequest, SubmitTestResponse,
    TakeQuestion, TestHistoryResponse,
};
use crate::web::state::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
};
use chrono::Utc;
use std::sync::Arc;
use study_companion_core::domain::Test;
use study_companion_core::keystore::StoreError;
use study_companion_core::pipeline::{extract_question_payload, test_generation_pipeline};
use tracing::{error, info, warn};

fn take_view(test: &Test) -> CurrentTestResponse {
    CurrentTestResponse {
        subject: test.subject.clone(),
        test_type: test.test_type,
        difficulty: test.difficulty,
        questions: test
            .questions
            .iter()
            .map(|q| TakeQuestion {
                question: q.question.clone(),
                options: q.options.clone(),
            })
            .collect(),
    }
}

/// Generates a new test for a named subject and installs it as the
/// namespace's current test.
pub async fn generate_test_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<GenerateTestRequest>,
) -> Result<Json<CurrentTestResponse>, HandlerError> {
    let scope = app_state.scope(&headers).await;

    let subjects = app_state.store.subjects(&scope.namespace).await;
    let subject = subjects
        .iter()
        .find(|s| s.name.eq_ignore_ascii_case(&payload.subject))
        .cloned()
        .ok_or_else(|| {
            reject(
                StatusCode::NOT_FOUND,
                format!("Unknown subject '{}'", payload.subject),
            )
        })?;

    let credential = scope.credential.as_deref().ok_or_else(|| {
        reject(
            StatusCode::UNAUTHORIZED,
            "Please configure your Gemini API key first",
        )
    })?;

    let stages = test_generation_pipeline(&subject, payload.test_type, payload.difficulty);
    let raw = app_state
        .executor
        .run_pipeline(credential, &stages)
        .await
        .map_err(|e| {
            error!("Test generation failed: {}", e);
            reject(
                StatusCode::BAD_GATEWAY,
                format!("Error generating test: {}", e),
            )
        })?;

    let questions = extract_question_payload(&raw).map_err(|e| {
        warn!("Test generation output was not parseable JSON");
        reject_with_artifact(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Error parsing test. Please try again.",
            e.raw,
        )
    })?;

    let test = Test {
        subject: subject.name.clone(),
        test_type: payload.test_type,
        difficulty: payload.difficulty,
        questions,
        created_at: Utc::now(),
    };
    let view = take_view(&test);

    app_state.store.install_test(&scope.namespace, test).await;
    info!(
        "Installed {} question test on '{}' for {}",
        view.questions.len(),
        subject.name,
        scope.namespace.as_str()
    );
    Ok(Json(view))
}

/// Returns the current test without correct answers or explanations.
pub async fn current_test_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<CurrentTestResponse>, HandlerError> {
    let scope = app_state.scope(&headers).await;
    match app_state.store.current_test(&scope.namespace).await {
        Some(test) => Ok(Json(take_view(&test))),
        None => Err(reject(
            StatusCode::NOT_FOUND,
            "No active test. Create a test first!",
        )),
    }
}

/// Records a single answer in the current test's scratchpad.
pub async fn record_answer_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<RecordAnswerRequest>,
) -> Result<StatusCode, HandlerError> {
    let scope = app_state.scope(&headers).await;
    match app_state
        .store
        .record_answer(&scope.namespace, payload.question_index, payload.answer)
        .await
    {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(StoreError::NoCurrentTest) => Err(reject(
            StatusCode::NOT_FOUND,
            "No active test. Create a test first!",
        )),
        Err(StoreError::QuestionIndexOutOfRange(idx)) => Err(reject(
            StatusCode::BAD_REQUEST,
            format!("No question at index {}", idx),
        )),
        Err(e) => Err(reject(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

/// Submits the current test. Answers supplied here are merged over the
/// scratchpad (submitted answers win).
pub async fn submit_test_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<SubmitTestRequest>,
) -> Result<Json<SubmitTestResponse>, HandlerError> {
    let scope = app_state.scope(&headers).await;

    // Capture answers for the review before they are consumed by grading.
    let snapshot = app_state.store.snapshot(&scope.namespace).await;
    let mut merged = snapshot.test_answers.clone();
    merged.extend(payload.answers.clone());

    match app_state
        .store
        .submit_test(&scope.namespace, payload.answers)
        .await
    {
        Ok((test, result)) => {
            let review = test
                .questions
                .iter()
                .enumerate()
                .map(|(idx, q)| {
                    let your_answer = merged.get(&idx).cloned();
                    let is_correct = your_answer.as_deref() == Some(q.correct.as_str());
                    QuestionReview {
                        question: q.question.clone(),
                        your_answer,
                        correct: q.correct.clone(),
                        explanation: q.explanation.clone(),
                        is_correct,
                    }
                })
                .collect();

            info!(
                "Test submitted for {}: {:.1}% ({}/{})",
                scope.namespace.as_str(),
                result.score,
                result.correct,
                result.total
            );
            Ok(Json(SubmitTestResponse { result, review }))
        }
        Err(StoreError::NoCurrentTest) => Err(reject(
            StatusCode::NOT_FOUND,
            "No active test. Create a test first!",
        )),
        Err(e) => Err(reject(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

/// Returns the namespace's test history, newest first.
pub async fn test_history_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<TestHistoryResponse>, HandlerError> {
    let scope = app_state.scope(&headers).await;
    let mut history = app_state.store.test_history(&scope.namespace).await;
    history.reverse();
    Ok(Json(TestHistoryResponse { history }))
}
