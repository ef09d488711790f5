//! services/api/tests/session_flow.rs
//!
//! Integration tests driving the real handlers against a scripted
//! pipeline executor. No network calls are made: the executor either
//! returns canned text or fails on command, and records every pipeline
//! it was asked to run.

use api_lib::config::Config;
use api_lib::web::chat::{homework_message_handler, homework_transcript_handler};
use api_lib::web::exams::{
    current_test_handler, generate_test_handler, submit_test_handler, test_history_handler,
};
use api_lib::web::routine::{generate_routine_handler, get_routine_handler};
use api_lib::web::state::{AppState, API_KEY_HEADER};
use api_lib::web::subjects::{add_subject_handler, list_subjects_handler};
use api_lib::web::protocol::{
    AddSubjectRequest, ChatRequest, GenerateTestRequest, RoutineRequest, SubmitTestRequest,
};
use async_trait::async_trait;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::Json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use study_companion_core::domain::{Difficulty, Priority, TestDifficulty, TestType};
use study_companion_core::keystore::SessionStore;
use study_companion_core::pipeline::StageSpec;
use study_companion_core::ports::{PipelineExecutor, PortError, PortResult};
use tokio::sync::Mutex;
use tracing::Level;

/// What the scripted executor should do for one call.
enum Script {
    Reply(String),
    Fail(String),
}

/// A `PipelineExecutor` that replays a script and records the pipelines
/// it receives.
struct ScriptedExecutor {
    script: Mutex<Vec<Script>>,
    calls: Mutex<Vec<Vec<StageSpec>>>,
}

impl ScriptedExecutor {
    fn new(script: Vec<Script>) -> Self {
        Self {
            script: Mutex::new(script),
            calls: Mutex::new(Vec::new()),
        }
    }

    async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

#[async_trait]
impl PipelineExecutor for ScriptedExecutor {
    async fn run_pipeline(&self, _credential: &str, stages: &[StageSpec]) -> PortResult<String> {
        self.calls.lock().await.push(stages.to_vec());
        let mut script = self.script.lock().await;
        if script.is_empty() {
            return Err(PortError::Unexpected("script exhausted".to_string()));
        }
        match script.remove(0) {
            Script::Reply(text) => Ok(text),
            Script::Fail(message) => Err(PortError::StageFailed {
                stage: "scripted".to_string(),
                message,
            }),
        }
    }
}

fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse::<SocketAddr>().unwrap(),
        log_level: Level::INFO,
        gemini_api_key: None,
        llm_model: "test-model".to_string(),
        llm_api_base: "http://localhost".to_string(),
        scrape_max_chars: 8000,
    }
}

fn app_with(executor: Arc<ScriptedExecutor>) -> Arc<AppState> {
    Arc::new(AppState {
        store: Arc::new(SessionStore::new()),
        executor,
        config: Arc::new(test_config()),
    })
}

fn keyed_headers(key: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(API_KEY_HEADER, HeaderValue::from_str(key).unwrap());
    headers
}

fn subject_payload(name: &str) -> AddSubjectRequest {
    AddSubjectRequest {
        name: name.to_string(),
        topics: vec![
            "Algebra".to_string(),
            "Geometry".to_string(),
            "Calculus".to_string(),
            "Statistics".to_string(),
        ],
        difficulty: Difficulty::Medium,
        priority: Priority::High,
        hours_per_week: 5,
    }
}

fn routine_payload() -> RoutineRequest {
    RoutineRequest {
        hours_per_day: 4,
        preferred_time: "Morning (6AM-12PM)".to_string(),
        break_interval_minutes: 30,
        break_duration_minutes: 10,
    }
}

/// Ten questions whose correct answer is always "A", wrapped in prose.
fn noisy_test_json() -> String {
    let questions: Vec<String> = (0..10)
        .map(|i| {
            format!(
                r#"{{"question":"Q{}","options":["A. a","B. b","C. c","D. d"],"correct":"A","explanation":"a is right"}}"#,
                i
            )
        })
        .collect();
    format!(
        "Here is your test:\n{{\"questions\":[{}]}}\nGood luck!",
        questions.join(",")
    )
}

#[tokio::test]
async fn missing_credential_blocks_dispatch() {
    let executor = Arc::new(ScriptedExecutor::new(vec![Script::Reply("x".into())]));
    let app = app_with(executor.clone());

    // A subject exists, but no API key is supplied and there is no fallback.
    add_subject_handler(
        State(app.clone()),
        HeaderMap::new(),
        Json(subject_payload("Math")),
    )
    .await
    .unwrap();

    let err = generate_routine_handler(State(app), HeaderMap::new(), Json(routine_payload()))
        .await
        .unwrap_err();

    assert_eq!(err.0, StatusCode::UNAUTHORIZED);
    assert_eq!(executor.call_count().await, 0, "no pipeline call is made");
}

#[tokio::test]
async fn routine_generation_stores_the_schedule() {
    let executor = Arc::new(ScriptedExecutor::new(vec![Script::Reply(
        "Monday: Algebra.".to_string(),
    )]));
    let app = app_with(executor.clone());
    let headers = keyed_headers("alice-key");

    add_subject_handler(
        State(app.clone()),
        keyed_headers("alice-key"),
        Json(subject_payload("Math")),
    )
    .await
    .unwrap();

    let response = generate_routine_handler(
        State(app.clone()),
        keyed_headers("alice-key"),
        Json(routine_payload()),
    )
    .await
    .unwrap();
    assert_eq!(response.0.routine.as_deref(), Some("Monday: Algebra."));

    // The routine is persisted for the namespace.
    let stored = get_routine_handler(State(app), headers).await.unwrap();
    assert_eq!(stored.0.routine.as_deref(), Some("Monday: Algebra."));
    assert_eq!(executor.call_count().await, 1);
}

#[tokio::test]
async fn executor_failure_leaves_state_untouched() {
    let executor = Arc::new(ScriptedExecutor::new(vec![
        Script::Reply("old routine".to_string()),
        Script::Fail("provider unavailable".to_string()),
    ]));
    let app = app_with(executor);

    add_subject_handler(
        State(app.clone()),
        keyed_headers("k"),
        Json(subject_payload("Math")),
    )
    .await
    .unwrap();
    generate_routine_handler(State(app.clone()), keyed_headers("k"), Json(routine_payload()))
        .await
        .unwrap();

    let err =
        generate_routine_handler(State(app.clone()), keyed_headers("k"), Json(routine_payload()))
            .await
            .unwrap_err();
    assert_eq!(err.0, StatusCode::BAD_GATEWAY);
    assert!(err.1 .0.message.contains("provider unavailable"));

    // The previous routine and the subject list are exactly as they were.
    let stored = get_routine_handler(State(app.clone()), keyed_headers("k"))
        .await
        .unwrap();
    assert_eq!(stored.0.routine.as_deref(), Some("old routine"));
    let subjects = list_subjects_handler(State(app), keyed_headers("k"))
        .await
        .unwrap();
    assert_eq!(subjects.0.subjects.len(), 1);
}

#[tokio::test]
async fn test_generation_parses_noisy_json_and_installs_current_test() {
    let executor = Arc::new(ScriptedExecutor::new(vec![Script::Reply(noisy_test_json())]));
    let app = app_with(executor);

    add_subject_handler(
        State(app.clone()),
        keyed_headers("k"),
        Json(subject_payload("Math")),
    )
    .await
    .unwrap();

    let response = generate_test_handler(
        State(app.clone()),
        keyed_headers("k"),
        Json(GenerateTestRequest {
            subject: "Math".to_string(),
            test_type: TestType::Standard,
            difficulty: TestDifficulty::Medium,
        }),
    )
    .await
    .unwrap();
    assert_eq!(response.0.questions.len(), 10);

    let current = current_test_handler(State(app), keyed_headers("k"))
        .await
        .unwrap();
    assert_eq!(current.0.subject, "Math");
    assert_eq!(current.0.questions.len(), 10);
}

#[tokio::test]
async fn unparseable_test_output_surfaces_raw_text_and_installs_nothing() {
    let raw = "Sorry, I could not produce a test today.";
    let executor = Arc::new(ScriptedExecutor::new(vec![Script::Reply(raw.to_string())]));
    let app = app_with(executor);

    add_subject_handler(
        State(app.clone()),
        keyed_headers("k"),
        Json(subject_payload("Math")),
    )
    .await
    .unwrap();

    let err = generate_test_handler(
        State(app.clone()),
        keyed_headers("k"),
        Json(GenerateTestRequest {
            subject: "Math".to_string(),
            test_type: TestType::Quick,
            difficulty: TestDifficulty::Easy,
        }),
    )
    .await
    .unwrap_err();

    assert_eq!(err.0, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err.1 .0.raw_output.as_deref(), Some(raw));

    let current = current_test_handler(State(app), keyed_headers("k")).await;
    assert!(current.is_err(), "no test must be installed");
}

#[tokio::test]
async fn submitting_a_test_grades_and_clears_it() {
    let executor = Arc::new(ScriptedExecutor::new(vec![Script::Reply(noisy_test_json())]));
    let app = app_with(executor);

    add_subject_handler(
        State(app.clone()),
        keyed_headers("k"),
        Json(subject_payload("Math")),
    )
    .await
    .unwrap();
    generate_test_handler(
        State(app.clone()),
        keyed_headers("k"),
        Json(GenerateTestRequest {
            subject: "Math".to_string(),
            test_type: TestType::Standard,
            difficulty: TestDifficulty::Medium,
        }),
    )
    .await
    .unwrap();

    // Seven right ("A"), three wrong.
    let mut answers = HashMap::new();
    for idx in 0..7 {
        answers.insert(idx, "A".to_string());
    }
    for idx in 7..10 {
        answers.insert(idx, "C".to_string());
    }

    let response = submit_test_handler(
        State(app.clone()),
        keyed_headers("k"),
        Json(SubmitTestRequest { answers }),
    )
    .await
    .unwrap();

    let result = &response.0.result;
    assert_eq!(result.correct, 7);
    assert_eq!(result.total, 10);
    assert!((result.score - 70.0).abs() < f64::EPSILON);
    assert_eq!(response.0.review.len(), 10);
    assert!(response.0.review[0].is_correct);
    assert!(!response.0.review[9].is_correct);

    // History gained exactly one entry; the current test is gone.
    let history = test_history_handler(State(app.clone()), keyed_headers("k"))
        .await
        .unwrap();
    assert_eq!(history.0.history.len(), 1);
    assert!(current_test_handler(State(app), keyed_headers("k"))
        .await
        .is_err());
}

#[tokio::test]
async fn successful_chat_turn_appends_both_messages() {
    let executor = Arc::new(ScriptedExecutor::new(vec![
        Script::Reply("Photosynthesis converts light to energy.".to_string()),
        Script::Fail("timeout".to_string()),
    ]));
    let app = app_with(executor);

    let response = homework_message_handler(
        State(app.clone()),
        keyed_headers("k"),
        Json(ChatRequest {
            message: "Explain photosynthesis".to_string(),
        }),
    )
    .await
    .unwrap();
    assert!(response.0.reply.contains("Photosynthesis"));

    let transcript = homework_transcript_handler(State(app.clone()), keyed_headers("k")).await;
    assert_eq!(transcript.0.messages.len(), 2);

    // A failing turn must not grow the transcript at all.
    let err = homework_message_handler(
        State(app.clone()),
        keyed_headers("k"),
        Json(ChatRequest {
            message: "Another question".to_string(),
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.0, StatusCode::BAD_GATEWAY);

    let transcript = homework_transcript_handler(State(app), keyed_headers("k")).await;
    assert_eq!(transcript.0.messages.len(), 2);
}

#[tokio::test]
async fn different_keys_observe_disjoint_data() {
    let executor = Arc::new(ScriptedExecutor::new(vec![]));
    let app = app_with(executor);

    add_subject_handler(
        State(app.clone()),
        keyed_headers("alice-key"),
        Json(subject_payload("History")),
    )
    .await
    .unwrap();

    let bobs = list_subjects_handler(State(app.clone()), keyed_headers("bob-key"))
        .await
        .unwrap();
    assert!(bobs.0.subjects.is_empty());

    let alices = list_subjects_handler(State(app), keyed_headers("alice-key"))
        .await
        .unwrap();
    assert_eq!(alices.0.subjects.len(), 1);
    assert_eq!(alices.0.subjects[0].name, "History");
}
