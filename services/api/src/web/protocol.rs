//! services/api/src/web/protocol.rs
//!
//! Defines the request and response payloads exchanged with clients,
//! plus the uniform error body returned by every handler.

use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use study_companion_core::domain::{
    ChatMessage, Difficulty, Priority, Subject, TestDifficulty, TestResult, TestType,
};
use utoipa::ToSchema;

//=========================================================================================
// Uniform error body
//=========================================================================================

/// The error payload every handler returns on failure. `raw_output` is
/// only present for output-shape failures, where the unparseable model
/// text is surfaced to the user instead of being discarded.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
}

/// Convenience alias for the error half of every handler result.
pub type HandlerError = (StatusCode, Json<ErrorBody>);

/// Builds a plain handler error.
pub fn reject(status: StatusCode, message: impl Into<String>) -> HandlerError {
    (
        status,
        Json(ErrorBody {
            message: message.into(),
            raw_output: None,
        }),
    )
}

/// Builds the output-shape error that carries the raw model text.
pub fn reject_with_artifact(
    status: StatusCode,
    message: impl Into<String>,
    raw_output: String,
) -> HandlerError {
    (
        status,
        Json(ErrorBody {
            message: message.into(),
            raw_output: Some(raw_output),
        }),
    )
}

//=========================================================================================
// Subjects
//=========================================================================================

#[derive(Debug, Deserialize)]
pub struct AddSubjectRequest {
    pub name: String,
    /// Ordered syllabus topics. Blank entries are dropped.
    pub topics: Vec<String>,
    pub difficulty: Difficulty,
    pub priority: Priority,
    pub hours_per_week: u32,
}

#[derive(Debug, Serialize)]
pub struct SubjectListResponse {
    pub subjects: Vec<Subject>,
}

#[derive(Debug, Serialize)]
pub struct SubjectRemovedResponse {
    pub removed: Subject,
}

//=========================================================================================
// Study routine
//=========================================================================================

#[derive(Debug, Deserialize)]
pub struct RoutineRequest {
    pub hours_per_day: u32,
    pub preferred_time: String,
    pub break_interval_minutes: u32,
    pub break_duration_minutes: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoutineResponse {
    pub routine: Option<String>,
}

//=========================================================================================
// Tests & exams
//=========================================================================================

#[derive(Debug, Deserialize)]
pub struct GenerateTestRequest {
    pub subject: String,
    pub test_type: TestType,
    pub difficulty: TestDifficulty,
}

/// A question as shown while taking a test: no correct answer, no
/// explanation.
#[derive(Debug, Serialize, Deserialize)]
pub struct TakeQuestion {
    pub question: String,
    pub options: Vec<String>,
}

/// The current test as shown to the taker.
#[derive(Debug, Serialize, Deserialize)]
pub struct CurrentTestResponse {
    pub subject: String,
    pub test_type: TestType,
    pub difficulty: TestDifficulty,
    pub questions: Vec<TakeQuestion>,
}

#[derive(Debug, Deserialize)]
pub struct RecordAnswerRequest {
    pub question_index: usize,
    /// The chosen option label, "A" through "D".
    pub answer: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct SubmitTestRequest {
    /// Question index -> chosen option label. Merged over any answers
    /// already recorded one at a time; these win on conflict.
    #[serde(default)]
    pub answers: HashMap<usize, String>,
}

/// Per-question breakdown returned after submission.
#[derive(Debug, Serialize, Deserialize)]
pub struct QuestionReview {
    pub question: String,
    pub your_answer: Option<String>,
    pub correct: String,
    pub explanation: String,
    pub is_correct: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitTestResponse {
    pub result: TestResult,
    pub review: Vec<QuestionReview>,
}

#[derive(Debug, Serialize)]
pub struct TestHistoryResponse {
    /// Newest first.
    pub history: Vec<TestResult>,
}

//=========================================================================================
// Chats
//=========================================================================================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
}

#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub messages: Vec<ChatMessage>,
}

//=========================================================================================
// Outreach emails
//=========================================================================================

#[derive(Debug, Deserialize)]
pub struct LeadEmailRequest {
    pub target_url: String,
}

#[derive(Debug, Deserialize)]
pub struct OutreachEmailRequest {
    pub sender_name: String,
    pub target_company: String,
    pub target_person: Option<String>,
    pub target_role: Option<String>,
    pub purpose: String,
    pub additional_context: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EmailResponse {
    pub email: String,
}

//=========================================================================================
// Status
//=========================================================================================

/// The namespace-scoped progress summary.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    /// The active namespace id: a credential fingerprint or "shared".
    pub namespace: String,
    pub subjects: usize,
    pub tests_taken: usize,
    pub average_score: f64,
}
