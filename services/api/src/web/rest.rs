//! services/api/src/web/rest.rs
//!
//! Contains the status endpoint and the master definition for the
//! OpenAPI specification.

use crate::web::protocol::StatusResponse;
use crate::web::state::AppState;
use axum::{extract::State, http::HeaderMap, response::Json};
use std::sync::Arc;
use utoipa::OpenApi;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        status_handler,
    ),
    components(
        schemas(StatusResponse)
    ),
    tags(
        (name = "Study Companion API", description = "API endpoints for subjects, study routines, tests, and AI assistants.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Returns the progress summary for the caller's namespace.
///
/// The namespace is derived from the `x-api-key` header; requests without
/// a key read the shared namespace.
#[utoipa::path(
    get,
    path = "/status",
    responses(
        (status = 200, description = "Namespace progress summary", body = StatusResponse)
    ),
    params(
        ("x-api-key" = Option<String>, Header, description = "The caller's model-provider API key.")
    )
)]
pub async fn status_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<StatusResponse> {
    let scope = app_state.scope(&headers).await;
    let data = app_state.store.snapshot(&scope.namespace).await;

    let tests_taken = data.test_history.len();
    let average_score = if tests_taken == 0 {
        0.0
    } else {
        data.test_history.iter().map(|t| t.score).sum::<f64>() / tests_taken as f64
    };

    Json(StatusResponse {
        namespace: scope.namespace.as_str().to_string(),
        subjects: data.subjects.len(),
        tests_taken,
        average_score,
    })
}
