//! services/api/src/web/routine.rs
//!
//! Handlers for the study-routine pipeline. Generation is a single
//! blocking interaction: validate, dispatch the one-stage pipeline, and
//! store the resulting schedule blob for the namespace.

use crate::web::protocol::{reject, HandlerError, RoutineRequest, RoutineResponse};
use crate::web::state::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
};
use std::sync::Arc;
use study_companion_core::domain::RoutineConstraints;
use study_companion_core::pipeline::study_routine_pipeline;
use tracing::{error, info};

/// Generates a weekly study routine from the namespace's subjects.
///
/// Fails fast (before any dispatch) when there are no subjects or no
/// credential; an executor failure leaves the stored routine untouched.
pub async fn generate_routine_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<RoutineRequest>,
) -> Result<Json<RoutineResponse>, HandlerError> {
    let scope = app_state.scope(&headers).await;

    let subjects = app_state.store.subjects(&scope.namespace).await;
    if subjects.is_empty() {
        return Err(reject(
            StatusCode::BAD_REQUEST,
            "Please add subjects first before generating a routine",
        ));
    }

    let credential = scope.credential.as_deref().ok_or_else(|| {
        reject(
            StatusCode::UNAUTHORIZED,
            "Please configure your Gemini API key first",
        )
    })?;

    let constraints = RoutineConstraints {
        hours_per_day: payload.hours_per_day,
        preferred_time: payload.preferred_time,
        break_interval_minutes: payload.break_interval_minutes,
        break_duration_minutes: payload.break_duration_minutes,
    };

    let stages = study_routine_pipeline(&subjects, &constraints);
    match app_state.executor.run_pipeline(credential, &stages).await {
        Ok(routine) => {
            app_state
                .store
                .set_routine(&scope.namespace, routine.clone())
                .await;
            info!("Stored study routine for {}", scope.namespace.as_str());
            Ok(Json(RoutineResponse {
                routine: Some(routine),
            }))
        }
        Err(e) => {
            error!("Routine generation failed: {}", e);
            Err(reject(
                StatusCode::BAD_GATEWAY,
                format!("Error generating routine: {}", e),
            ))
        }
    }
}

/// Returns the stored routine, if any.
pub async fn get_routine_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<RoutineResponse>, HandlerError> {
    let scope = app_state.scope(&headers).await;
    let routine = app_state.store.routine(&scope.namespace).await;
    Ok(Json(RoutineResponse { routine }))
}

/// Clears the stored routine.
pub async fn clear_routine_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<StatusCode, HandlerError> {
    let scope = app_state.scope(&headers).await;
    app_state.store.clear_routine(&scope.namespace).await;
    Ok(StatusCode::NO_CONTENT)
}
