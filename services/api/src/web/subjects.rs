//! services/api/src/web/subjects.rs
//!
//! Handlers for managing subjects and their syllabus topics. These are
//! pure keystore operations: no pipeline is dispatched.

use crate::web::protocol::{
    reject, AddSubjectRequest, HandlerError, SubjectListResponse, SubjectRemovedResponse,
};
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use chrono::Utc;
use std::sync::Arc;
use study_companion_core::domain::Subject;
use study_companion_core::keystore::StoreError;
use tracing::info;

/// Adds a subject. Duplicate names (case-insensitive) are rejected before
/// any state is mutated.
pub async fn add_subject_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<AddSubjectRequest>,
) -> Result<(StatusCode, Json<Subject>), HandlerError> {
    let scope = app_state.scope(&headers).await;

    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(reject(
            StatusCode::BAD_REQUEST,
            "Subject name must not be empty",
        ));
    }

    let topics: Vec<String> = payload
        .topics
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    let subject = Subject {
        name: name.clone(),
        syllabus: topics,
        difficulty: payload.difficulty,
        priority: payload.priority,
        hours_per_week: payload.hours_per_week,
        added_date: Utc::now().date_naive(),
    };

    match app_state
        .store
        .add_subject(&scope.namespace, subject.clone())
        .await
    {
        Ok(()) => {
            info!("Added subject '{}' to {}", name, scope.namespace.as_str());
            Ok((StatusCode::CREATED, Json(subject)))
        }
        Err(StoreError::DuplicateSubject(name)) => Err(reject(
            StatusCode::CONFLICT,
            format!("Subject '{}' already exists!", name),
        )),
        Err(e) => Err(reject(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

/// Lists the namespace's subjects in insertion order.
pub async fn list_subjects_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SubjectListResponse>, HandlerError> {
    let scope = app_state.scope(&headers).await;
    let subjects = app_state.store.subjects(&scope.namespace).await;
    Ok(Json(SubjectListResponse { subjects }))
}

/// Removes the subject at the given index along with its syllabus entry.
pub async fn remove_subject_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(index): Path<usize>,
) -> Result<Json<SubjectRemovedResponse>, HandlerError> {
    let scope = app_state.scope(&headers).await;

    match app_state.store.remove_subject(&scope.namespace, index).await {
        Ok(removed) => {
            info!(
                "Removed subject '{}' from {}",
                removed.name,
                scope.namespace.as_str()
            );
            Ok(Json(SubjectRemovedResponse { removed }))
        }
        Err(StoreError::SubjectIndexOutOfRange(_)) => Err(reject(
            StatusCode::NOT_FOUND,
            format!("No subject at index {}", index),
        )),
        Err(e) => Err(reject(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}
