//! services/api/src/web/outreach.rs
//!
//! Handlers for the two cold-email pipelines. Both are stateless: the
//! generated email is returned directly and nothing is written to the
//! keystore.

use crate::web::protocol::{
    reject, EmailResponse, HandlerError, LeadEmailRequest, OutreachEmailRequest,
};
use crate::web::state::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
};
use std::sync::Arc;
use study_companion_core::domain::OutreachBrief;
use study_companion_core::pipeline::{lead_qualification_pipeline, outreach_pipeline};
use tracing::error;

/// Researches a target website, matches it to one of the fixed agency
/// services, and drafts a cold email of at most 150 words.
pub async fn lead_email_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<LeadEmailRequest>,
) -> Result<Json<EmailResponse>, HandlerError> {
    let scope = app_state.scope(&headers).await;

    let target_url = payload.target_url.trim();
    if target_url.is_empty() {
        return Err(reject(
            StatusCode::BAD_REQUEST,
            "Please enter a target website URL!",
        ));
    }

    let credential = scope.credential.as_deref().ok_or_else(|| {
        reject(
            StatusCode::UNAUTHORIZED,
            "Please enter your Gemini API Key first!",
        )
    })?;

    let stages = lead_qualification_pipeline(target_url);
    let email = app_state
        .executor
        .run_pipeline(credential, &stages)
        .await
        .map_err(|e| {
            error!("Lead email generation failed: {}", e);
            reject(
                StatusCode::BAD_GATEWAY,
                format!("Error generating email: {}", e),
            )
        })?;

    Ok(Json(EmailResponse { email }))
}

/// Drafts an outreach email (subject line plus 150-200 word body) from a
/// sender/target brief.
pub async fn outreach_email_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<OutreachEmailRequest>,
) -> Result<Json<EmailResponse>, HandlerError> {
    let scope = app_state.scope(&headers).await;

    if payload.sender_name.trim().is_empty() {
        return Err(reject(
            StatusCode::BAD_REQUEST,
            "Please enter your name!",
        ));
    }
    if payload.target_company.trim().is_empty() {
        return Err(reject(
            StatusCode::BAD_REQUEST,
            "Please enter the target company name!",
        ));
    }

    let credential = scope.credential.as_deref().ok_or_else(|| {
        reject(
            StatusCode::UNAUTHORIZED,
            "Please enter your Gemini API Key first!",
        )
    })?;

    let brief = OutreachBrief {
        sender_name: payload.sender_name.trim().to_string(),
        target_company: payload.target_company.trim().to_string(),
        target_person: payload.target_person,
        target_role: payload.target_role,
        purpose: payload.purpose,
        additional_context: payload.additional_context,
    };

    let stages = outreach_pipeline(&brief);
    let email = app_state
        .executor
        .run_pipeline(credential, &stages)
        .await
        .map_err(|e| {
            error!("Outreach email generation failed: {}", e);
            reject(
                StatusCode::BAD_GATEWAY,
                format!("Error generating email: {}", e),
            )
        })?;

    Ok(Json(EmailResponse { email }))
}
