//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and per-request session scoping.

use crate::config::Config;
use axum::http::HeaderMap;
use std::sync::Arc;
use study_companion_core::keystore::{Namespace, SessionStore};
use study_companion_core::ports::PipelineExecutor;

/// Header carrying the caller's model-provider API key.
pub const API_KEY_HEADER: &str = "x-api-key";

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SessionStore>,
    pub executor: Arc<dyn PipelineExecutor>,
    pub config: Arc<Config>,
}

//=========================================================================================
// Per-request session scope
//=========================================================================================

/// The resolved scope of one request: the namespace all keystore access is
/// confined to, and the credential to hand to the executor (if any).
pub struct SessionScope {
    pub namespace: Namespace,
    pub credential: Option<String>,
}

impl AppState {
    /// Resolves the session scope for a request.
    ///
    /// The credential comes from the `x-api-key` header, trimmed, with the
    /// configured fallback key used when the header is absent. The
    /// namespace's defaults are materialized before the handler reads
    /// anything, which is what keeps a credential switch from observing
    /// another session's data. The credential itself is never logged.
    pub async fn scope(&self, headers: &HeaderMap) -> SessionScope {
        let header_key = headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let credential = header_key.or_else(|| self.config.gemini_api_key.clone());
        let namespace = Namespace::for_credential(credential.as_deref());
        self.store.ensure(&namespace).await;

        SessionScope {
            namespace,
            credential,
        }
    }
}
