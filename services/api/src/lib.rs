//! services/api/src/lib.rs
//!
//! Library entry point for the `api` service: configuration, error type,
//! the pipeline-executor adapter, and the web handlers.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
