//! services/api/src/adapters/mod.rs
//!
//! Declares the adapter modules implementing the core's ports.

pub mod crew_llm;

pub use crew_llm::CrewAdapter;
