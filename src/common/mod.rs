//! Common utilities and shared functionality
//!
//! Identifiers, collaborator traits and the configuration loader used across
//! the engine.

pub mod types;
pub mod config;
pub mod traits;
