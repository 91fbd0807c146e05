//! Library crate for league-scoring: loading, normalizing and scoring a fantasy
//! motorsport league stored as seven tables.

/// Application configuration.
pub mod config;
/// Persistence layer.
pub mod dao;
/// Error types shared across layers.
pub mod error;
/// League operations.
pub mod services;
/// Session state and the normalized view.
pub mod state;
