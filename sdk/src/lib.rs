//! Wayfarer SDK
//!
//! Shared types and errors for the Wayfarer travel-planning engine.
//! This crate holds the persisted user record format so that anything reading
//! the store agrees on its shape.

/// Error types and handling
pub mod errors;

/// Persisted user record types
pub mod types;

// Re-export commonly used types
pub use errors::{EngineError, WayfarerErrorExt};
pub use types::{Budget, Pace, Preferences, Trip, Turn, TurnRole, UserRecord};
