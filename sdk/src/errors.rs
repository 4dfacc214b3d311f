//! Error types and handling
//!
//! This module provides the error types used throughout the Wayfarer engine.
//! All errors implement the `WayfarerErrorExt` trait which provides user-friendly
//! hints and indicates whether errors are recoverable.
//!
//! # Error Categories
//!
//! - **Input**: Missing or malformed message / user identifier. Raised before any
//!   store access, so nothing is ever written for a rejected request.
//! - **Store**: The per-user record could not be read or written.
//! - **Inference**: The hosted model call failed. No half-exchange is persisted.
//! - **Configuration**: Invalid or missing configuration.

use thiserror::Error;

/// Trait for Wayfarer error extensions
pub trait WayfarerErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is safe to display to end users and never echoes the raw
    /// message, which may contain provider responses or file paths.
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can simply be retried by the caller. The engine
    /// itself never retries.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Examples
///
/// ```
/// use sdk::errors::{EngineError, WayfarerErrorExt};
///
/// let error = EngineError::InvalidInput("Missing message or userId".to_string());
/// assert_eq!(error.to_string(), "Invalid input: Missing message or userId");
/// assert!(error.is_recoverable());
///
/// let corrupt = EngineError::CorruptRecord("expected an object".to_string());
/// assert!(!corrupt.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Client input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Storage errors
    #[error("Store error: {0}")]
    Store(String),

    #[error("Corrupt user record: {0}")]
    CorruptRecord(String),

    // Inference errors
    #[error("Inference error: {0}")]
    Inference(String),

    // Keyring errors
    #[error("Keyring error: {0}")]
    KeyringError(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WayfarerErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::InvalidInput(_) => "Both a message and a user id are required",
            Self::Config(_) => "Check your config.toml file for errors",
            Self::Store(_) => "Could not access saved conversations. Try again",
            Self::CorruptRecord(_) => "Saved data for this user is unreadable. Use 'wayfarer forget'",
            Self::Inference(_) => "The travel assistant is unavailable right now. Try again",
            Self::KeyringError(_) => "Failed to access secure storage. Check system keychain",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(self, Self::CorruptRecord(_) | Self::Config(_))
    }
}
