//! Wayfarer Engine Library
//!
//! Conversation memory for a travel planning assistant: per-user records,
//! bounded history, trip and preference extraction, and prompt building
//! around a hosted inference call. Used by the `wayfarer` binary and the
//! integration tests.

/// Configuration management module
pub mod config;

/// Secret management module
pub mod secrets;

/// Per-user record storage
pub mod store;

/// Database persistence module
pub mod db;

/// Inference provider abstraction layer
pub mod llm;

/// Trip and preference extraction
pub mod extract;

/// System prompt and context window construction
pub mod prompt;

/// Conversation state and exchange orchestration
pub mod conversation;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
