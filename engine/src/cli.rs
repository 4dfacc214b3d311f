//! CLI interface for Wayfarer
//!
//! This module provides the command-line interface using clap's derive API.
//! Every command operates on one user id; the id is opaque to the engine.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Wayfarer travel planning assistant
///
/// Chats with a hosted model while remembering each user's preferences,
/// recent conversation and saved trips.
#[derive(Parser, Debug)]
#[command(name = "wayfarer")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Keep records in memory only; nothing is written to disk
    #[arg(long, global = true)]
    pub ephemeral: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send a message and print the assistant's reply
    Chat {
        /// User id the exchange belongs to
        #[arg(short, long)]
        user: String,

        /// The message to send
        message: String,
    },

    /// Record an exchange whose reply was generated elsewhere
    Save {
        #[arg(short, long)]
        user: String,

        #[arg(long)]
        user_message: String,

        #[arg(long)]
        assistant_message: String,
    },

    /// List a user's saved trips
    Trips {
        #[arg(short, long)]
        user: String,
    },

    /// Show stored conversation turns
    History {
        #[arg(short, long)]
        user: String,

        /// Number of turns to show (default: all stored)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show learned preferences
    Profile {
        #[arg(short, long)]
        user: String,
    },

    /// Print the system prompt the next exchange would send
    Prompt {
        #[arg(short, long)]
        user: String,
    },

    /// List users with a stored record
    Users,

    /// Delete a user's stored record
    Forget {
        #[arg(short, long)]
        user: String,
    },

    /// Manage API tokens in the OS keychain
    Secret {
        #[command(subcommand)]
        action: SecretAction,
    },

    /// Run system diagnostics
    Doctor,
}

/// Secret management actions
#[derive(Subcommand, Debug)]
pub enum SecretAction {
    /// Store a secret (e.g. workers_ai_token)
    Set {
        /// Secret name
        key: String,
        /// Secret value
        value: String,
    },
}
