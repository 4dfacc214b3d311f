//! Command handlers for CLI operations
//!
//! Each handler opens the user store (SQLite under the data directory, or an
//! in-memory store for `--ephemeral` runs), performs one operation and
//! prints the result as text or JSON.

use anyhow::{Context, Result};
use serde_json::json;
use std::sync::Arc;

use crate::config::Config;
use crate::conversation::ExchangeService;
use crate::db::Database;
use crate::llm::ollama::OllamaProvider;
use crate::llm::workers_ai::WorkersAiProvider;
use crate::llm::InferenceProvider;
use crate::secrets::{SecretManager, WORKERS_AI_TOKEN_ENV, WORKERS_AI_TOKEN_KEY};
use crate::store::{InMemoryUserStore, UserStore};

/// Keychain service name for stored tokens
pub const KEYCHAIN_SERVICE: &str = "wayfarer";

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Open user storage
///
/// Returns the store plus the database handle when one was opened, so
/// callers can flush and close it when done.
pub async fn open_store(
    config: &Config,
    ephemeral: bool,
) -> Result<(Arc<dyn UserStore>, Option<Database>)> {
    if ephemeral {
        tracing::debug!("Using in-memory user store");
        let store: Arc<dyn UserStore> = Arc::new(InMemoryUserStore::new());
        return Ok((store, None));
    }

    let database = Database::new(&config.database_path())
        .await
        .context("Failed to open database")?;
    let store: Arc<dyn UserStore> = Arc::new(database.users());
    Ok((store, Some(database)))
}

/// Build the inference provider selected by `inference.default_provider`
pub fn build_provider(config: &Config) -> Result<Arc<dyn InferenceProvider>> {
    let inference = &config.inference;
    let provider: Arc<dyn InferenceProvider> = match inference.default_provider.as_str() {
        "ollama" => Arc::new(OllamaProvider::new(
            inference.ollama.base_url.clone(),
            inference.ollama.model.clone(),
        )),
        _ => {
            let token = SecretManager::new(KEYCHAIN_SERVICE)
                .resolve(WORKERS_AI_TOKEN_ENV, WORKERS_AI_TOKEN_KEY)?;
            Arc::new(WorkersAiProvider::new(inference.workers_ai.clone(), token)?)
        }
    };
    tracing::debug!("Using inference provider {}", provider.name());
    Ok(provider)
}

async fn close(database: Option<Database>) -> Result<()> {
    if let Some(database) = database {
        database.close().await?;
    }
    Ok(())
}

fn service(config: &Config, store: Arc<dyn UserStore>) -> ExchangeService {
    ExchangeService::new(store, config.inference.clone(), &config.memory)
}

fn format_timestamp(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Run one chat exchange and print the reply
pub async fn handle_chat(
    user: &str,
    message: &str,
    config: &Config,
    ephemeral: bool,
    format: OutputFormat,
) -> Result<()> {
    let provider = build_provider(config)?;
    let (store, database) = open_store(config, ephemeral).await?;
    let service = service(config, store).with_provider(provider);

    let reply = service.chat(user, message).await?;

    match format {
        OutputFormat::Text => {
            println!("{}", reply.response);
            if let Some(trip) = &reply.saved_trip {
                println!();
                println!("Saved trip: {} ({})", trip.destination, trip.duration);
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&reply)?);
        }
    }

    close(database).await
}

/// Record an exchange produced outside the engine
pub async fn handle_save(
    user: &str,
    user_message: &str,
    assistant_message: &str,
    config: &Config,
    ephemeral: bool,
    format: OutputFormat,
) -> Result<()> {
    let (store, database) = open_store(config, ephemeral).await?;
    let trip = service(config, store)
        .save_exchange(user, user_message, assistant_message)
        .await?;

    match format {
        OutputFormat::Text => {
            println!("Exchange recorded for '{}'", user);
            if let Some(trip) = &trip {
                println!("Saved trip: {} ({})", trip.destination, trip.duration);
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "success": true,
                "saved_trip": trip,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    close(database).await
}

/// List a user's saved trips
pub async fn handle_trips(
    user: &str,
    config: &Config,
    ephemeral: bool,
    format: OutputFormat,
) -> Result<()> {
    let (store, database) = open_store(config, ephemeral).await?;
    let trips = service(config, store).trips(user).await?;

    match format {
        OutputFormat::Text => {
            if trips.is_empty() {
                println!("No saved trips for '{}'", user);
            } else {
                println!("Saved trips for '{}':", user);
                println!();
                for trip in &trips {
                    println!("  {} ({})", trip.destination, trip.duration);
                    println!("    ID:      {}", trip.id);
                    println!("    Created: {}", format_timestamp(trip.created_at));
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "trips": trips,
                "count": trips.len(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    close(database).await
}

/// Show stored conversation turns, oldest first
pub async fn handle_history(
    user: &str,
    limit: Option<usize>,
    config: &Config,
    ephemeral: bool,
    format: OutputFormat,
) -> Result<()> {
    let (store, database) = open_store(config, ephemeral).await?;
    let record = service(config, store).profile(user).await?;

    let history = &record.conversation_history;
    let start = limit.map_or(0, |n| history.len().saturating_sub(n));
    let turns = &history[start..];

    match format {
        OutputFormat::Text => {
            if turns.is_empty() {
                println!("No conversation history for '{}'", user);
            } else {
                for turn in turns {
                    println!(
                        "[{}] {}: {}",
                        format_timestamp(turn.timestamp),
                        turn.role,
                        turn.content
                    );
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "turns": turns,
                "count": turns.len(),
                "stored": history.len(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    close(database).await
}

/// Show learned preferences and record totals
pub async fn handle_profile(
    user: &str,
    config: &Config,
    ephemeral: bool,
    format: OutputFormat,
) -> Result<()> {
    let (store, database) = open_store(config, ephemeral).await?;
    let record = service(config, store).profile(user).await?;
    let prefs = &record.preferences;

    match format {
        OutputFormat::Text => {
            println!("Profile for '{}'", user);
            println!();
            let budget = prefs.budget.map_or("-".to_string(), |b| b.to_string());
            let pace = prefs.pace.map_or("-".to_string(), |p| p.to_string());
            let interests = if prefs.interests.is_empty() {
                "-".to_string()
            } else {
                prefs.interests.join(", ")
            };
            println!("  {:<12} {}", "Budget:", budget);
            println!("  {:<12} {}", "Interests:", interests);
            println!("  {:<12} {}", "Pace:", pace);
            println!("  {:<12} {}", "Turns:", record.conversation_history.len());
            println!("  {:<12} {}", "Trips:", record.saved_trips.len());
        }
        OutputFormat::Json => {
            let output = json!({
                "preferences": prefs,
                "turns": record.conversation_history.len(),
                "trips": record.saved_trips.len(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    close(database).await
}

/// Print the system prompt and context window for the next exchange
pub async fn handle_prompt(
    user: &str,
    config: &Config,
    ephemeral: bool,
    format: OutputFormat,
) -> Result<()> {
    let (store, database) = open_store(config, ephemeral).await?;
    let service = service(config, store);
    let record = service.profile(user).await?;
    let system_prompt = service.prompt().build(&record);

    match format {
        OutputFormat::Text => {
            println!("{}", system_prompt);
        }
        OutputFormat::Json => {
            let output = json!({
                "system_prompt": system_prompt,
                "context": service.prompt().recent_context(&record),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    close(database).await
}

/// List users with a stored record
pub async fn handle_users(config: &Config, ephemeral: bool, format: OutputFormat) -> Result<()> {
    let (users, database) = if ephemeral {
        (Vec::new(), None)
    } else {
        let database = Database::new(&config.database_path())
            .await
            .context("Failed to open database")?;
        (database.users().list_users().await?, Some(database))
    };

    match format {
        OutputFormat::Text => {
            if users.is_empty() {
                println!("No stored users");
            } else {
                for user in &users {
                    println!("{}", user);
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "users": users,
                "count": users.len(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    close(database).await
}

/// Delete a user's stored record
pub async fn handle_forget(
    user: &str,
    config: &Config,
    ephemeral: bool,
    format: OutputFormat,
) -> Result<()> {
    let (deleted, database) = if ephemeral {
        (false, None)
    } else {
        let database = Database::new(&config.database_path())
            .await
            .context("Failed to open database")?;
        (database.users().delete(user).await?, Some(database))
    };

    match format {
        OutputFormat::Text => {
            if deleted {
                println!("Forgot '{}'", user);
            } else {
                println!("No record stored for '{}'", user);
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "user": user,
                "deleted": deleted,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    close(database).await
}

/// Store a secret in the OS keychain
pub fn handle_secret_set(key: &str, value: &str, format: OutputFormat) -> Result<()> {
    SecretManager::new(KEYCHAIN_SERVICE).set_secret(key, value)?;

    match format {
        OutputFormat::Text => println!("Stored secret '{}'", key),
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ "key": key, "stored": true }))?
            );
        }
    }
    Ok(())
}

/// Run diagnostics
///
/// Checks:
/// - Configuration (already validated when loaded)
/// - Data directory and database
/// - Inference provider credentials and reachability
pub async fn handle_doctor(config: &Config, format: OutputFormat) -> Result<()> {
    let mut issues = Vec::new();
    let mut checks: Vec<(&str, String)> = Vec::new();

    checks.push(("Configuration", "Valid".to_string()));
    checks.push((
        "Provider",
        format!(
            "{} ({})",
            config.inference.default_provider, config.inference.model
        ),
    ));

    if config.core.data_dir.exists() {
        checks.push(("Data directory", "Exists".to_string()));
    } else {
        checks.push(("Data directory", "Missing".to_string()));
        issues.push(format!(
            "Data directory does not exist: {:?}",
            config.core.data_dir
        ));
    }

    match Database::new(&config.database_path()).await {
        Ok(database) => {
            match database.users().list_users().await {
                Ok(users) => checks.push(("Database", format!("OK ({} users)", users.len()))),
                Err(e) => {
                    checks.push(("Database", "Query failed".to_string()));
                    issues.push(format!("Cannot read user records: {:#}", e));
                }
            }
            database.close().await.ok();
        }
        Err(e) => {
            checks.push(("Database", "Failed".to_string()));
            issues.push(format!("Cannot open database: {:#}", e));
        }
    }

    if config.inference.default_provider == "workers_ai" {
        let secrets = SecretManager::new(KEYCHAIN_SERVICE);
        let from_env = std::env::var(WORKERS_AI_TOKEN_ENV)
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false);
        if from_env {
            checks.push(("Workers AI token", "From environment".to_string()));
        } else if secrets.has_secret(WORKERS_AI_TOKEN_KEY) {
            checks.push(("Workers AI token", "In keychain".to_string()));
        } else {
            checks.push(("Workers AI token", "Not configured".to_string()));
            issues.push(format!(
                "No Workers AI token. Set ${} or run 'wayfarer secret set {} <token>'",
                WORKERS_AI_TOKEN_ENV, WORKERS_AI_TOKEN_KEY
            ));
        }
        if config.inference.workers_ai.account_id.trim().is_empty() {
            issues.push("inference.workers_ai.account_id is not set".to_string());
        }
    }

    match build_provider(config) {
        Ok(provider) => {
            if provider.check_health().await {
                checks.push(("Provider health", "Reachable".to_string()));
            } else {
                checks.push(("Provider health", "Unreachable".to_string()));
                issues.push(format!("{} is not reachable", provider.name()));
            }
        }
        Err(e) => {
            checks.push(("Provider health", "Not checked".to_string()));
            tracing::debug!("Skipping provider health check: {:#}", e);
        }
    }

    match format {
        OutputFormat::Text => {
            println!("Wayfarer Diagnostics");
            println!("====================");
            println!();

            println!("System Checks:");
            for (check, status) in &checks {
                println!("  {:<20} {}", format!("{}:", check), status);
            }

            println!();

            if issues.is_empty() {
                println!("✓ All checks passed!");
            } else {
                println!("⚠ Issues found:");
                println!();
                for (i, issue) in issues.iter().enumerate() {
                    println!("  {}. {}", i + 1, issue);
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "checks": checks.iter().map(|(name, status)| {
                    json!({
                        "name": name,
                        "status": status
                    })
                }).collect::<Vec<_>>(),
                "issues": issues,
                "healthy": issues.is_empty()
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
