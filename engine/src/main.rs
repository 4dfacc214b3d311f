// Wayfarer travel planning assistant
// Main entry point for the wayfarer binary

use clap::Parser;
use sdk::errors::{EngineError, WayfarerErrorExt};
use wayfarer_engine::cli::{Cli, Command, SecretAction};
use wayfarer_engine::config::Config;
use wayfarer_engine::handlers::{
    handle_chat, handle_doctor, handle_forget, handle_history, handle_profile, handle_prompt,
    handle_save, handle_secret_set, handle_trips, handle_users, OutputFormat,
};
use wayfarer_engine::telemetry::{init_telemetry, init_telemetry_with_level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // Load configuration (or use custom path if provided)
    let config = match &cli.config {
        Some(config_path) => Config::load_from_path(config_path),
        None => Config::load_or_create(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            init_telemetry();
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // --log wins over the config file; RUST_LOG wins over both
    init_telemetry_with_level(cli.log.as_deref().unwrap_or(&config.core.log_level));

    tracing::debug!("Wayfarer v{}", env!("CARGO_PKG_VERSION"));

    let ephemeral = cli.ephemeral;
    let result = match cli.command {
        Command::Chat { user, message } => {
            handle_chat(&user, &message, &config, ephemeral, format).await
        }

        Command::Save {
            user,
            user_message,
            assistant_message,
        } => {
            handle_save(
                &user,
                &user_message,
                &assistant_message,
                &config,
                ephemeral,
                format,
            )
            .await
        }

        Command::Trips { user } => handle_trips(&user, &config, ephemeral, format).await,

        Command::History { user, limit } => {
            handle_history(&user, limit, &config, ephemeral, format).await
        }

        Command::Profile { user } => handle_profile(&user, &config, ephemeral, format).await,

        Command::Prompt { user } => handle_prompt(&user, &config, ephemeral, format).await,

        Command::Users => handle_users(&config, ephemeral, format).await,

        Command::Forget { user } => handle_forget(&user, &config, ephemeral, format).await,

        Command::Secret { action } => match action {
            SecretAction::Set { key, value } => handle_secret_set(&key, &value, format),
        },

        Command::Doctor => {
            tracing::info!("Running diagnostics...");
            handle_doctor(&config, format).await
        }
    };

    if let Err(e) = &result {
        tracing::error!("{:#}", e);
        if let Some(engine_err) = e.downcast_ref::<EngineError>() {
            eprintln!("hint: {}", engine_err.user_hint());
        }
    }
    result
}
