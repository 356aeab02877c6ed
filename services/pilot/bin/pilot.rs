//! Main Entrypoint for the VTube Pilot Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing logging.
//! 3. Connecting and authenticating with VTube Studio.
//! 4. Running the requested subcommand.
//! 5. Closing the session on exit, error or Ctrl+C.

use anyhow::Context;
use clap::{Parser, Subcommand};
use pilot_core::{KeywordAnalyzer, RuleBasedPlanner};
use pilot_service::{
    config::Config,
    pipeline::{Pipeline, execute},
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use vts_client::VtsClient;

#[derive(Parser, Debug)]
#[command(version, about = "Drives a VTube Studio avatar from viewer text")]
struct Cli {
    #[command(subcommand)]
    command: Option<Mode>,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Read lines from stdin and react to each one (default).
    Run,
    /// Print the currently loaded model.
    Model,
    /// List the hotkeys of the loaded model and the active configured motion.
    Hotkeys,
    /// Trigger the animation hotkey with the given name.
    Trigger { name: String },
    /// Print the expression state and the active configured expression.
    Expressions,
    /// List tracking parameters, or read the values of the named ones.
    Params { names: Vec<String> },
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_mode(client: &VtsClient, mode: Mode) -> anyhow::Result<()> {
    match mode {
        Mode::Run => chat(client).await,
        Mode::Model => {
            match client.current_model().await? {
                Some(model) => print_json(&model)?,
                None => println!("No model loaded."),
            }
            Ok(())
        }
        Mode::Hotkeys => {
            print_json(&client.list_hotkeys(None).await?)?;
            match client.current_motion().await? {
                Some(key) => println!("Current motion: {key}"),
                None => println!("No configured motion is active."),
            }
            Ok(())
        }
        Mode::Trigger { name } => {
            let hotkey_id = client.trigger_animation_by_name(&name).await?;
            println!("Triggered {name} ({hotkey_id})");
            Ok(())
        }
        Mode::Expressions => {
            let Some(list) = client.list_expressions(false, None).await? else {
                println!("No model loaded.");
                return Ok(());
            };
            print_json(&list)?;
            match client.current_expression().await? {
                Some(key) => println!("Current expression: {key}"),
                None => println!("No configured expression is active."),
            }
            Ok(())
        }
        Mode::Params { names } if names.is_empty() => {
            print_json(&client.tracking_parameters().await?)
        }
        Mode::Params { names } => print_json(&client.parameter_values(&names).await?),
    }
}

/// Reacts to each stdin line until EOF or Ctrl+C.
async fn chat(client: &VtsClient) -> anyhow::Result<()> {
    let mut pipeline = Pipeline::new(Arc::new(KeywordAnalyzer), Arc::new(RuleBasedPlanner));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    info!("Ready. Type a message, Ctrl+D or Ctrl+C to quit.");

    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal.");
                break;
            }
            line = lines.next_line() => line.context("Failed to read stdin")?,
        };
        let Some(line) = line else {
            info!("Input closed.");
            break;
        };
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        match pipeline.respond(text).await {
            Ok(planned) => {
                for reply in execute(client, &planned.commands()).await {
                    println!("{reply}");
                }
            }
            Err(e) => warn!(error = %format!("{e:#}"), "Could not respond"),
        }
    }

    if let Some(stats) = client.latency().stats() {
        info!(
            samples = stats.count,
            mean_ms = stats.mean.as_millis() as u64,
            "Session latency"
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;
    let cli = Cli::parse();

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!(
        host = %config.host,
        port = config.port,
        vtuber = %config.vtuber_name,
        "Configuration loaded."
    );

    // --- 3. Connect ---
    let mut client = VtsClient::new(config.client_config());
    let connected = tokio::select! {
        result = client.connect() => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };
    match connected {
        Some(result) => result.context("Failed to connect to VTube Studio")?,
        None => {
            info!("Received shutdown signal before the session was ready.");
            client.close().await;
            return Ok(());
        }
    }

    // --- 4. Run ---
    let result = run_mode(&client, cli.command.unwrap_or(Mode::Run)).await;

    // --- 5. Shut Down ---
    client.close().await;
    info!("Session closed.");
    result
}
