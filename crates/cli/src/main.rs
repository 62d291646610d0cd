use std::path::PathBuf;

use aimg_app::{Console, ConsoleConfig};
use aimg_events::ConsoleEvent;
use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod form;

use form::GenerationArgs;

#[derive(Parser)]
#[command(name = "aimg")]
#[command(about = "Console for the image-generation backend", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and remember the session
    Login {
        username: String,
        #[arg(long, env = "AIMG_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and log in
    Register {
        username: String,
        #[arg(long, env = "AIMG_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long, env = "AIMG_PASSWORD_CONFIRM", hide_env_values = true)]
        confirm: String,
    },
    /// Forget the stored session
    Logout,
    /// Show server health and the available resources
    Status,
    /// Text-to-image generation
    Txt2img(GenerationArgs),
    /// Image-to-image generation
    Img2img {
        /// Source image file
        #[arg(long)]
        image: PathBuf,
        #[command(flatten)]
        args: GenerationArgs,
    },
    /// Past generations
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
    /// Backend configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Backend workflows
    Workflows {
        #[command(subcommand)]
        action: WorkflowAction,
    },
    /// Local display settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Saved text-to-image configurations
    Presets {
        #[command(subcommand)]
        action: PresetAction,
    },
    /// Print a random example prompt
    ExamplePrompt,
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List entries, newest first
    List,
    /// Show the parameters and result of one entry
    Show { id: i64 },
    /// Submit an entry's parameters again
    Replay {
        id: i64,
        /// Source image, required for image-to-image entries
        #[arg(long)]
        image: Option<PathBuf>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Show,
    /// Add or update a generation server
    SetServer {
        address: String,
        #[arg(long, default_value_t = 1)]
        weight: u32,
        #[arg(long)]
        disabled: bool,
    },
    RemoveServer { address: String },
    /// Update the global switches
    Set {
        #[arg(long)]
        auto_save: Option<bool>,
        #[arg(long)]
        auto_zip: Option<bool>,
        #[arg(long)]
        default_workflow: Option<String>,
    },
}

#[derive(Subcommand)]
enum WorkflowAction {
    List,
    Show { prefix: String },
    Delete { prefix: String },
    /// Upload a workflow JSON file
    Save { file: PathBuf },
    /// Pretty-print a workflow JSON file
    Format { file: PathBuf },
}

#[derive(Subcommand)]
enum SettingsAction {
    Show,
    Set {
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        height: Option<u32>,
    },
}

#[derive(Subcommand)]
enum PresetAction {
    List,
    Save {
        name: String,
        #[command(flatten)]
        args: GenerationArgs,
    },
    Delete { name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aimg=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // --- Configuration ---
    let config = ConsoleConfig::from_env();
    tracing::debug!(base_url = %config.base_url, data_dir = %config.data_dir.display(), "Loaded console configuration");

    let console = Console::open(config)?;
    let printer = tokio::spawn(print_events(console.bus().subscribe()));

    let outcome = commands::run(&console, cli.command).await;

    // Closing the bus lets the printer drain and finish.
    drop(console);
    let _ = printer.await;
    outcome
}

/// Print toasts to stderr until the bus closes.
async fn print_events(mut rx: tokio::sync::broadcast::Receiver<ConsoleEvent>) {
    loop {
        match rx.recv().await {
            Ok(ConsoleEvent::Toast(toast)) => {
                eprintln!("[{}] {}", toast.level.as_str(), toast.message);
            }
            Ok(ConsoleEvent::LoadingChanged { active: true }) => eprintln!("Generating..."),
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Event printer lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
