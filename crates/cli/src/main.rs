//! `veil` -- command-line client for the league's generation tools.
//!
//! Submits video and image jobs to the Gemini API, waits for them while
//! printing progress, and writes the result to disk. Also answers lore
//! questions and analyses image styles.
//!
//! Configuration comes from the environment (see
//! [`GenAiConfig::from_env`]), optionally from a `.env` file, with CLI
//! flags taking precedence.
//!
//! Exit codes: `0` on success, `2` when the API key is missing or was
//! rejected (select a new key and retry), `1` for any other failure.

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use veil_cli::args::Cli;
use veil_cli::commands::{self, Context};
use veil_genai::config::GenAiConfig;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "veil_cli=info,veil_genai=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "Command failed");
        eprintln!("error: {e:#}");
        std::process::exit(commands::exit_code(&e));
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.apply(GenAiConfig::from_env()?);
    config.validate()?;

    tracing::info!(
        base_url = %config.base_url,
        poll_interval_secs = config.poll_interval.as_secs(),
        "Starting veil",
    );

    let ctx = Context::new(config)?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, abandoning wait");
            on_signal.cancel();
        }
    });

    commands::run(&ctx, cli.command, &cancel).await
}
