// src/main.rs

//! codex-relay
//!
//! Entry point for the relay binary.
//!
//! The relay sits between an online code editor and the hosted services it
//! depends on (Judge0, Piston, Gemini) so that API keys stay on the server.
//!
//! Responsibilities of this file:
//! - Load `.env` and initialise logging
//! - Parse CLI arguments
//! - Hand off to the runner
//!
//! There is intentionally *no business logic* here.

mod assistant;
mod cli;
mod config;
mod error;
mod judge0;
mod language;
mod output;
mod piston;
mod relay_id;
mod render;
mod runner;
mod runtime;
mod session;
mod transport;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is normal in production
    dotenvy::dotenv().ok();

    // Logs go to stderr so `run` / `chat` output stays pipeable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();

    runner::run(cli).await
}
