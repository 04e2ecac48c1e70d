// src/cli.rs

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Relay backend for an online code editor.
///
/// Secrets come from the environment (or `.env`):
/// RAPIDAPI_KEY for Judge0, GEMINI_API_KEY for the assistant.
#[derive(Parser, Debug)]
#[command(
    name = "codex-relay",
    version,
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Optional YAML config (endpoints, model, timeouts)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// All supported CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the HTTP relay endpoints.
    Serve {
        /// Override server.addr
        ///
        /// Example:
        /// --addr 127.0.0.1:8080
        #[arg(long)]
        addr: Option<String>,
    },

    /// Run a source file remotely and print what the editor would show.
    Run {
        /// Source file to execute
        file: PathBuf,

        /// Language (python | cpp | java)
        ///
        /// Inferred from the file extension when omitted.
        #[arg(short, long)]
        language: Option<String>,

        /// Standard input passed to the program
        #[arg(long, conflicts_with = "stdin_file")]
        stdin: Option<String>,

        /// Read standard input for the program from a file
        #[arg(long)]
        stdin_file: Option<PathBuf>,

        /// Execution service to use
        #[arg(long, value_enum, default_value_t = Backend::Judge0)]
        backend: Backend,

        /// Print the full upstream payload instead of the output line
        #[arg(long)]
        json: bool,
    },

    /// Look up an existing Judge0 submission by token.
    Status {
        /// Submission token returned by Judge0
        token: String,
    },

    /// Ask the code assistant.
    ///
    /// With a prompt, asks once. Without one, reads one question per line
    /// from stdin until EOF, keeping the conversation in memory.
    Chat {
        /// Question to ask
        prompt: Vec<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    Judge0,
    Piston,
}
