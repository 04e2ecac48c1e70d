// src/runner.rs

use crate::assistant::AssistantRelay;
use crate::cli::{Backend, Cli, Command};
use crate::config::Config;
use crate::judge0::{ExecuteCodeRequest, Judge0Relay, Judge0Result};
use crate::language::Language;
use crate::piston::{PistonRelay, PistonRequest};
use crate::render::{render_reply, to_plain_text};
use crate::runtime::{self, default_upstream};
use crate::session::ChatSession;

use anyhow::{Context, Result};
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Entry point from `main.rs`.
pub async fn run(cli: Cli) -> Result<()> {
    let mut cfg = Config::resolve(cli.config.as_deref())?;

    match cli.command {
        Command::Serve { addr } => {
            if let Some(addr) = addr {
                cfg.server.addr = addr;
            }
            runtime::serve(cfg).await
        }

        Command::Run {
            file,
            language,
            stdin,
            stdin_file,
            backend,
            json,
        } => {
            let code = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read source file {:?}", file))?;

            let language = match language {
                Some(name) => name.parse::<Language>()?,
                None => infer_language(&file)?,
            };

            let stdin = match stdin_file {
                Some(path) => Some(
                    std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read stdin file {:?}", path))?,
                ),
                None => stdin,
            };

            let printed = run_code(&cfg, backend, language, code, stdin, json).await?;
            println!("{}", printed);
            Ok(())
        }

        Command::Status { token } => {
            let relay = Judge0Relay::new(&cfg, default_upstream(&cfg));
            let payload = relay.status(&token).await?;
            println!("{}", serde_json::to_string_pretty(&payload)?);
            Ok(())
        }

        Command::Chat { prompt } => chat(&cfg, prompt).await,
    }
}

/* ---------------- run ---------------- */

async fn run_code(
    cfg: &Config,
    backend: Backend,
    language: Language,
    code: String,
    stdin: Option<String>,
    json: bool,
) -> Result<String> {
    let upstream = default_upstream(cfg);

    match backend {
        Backend::Judge0 => {
            let req = ExecuteCodeRequest {
                language_id: Some(language.judge0_id()),
                language: None,
                source_code: code,
                stdin,
            };
            let payload = Judge0Relay::new(cfg, upstream).submit(&req).await?;

            if json {
                return Ok(serde_json::to_string_pretty(&payload)?);
            }
            Ok(Judge0Result::from_value(&payload)?.display_output())
        }

        Backend::Piston => {
            let req = PistonRequest {
                language: language.name().to_string(),
                code,
                input: stdin,
            };
            let resp = PistonRelay::new(cfg, upstream).execute(&req).await?;

            if json {
                return Ok(serde_json::to_string_pretty(&resp.raw)?);
            }
            Ok(resp.output)
        }
    }
}

fn infer_language(file: &Path) -> Result<Language> {
    let ext = file
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("");

    let language = match ext {
        "py" => Language::Python,
        "cpp" | "cc" | "cxx" => Language::Cpp,
        "java" => Language::Java,
        _ => anyhow::bail!(
            "Cannot infer language from {:?}; pass --language (python | cpp | java)",
            file
        ),
    };

    Ok(language)
}

/* ---------------- chat ---------------- */

async fn chat(cfg: &Config, prompt: Vec<String>) -> Result<()> {
    let assistant = AssistantRelay::new(cfg, default_upstream(cfg));
    let mut session = ChatSession::new();

    if !prompt.is_empty() {
        if let Some(msg) = session.ask(&assistant, &prompt.join(" ")).await {
            println!("{}", to_plain_text(&render_reply(&msg.text)));
        }
        return Ok(());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines
        .next_line()
        .await
        .context("Failed to read from stdin")?
    {
        if let Some(msg) = session.ask(&assistant, &line).await {
            println!("{}\n", to_plain_text(&render_reply(&msg.text)));
        }
    }

    tracing::debug!(messages = session.messages().len(), "chat session ended");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_language_from_extension() {
        assert_eq!(infer_language(Path::new("a/main.py")).unwrap(), Language::Python);
        assert_eq!(infer_language(Path::new("sol.cc")).unwrap(), Language::Cpp);
        assert_eq!(infer_language(Path::new("Main.java")).unwrap(), Language::Java);
    }

    #[test]
    fn unknown_extension_asks_for_language() {
        let err = infer_language(Path::new("script.rb")).unwrap_err();
        assert!(err.to_string().contains("--language"));
    }

    #[tokio::test]
    async fn judge0_run_without_key_fails_cleanly() {
        let cfg = Config::default();

        let err = run_code(
            &cfg,
            Backend::Judge0,
            Language::Python,
            "print(1)".to_string(),
            None,
            false,
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("API key not configured"));
    }
}
