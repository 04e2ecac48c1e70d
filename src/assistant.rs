// src/assistant.rs

//! Code assistant relay (Gemini `generateContent`).
//!
//! The model key lives in server configuration only. Clients send a bare
//! question; the relay wraps it in a fixed instruction asking for fenced code
//! blocks, forwards it, and returns the reply text plus a block rendering of
//! it (see [`crate::render`]).

use crate::config::Config;
use crate::error::RelayError;
use crate::relay_id::RelayId;
use crate::render::{render_reply, Block};
use crate::transport::{OutboundRequest, Upstream};

use serde::{Deserialize, Serialize};
use serde_json::json;

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Clone, Deserialize)]
pub struct AssistantRequest {
    #[serde(alias = "input", alias = "message")]
    pub prompt: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AssistantReply {
    pub reply: String,
    pub blocks: Vec<Block>,
}

impl AssistantReply {
    pub fn new(reply: String) -> Self {
        let blocks = render_reply(&reply);
        Self { reply, blocks }
    }
}

/// Wrap a user question in the fixed instruction sent to the model.
pub fn build_prompt(input: &str) -> String {
    format!(
        "As an expert programmer, provide clear and concise code with explanations for:\n\n\
         {}\n\n\
         Please format your response with code blocks using triple backticks with the language name, \
         like:\n```python\n(your code here)\n```",
        input
    )
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Clone)]
pub struct AssistantRelay {
    upstream: Upstream,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl AssistantRelay {
    pub fn new(cfg: &Config, upstream: Upstream) -> Self {
        Self {
            upstream,
            base_url: cfg.assistant.base_url.trim_end_matches('/').to_string(),
            model: cfg.assistant.model.clone(),
            api_key: cfg.secrets.gemini_api_key.clone(),
        }
    }

    /// Ask the model and return its reply text.
    pub async fn ask(&self, input: &str) -> Result<String, RelayError> {
        let api_key = self.api_key.as_deref().ok_or(RelayError::NotConfigured)?;

        if input.trim().is_empty() {
            return Err(RelayError::BadRequest("Prompt must not be empty".to_string()));
        }

        let relay_id = RelayId::new();
        tracing::info!(%relay_id, model = %self.model, "asking assistant");

        let body = json!({
            "contents": [{ "parts": [{ "text": build_prompt(input) }] }]
        });
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let reply = self
            .upstream
            .send(OutboundRequest::post(url, body).header(API_KEY_HEADER, api_key))
            .await?;

        if !reply.is_success() {
            tracing::warn!(%relay_id, status = reply.status, "assistant request rejected");
            return Err(RelayError::upstream(reply.status, "API error", reply.body));
        }

        let parsed: GenerateResponse = reply.json()?;
        extract_text(parsed)
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(resp: GenerateResponse) -> Result<String, RelayError> {
    let content = resp
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .ok_or_else(|| RelayError::internal("model returned no candidates"))?;

    Ok(content
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect::<Vec<_>>()
        .concat())
}
