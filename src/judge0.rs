// src/judge0.rs

//! Judge0 relays (via RapidAPI).
//!
//! - [`Judge0Relay::submit`]: create a submission, then fetch its result by
//!   token. Two round trips because the `wait` flag on creation is not
//!   honoured on every plan.
//! - [`Judge0Relay::status`]: single lookup of an existing token.
//!
//! Result payloads are returned verbatim as JSON; interpreting them is the
//! caller's job (see [`Judge0Result`]).

use crate::config::Config;
use crate::error::RelayError;
use crate::language::Language;
use crate::output::{derive_output, OutputFields};
use crate::relay_id::RelayId;
use crate::transport::{OutboundRequest, Upstream};

use serde::{Deserialize, Serialize};
use serde_json::Value;

const HOST_HEADER: &str = "X-RapidAPI-Host";
const KEY_HEADER: &str = "X-RapidAPI-Key";

/* ---------------- request / result models ---------------- */

/// Inbound execution request.
///
/// Accepts the editor's field names (`language_id`, `source_code`, `stdin`)
/// and the short aliases (`language`, `code`, `input`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecuteCodeRequest {
    #[serde(default)]
    pub language_id: Option<u32>,

    #[serde(default)]
    pub language: Option<String>,

    #[serde(alias = "code")]
    pub source_code: String,

    #[serde(default, alias = "input")]
    pub stdin: Option<String>,
}

impl ExecuteCodeRequest {
    /// Judge0 language id: the explicit id wins, otherwise the language name
    /// is mapped through [`Language`].
    pub fn resolve_language_id(&self) -> Result<u32, RelayError> {
        if let Some(id) = self.language_id {
            return Ok(id);
        }

        match &self.language {
            Some(name) => Ok(name.parse::<Language>()?.judge0_id()),
            None => Err(RelayError::BadRequest(
                "Missing required field: 'language_id' or 'language'".to_string(),
            )),
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateSubmission<'a> {
    language_id: u32,
    source_code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    stdin: Option<&'a str>,
    wait: bool,
}

/// The fields of a Judge0 result the editor looks at.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Judge0Result {
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub stderr: Option<String>,
    #[serde(default)]
    pub compile_output: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl Judge0Result {
    pub fn from_value(value: &Value) -> Result<Self, RelayError> {
        serde_json::from_value(value.clone()).map_err(RelayError::internal)
    }

    pub fn display_output(&self) -> String {
        derive_output(OutputFields {
            stdout: self.stdout.as_deref(),
            stderr: self.stderr.as_deref(),
            compile_output: self.compile_output.as_deref(),
            message: self.message.as_deref(),
        })
    }
}

/* ---------------- relay ---------------- */

#[derive(Clone)]
pub struct Judge0Relay {
    upstream: Upstream,
    base_url: String,
    host: String,
    api_key: Option<String>,
}

impl Judge0Relay {
    pub fn new(cfg: &Config, upstream: Upstream) -> Self {
        Self {
            upstream,
            base_url: cfg.judge0.base_url.trim_end_matches('/').to_string(),
            host: cfg.judge0.host.clone(),
            api_key: cfg.secrets.rapidapi_key.clone(),
        }
    }

    /// Create a submission and return its result payload unmodified.
    pub async fn submit(&self, req: &ExecuteCodeRequest) -> Result<Value, RelayError> {
        let api_key = self.api_key()?;
        let language_id = req.resolve_language_id()?;
        let relay_id = RelayId::new();

        tracing::info!(%relay_id, language_id, "creating judge0 submission");

        let body = serde_json::to_value(CreateSubmission {
            language_id,
            source_code: &req.source_code,
            stdin: req.stdin.as_deref(),
            wait: true,
        })
        .map_err(RelayError::internal)?;

        let created = self
            .upstream
            .send(self.authorized(
                OutboundRequest::post(format!("{}/submissions", self.base_url), body),
                api_key,
            ))
            .await?;

        if !created.is_success() {
            tracing::warn!(%relay_id, status = created.status, "judge0 rejected submission");
            return Err(RelayError::upstream(created.status, "API error", created.body));
        }

        let submission: Value = created.json()?;
        let token = submission
            .get("token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or(RelayError::MissingToken)?;

        tracing::debug!(%relay_id, token, "fetching judge0 result");

        let fetched = self
            .upstream
            .send(self.authorized(
                OutboundRequest::get(format!("{}/submissions/{}", self.base_url, token)),
                api_key,
            ))
            .await?;

        if !fetched.is_success() {
            tracing::warn!(%relay_id, status = fetched.status, "judge0 result fetch failed");
            return Err(RelayError::upstream(
                fetched.status,
                "Result fetch error",
                fetched.body,
            ));
        }

        fetched.json()
    }

    /// Look up an existing submission and return its payload unmodified.
    pub async fn status(&self, token: &str) -> Result<Value, RelayError> {
        let api_key = self.api_key()?;
        validate_token(token)?;
        let relay_id = RelayId::new();

        tracing::info!(%relay_id, token, "looking up judge0 submission");

        let reply = self
            .upstream
            .send(
                self.authorized(
                    OutboundRequest::get(format!(
                        "{}/submissions/{}?fields=*",
                        self.base_url, token
                    )),
                    api_key,
                )
                .header("Accept", "application/json"),
            )
            .await?;

        if !reply.is_success() {
            tracing::warn!(%relay_id, token, status = reply.status, "judge0 lookup failed");
            return Err(RelayError::upstream(reply.status, "API error", reply.body));
        }

        reply.json()
    }

    fn api_key(&self) -> Result<&str, RelayError> {
        self.api_key.as_deref().ok_or(RelayError::NotConfigured)
    }

    fn authorized(&self, req: OutboundRequest, api_key: &str) -> OutboundRequest {
        req.header(HOST_HEADER, self.host.clone())
            .header(KEY_HEADER, api_key)
    }
}

/// Tokens are opaque, but they end up in an upstream URL carrying our key.
fn validate_token(token: &str) -> Result<(), RelayError> {
    let ok = !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if ok {
        Ok(())
    } else {
        Err(RelayError::BadRequest(format!(
            "Invalid submission token: {:?}",
            token
        )))
    }
}
