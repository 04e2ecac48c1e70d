// src/piston.rs

//! Single-call executor backed by Piston.
//!
//! Unlike Judge0 there is no token and no second round trip: one POST runs
//! the code and the reply carries both compile and run stages. The relay
//! folds those into one `output` line and hands back the raw payload too.

use crate::config::Config;
use crate::error::RelayError;
use crate::language::Language;
use crate::output::{derive_output, OutputFields};
use crate::relay_id::RelayId;
use crate::transport::{OutboundRequest, Upstream};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/* ---------------- request / response models ---------------- */

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PistonRequest {
    pub language: String,

    #[serde(alias = "source_code")]
    pub code: String,

    #[serde(default, alias = "stdin")]
    pub input: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PistonResponse {
    pub output: String,
    pub language: Language,
    pub version: &'static str,
    pub raw: Value,
}

/// What actually gets sent, after normalization and the override policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub language: Language,
    pub content: String,
    pub stdin: String,
}

impl Dispatch {
    pub fn plan(req: &PistonRequest) -> Result<Self, RelayError> {
        let declared: Language = req.language.parse()?;
        let language = declared.sniff_override(&req.code);

        if language != declared {
            tracing::warn!(
                declared = %declared,
                dispatched = %language,
                "language selector overridden by code content"
            );
        }

        Ok(Self {
            language,
            content: language.strip_line_comments(&req.code),
            stdin: req.input.clone().unwrap_or_default(),
        })
    }
}

#[derive(Debug, Serialize)]
struct ExecuteBody<'a> {
    language: &'static str,
    version: &'static str,
    files: [SourceFile<'a>; 1],
    stdin: &'a str,
    args: [&'a str; 0],
    compile_timeout: u64,
    run_timeout: u64,
}

#[derive(Debug, Serialize)]
struct SourceFile<'a> {
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct PistonPayload {
    #[serde(default)]
    run: Option<Stage>,
    #[serde(default)]
    compile: Option<Stage>,
}

#[derive(Debug, Default, Deserialize)]
struct Stage {
    #[serde(default)]
    stdout: Option<String>,
    #[serde(default)]
    stderr: Option<String>,
}

/// Fold a Piston reply into one display line.
///
/// Compile-stage stdout is never shown; Piston only fills it for toolchains
/// that chat on success. Missing stages and null streams fall through the
/// usual precedence, but a reply of the wrong shape is a server error.
pub fn derive_piston_output(raw: &Value) -> Result<String, RelayError> {
    let payload: PistonPayload =
        serde_json::from_value(raw.clone()).map_err(RelayError::internal)?;
    let run = payload.run.unwrap_or_default();
    let compile = payload.compile.unwrap_or_default();

    Ok(derive_output(OutputFields {
        stdout: run.stdout.as_deref(),
        stderr: run.stderr.as_deref(),
        compile_output: compile.stderr.as_deref(),
        message: None,
    }))
}

/* ---------------- relay ---------------- */

#[derive(Clone)]
pub struct PistonRelay {
    upstream: Upstream,
    base_url: String,
    compile_timeout_ms: u64,
    run_timeout_ms: u64,
}

impl PistonRelay {
    pub fn new(cfg: &Config, upstream: Upstream) -> Self {
        Self {
            upstream,
            base_url: cfg.piston.base_url.trim_end_matches('/').to_string(),
            compile_timeout_ms: cfg.piston.compile_timeout_ms,
            run_timeout_ms: cfg.piston.run_timeout_ms,
        }
    }

    pub async fn execute(&self, req: &PistonRequest) -> Result<PistonResponse, RelayError> {
        let dispatch = Dispatch::plan(req)?;
        let relay_id = RelayId::new();

        tracing::info!(%relay_id, language = %dispatch.language, "executing on piston");

        let body = serde_json::to_value(ExecuteBody {
            language: dispatch.language.piston_tag(),
            version: dispatch.language.piston_version(),
            files: [SourceFile {
                content: &dispatch.content,
            }],
            stdin: &dispatch.stdin,
            args: [],
            compile_timeout: self.compile_timeout_ms,
            run_timeout: self.run_timeout_ms,
        })
        .map_err(RelayError::internal)?;

        let reply = self
            .upstream
            .send(OutboundRequest::post(format!("{}/execute", self.base_url), body))
            .await?;

        if !reply.is_success() {
            tracing::warn!(%relay_id, status = reply.status, "piston rejected execution");
            return Err(RelayError::upstream(reply.status, "API error", reply.body));
        }

        let raw: Value = reply.json()?;

        Ok(PistonResponse {
            output: derive_piston_output(&raw)?,
            language: dispatch.language,
            version: dispatch.language.piston_version(),
            raw,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::fake::FakeTransport;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn relay(upstream: Upstream) -> PistonRelay {
        let mut cfg = Config::default();
        cfg.piston.base_url = "http://piston.test/api/v2/".to_string();
        PistonRelay::new(&cfg, upstream)
    }

    fn request(language: &str, code: &str) -> PistonRequest {
        PistonRequest {
            language: language.to_string(),
            code: code.to_string(),
            input: Some("3 4".to_string()),
        }
    }

    #[test]
    fn output_precedence() {
        let both = json!({"run": {"stdout": "A", "stderr": "B"}});
        assert_eq!(derive_piston_output(&both).unwrap(), "A");

        let stderr_only = json!({"run": {"stdout": null, "stderr": "B"}});
        assert_eq!(derive_piston_output(&stderr_only).unwrap(), "Error: B");

        let compile = json!({
            "compile": {"stderr": "C"},
            "run": {"stdout": null, "stderr": null}
        });
        assert_eq!(derive_piston_output(&compile).unwrap(), "Compilation error: C");

        let nothing = json!({"run": {"stdout": null, "stderr": null}, "compile": {"stderr": null}});
        assert_eq!(
            derive_piston_output(&nothing).unwrap(),
            crate::output::NO_OUTPUT_MESSAGE
        );

        let no_stages = json!({"language": "python", "version": "3.10.0"});
        assert_eq!(
            derive_piston_output(&no_stages).unwrap(),
            crate::output::NO_OUTPUT_MESSAGE
        );
    }

    #[test]
    fn mistyped_stream_is_a_server_error() {
        let err = derive_piston_output(&json!({"run": {"stdout": 5, "stderr": "Traceback"}}))
            .unwrap_err();

        assert_eq!(err.status().as_u16(), 500);
        assert!(err.to_string().starts_with("Server error: "));
    }

    #[tokio::test]
    async fn reply_of_unexpected_shape_answers_server_error() {
        let fake = Arc::new(FakeTransport::new().reply(200, r#"["not", "an", "object"]"#));

        let err = relay(fake.upstream())
            .execute(&request("python", "print(1)"))
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::Internal(_)));
        assert_eq!(err.status().as_u16(), 500);
    }

    #[test]
    fn plan_overrides_default_language_for_cpp_code() {
        let code = "// C++ code\n#include <iostream>\nusing namespace std;\nint main() { cout << 1; }";

        let dispatch = Dispatch::plan(&request("python", code)).unwrap();

        assert_eq!(dispatch.language, Language::Cpp);
        assert_eq!(
            dispatch.content,
            "#include <iostream>\nusing namespace std;\nint main() { cout << 1; }"
        );
        assert_eq!(dispatch.stdin, "3 4");
    }

    #[test]
    fn plan_rejects_unknown_language() {
        let err = Dispatch::plan(&request("brainfuck", "+++")).unwrap_err();
        assert_eq!(err.status().as_u16(), 400);
    }

    #[tokio::test]
    async fn overridden_dispatch_carries_mapped_tag_and_version() {
        let fake = Arc::new(FakeTransport::new().reply(200, r#"{"run":{"stdout":"7\n","stderr":""}}"#));

        let resp = relay(fake.upstream())
            .execute(&request("python", "using namespace std;\nint main(){}"))
            .await
            .unwrap();

        assert_eq!(resp.output, "7\n");
        assert_eq!(resp.language, Language::Cpp);
        assert_eq!(resp.version, "10.2.0");

        let seen = fake.requests();
        assert_eq!(seen[0].url, "http://piston.test/api/v2/execute");
        let body = seen[0].body.as_ref().unwrap();
        assert_eq!(body["language"], "c++");
        assert_eq!(body["version"], "10.2.0");
        assert_eq!(body["files"][0]["content"], "using namespace std;\nint main(){}");
        assert_eq!(body["stdin"], "3 4");
        assert_eq!(body["args"], json!([]));
        assert_eq!(body["compile_timeout"], 10_000);
        assert_eq!(body["run_timeout"], 3_000);
    }

    #[tokio::test]
    async fn raw_payload_is_returned_alongside_output() {
        let raw = r#"{"language":"python","version":"3.10.0","run":{"stdout":"","stderr":"NameError"}}"#;
        let fake = Arc::new(FakeTransport::new().reply(200, raw));

        let resp = relay(fake.upstream())
            .execute(&request("python", "prin(1)"))
            .await
            .unwrap();

        assert_eq!(resp.output, "Error: NameError");
        assert_eq!(resp.raw, serde_json::from_str::<Value>(raw).unwrap());
    }

    #[tokio::test]
    async fn upstream_rejection_propagates() {
        let fake = Arc::new(FakeTransport::new().reply(400, r#"{"message":"runtime is unknown"}"#));

        let err = relay(fake.upstream())
            .execute(&request("java", "class Main {}"))
            .await
            .unwrap_err();

        assert_eq!(err.status().as_u16(), 400);
        assert!(err.to_string().contains(r#"{"message":"runtime is unknown"}"#));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_upstream_reports_timeout() {
        let fake = Arc::new(
            FakeTransport::new()
                .reply(200, "{}")
                .delayed(Duration::from_secs(60)),
        );
        let upstream = Upstream::new(fake.clone(), Duration::from_secs(10));

        let err = relay(upstream)
            .execute(&request("python", "while True: pass"))
            .await
            .unwrap_err();

        assert_eq!(err, RelayError::Timeout);
        assert_eq!(err.status().as_u16(), 504);
    }
}
