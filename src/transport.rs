// src/transport.rs

//! Outbound HTTP, behind a trait.
//!
//! Every relay talks to its upstream through [`Upstream`], which wraps an
//! [`HttpTransport`] and applies the configured per-call deadline. Production
//! uses [`ReqwestTransport`]; tests swap in a scripted fake so the network is
//! never touched.

use crate::error::RelayError;
use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Option<Value>,
}

impl OutboundRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            headers: Vec::new(),
            body: Some(body),
        }
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    #[cfg(test)]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status and raw body of an upstream response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundReply {
    pub status: u16,
    pub body: String,
}

impl OutboundReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body. An unparseable body is a local failure, not an
    /// upstream rejection.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, RelayError> {
        serde_json::from_str(&self.body).map_err(RelayError::internal)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("{0}")]
    Failed(String),
}

impl From<TransportError> for RelayError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout => RelayError::Timeout,
            TransportError::Failed(msg) => RelayError::Internal(msg),
        }
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: OutboundRequest) -> Result<OutboundReply, TransportError>;
}

/// [`HttpTransport`] over a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: OutboundRequest) -> Result<OutboundReply, TransportError> {
        let mut builder = self.client.request(request.method, &request.url);

        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let resp = builder.send().await.map_err(classify)?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(classify)?;

        Ok(OutboundReply::new(status, body))
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Failed(err.to_string())
    }
}

/// A transport plus the deadline applied to each call made through it.
#[derive(Clone)]
pub struct Upstream {
    transport: Arc<dyn HttpTransport>,
    deadline: Duration,
}

impl Upstream {
    pub fn new(transport: Arc<dyn HttpTransport>, deadline: Duration) -> Self {
        Self {
            transport,
            deadline,
        }
    }

    pub async fn send(&self, request: OutboundRequest) -> Result<OutboundReply, RelayError> {
        match tokio::time::timeout(self.deadline, self.transport.send(request)).await {
            Ok(result) => Ok(result?),
            Err(_elapsed) => Err(RelayError::Timeout),
        }
    }
}

#[cfg(test)]
pub mod fake {
    //! Scripted transport for tests.

    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Answers calls from a queue of scripted results, in order, and records
    /// every request it sees. An empty queue answers with a transport failure.
    #[derive(Default)]
    pub struct FakeTransport {
        script: Mutex<VecDeque<Result<OutboundReply, TransportError>>>,
        seen: Mutex<Vec<OutboundRequest>>,
        delay: Option<Duration>,
    }

    impl FakeTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reply(self, status: u16, body: impl Into<String>) -> Self {
            self.push(Ok(OutboundReply::new(status, body)))
        }

        pub fn fail(self, err: TransportError) -> Self {
            self.push(Err(err))
        }

        /// Sleep this long before answering each call.
        pub fn delayed(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        fn push(self, item: Result<OutboundReply, TransportError>) -> Self {
            self.script.lock().unwrap().push_back(item);
            self
        }

        pub fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }

        pub fn requests(&self) -> Vec<OutboundRequest> {
            self.seen.lock().unwrap().clone()
        }

        pub fn upstream(self: &Arc<Self>) -> Upstream {
            Upstream::new(self.clone(), Duration::from_secs(5))
        }
    }

    #[async_trait]
    impl HttpTransport for FakeTransport {
        async fn send(&self, request: OutboundRequest) -> Result<OutboundReply, TransportError> {
            self.seen.lock().unwrap().push(request);

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Failed("no scripted reply".into())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeTransport;
    use super::*;

    #[test]
    fn success_range_is_2xx() {
        assert!(OutboundReply::new(200, "").is_success());
        assert!(OutboundReply::new(201, "").is_success());
        assert!(!OutboundReply::new(302, "").is_success());
        assert!(!OutboundReply::new(500, "").is_success());
    }

    #[test]
    fn malformed_json_is_a_local_failure() {
        let err = OutboundReply::new(200, "<html>")
            .json::<Value>()
            .unwrap_err();

        assert!(matches!(err, RelayError::Internal(_)));
    }

    #[test]
    fn header_lookup_ignores_case() {
        let req = OutboundRequest::get("http://x").header("X-RapidAPI-Key", "k");
        assert_eq!(req.header_value("x-rapidapi-key"), Some("k"));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_transport_hits_the_deadline() {
        let fake = Arc::new(FakeTransport::new().reply(200, "{}").delayed(Duration::from_secs(30)));
        let upstream = Upstream::new(fake.clone(), Duration::from_secs(2));

        let err = upstream.send(OutboundRequest::get("http://x")).await.unwrap_err();

        assert_eq!(err, RelayError::Timeout);
        assert_eq!(fake.calls(), 1);
    }

    #[tokio::test]
    async fn transport_timeout_maps_to_timeout_condition() {
        let fake = Arc::new(FakeTransport::new().fail(TransportError::Timeout));

        let err = fake
            .upstream()
            .send(OutboundRequest::get("http://x"))
            .await
            .unwrap_err();

        assert_eq!(err, RelayError::Timeout);
    }

    #[tokio::test]
    async fn transport_failure_maps_to_server_error() {
        let fake = Arc::new(FakeTransport::new().fail(TransportError::Failed("dns".into())));

        let err = fake
            .upstream()
            .send(OutboundRequest::get("http://x"))
            .await
            .unwrap_err();

        assert_eq!(err, RelayError::Internal("dns".into()));
    }
}
