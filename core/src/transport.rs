use crate::error::ProviderError;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::VecDeque;

/// One outbound call to a provider, described independently of the HTTP client.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub json: Option<Value>,
}

impl OutboundRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            headers: Vec::new(),
            json: None,
        }
    }

    pub fn post_json(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            headers: Vec::new(),
            json: Some(body),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn bearer(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {token}"))
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct InboundResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl InboundResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: OutboundRequest) -> Result<InboundResponse>;
}

/// Production transport backed by a shared `reqwest` client.
#[derive(Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: OutboundRequest) -> Result<InboundResponse> {
        tracing::debug!(method = %request.method, url = %request.url, "outbound provider call");
        let mut builder = self.client.request(request.method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.json {
            builder = builder.json(body);
        }
        let response = builder
            .send()
            .await
            .with_context(|| format!("failed to reach {}", request.url))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .context("failed to read provider response body")?;
        Ok(InboundResponse { status, body })
    }
}

/// Scripted transport for tests and smoke runs. Responses are handed out in the
/// order they were queued; every request is recorded.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<InboundResponse>>>,
    requests: Mutex<Vec<OutboundRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_json(&self, status: StatusCode, body: Value) {
        let body = Bytes::from(body.to_string());
        self.responses
            .lock()
            .push_back(Ok(InboundResponse { status, body }));
    }

    pub fn push_bytes(&self, status: StatusCode, body: impl Into<Bytes>) {
        self.responses.lock().push_back(Ok(InboundResponse {
            status,
            body: body.into(),
        }));
    }

    pub fn push_failure(&self, message: impl Into<String>) {
        self.responses
            .lock()
            .push_back(Err(anyhow!(message.into())));
    }

    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.requests.lock().clone()
    }

    pub fn last_request(&self) -> Option<OutboundRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn execute(&self, request: OutboundRequest) -> Result<InboundResponse> {
        let url = request.url.clone();
        self.requests.lock().push(request);
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(anyhow!("no scripted response for {url}")))
    }
}

pub(crate) async fn dispatch(
    transport: &dyn HttpTransport,
    provider: &'static str,
    request: OutboundRequest,
) -> std::result::Result<InboundResponse, ProviderError> {
    transport
        .execute(request)
        .await
        .map_err(|err| ProviderError::Transport {
            provider,
            message: format!("{err:#}"),
        })
}
