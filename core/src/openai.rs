use crate::api::{ChatTurn, ImageRequest};
use crate::config::OpenAiSettings;
use crate::error::ProviderError;
use crate::transport::{dispatch, HttpTransport, InboundResponse, OutboundRequest};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

const PROVIDER: &str = "OpenAI";
const NO_CONTENT_FALLBACK: &str = "No response";

/// Chat completion and image generation against an OpenAI-compatible API.
///
/// The credential is not checked up front; a missing key is simply not sent and
/// the provider rejects the call.
#[derive(Clone)]
pub struct OpenAiClient {
    settings: OpenAiSettings,
    transport: Arc<dyn HttpTransport>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: Option<CompletionMessage>,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ImageResponse {
    #[serde(default)]
    data: Vec<ImageDatum>,
}

#[derive(Deserialize)]
struct ImageDatum {
    url: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

impl OpenAiClient {
    pub fn new(settings: OpenAiSettings, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            settings,
            transport,
        }
    }

    pub fn settings(&self) -> &OpenAiSettings {
        &self.settings
    }

    pub async fn chat_completion(&self, messages: &[ChatTurn]) -> Result<String, ProviderError> {
        let body = json!({
            "model": self.settings.chat_model,
            "messages": messages,
            "max_tokens": self.settings.max_tokens,
        });
        let request = self.authorize(OutboundRequest::post_json(
            format!("{}/chat/completions", self.settings.base_url),
            body,
        ));
        let response = self.send(request).await?;
        let completion: CompletionResponse = response.json().map_err(malformed)?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .filter(|content| !content.is_empty())
            .unwrap_or_else(|| NO_CONTENT_FALLBACK.to_string());
        Ok(content)
    }

    /// Requests exactly one image and returns its URL.
    pub async fn generate_image(&self, request: &ImageRequest) -> Result<String, ProviderError> {
        let body = json!({
            "model": self.settings.image_model,
            "prompt": request.prompt,
            "n": 1,
            "size": request.size.as_str(),
            "quality": request.quality.as_str(),
        });
        let outbound = self.authorize(OutboundRequest::post_json(
            format!("{}/images/generations", self.settings.base_url),
            body,
        ));
        let response = self.send(outbound).await?;
        let images: ImageResponse = response.json().map_err(malformed)?;
        images
            .data
            .into_iter()
            .next()
            .and_then(|datum| datum.url)
            .filter(|url| !url.is_empty())
            .ok_or(ProviderError::NoImage)
    }

    fn authorize(&self, request: OutboundRequest) -> OutboundRequest {
        match self.settings.api_key.as_deref() {
            Some(key) => request.bearer(key),
            None => request,
        }
    }

    async fn send(&self, request: OutboundRequest) -> Result<InboundResponse, ProviderError> {
        let response = dispatch(self.transport.as_ref(), PROVIDER, request).await?;
        if response.is_success() {
            return Ok(response);
        }
        let detail = response
            .json::<ErrorEnvelope>()
            .map(|envelope| envelope.error.message)
            .unwrap_or_else(|_| response.text());
        Err(ProviderError::Upstream {
            provider: PROVIDER,
            status: response.status,
            message: format!("{} {}", response.status.as_u16(), detail.trim()),
        })
    }
}

fn malformed(err: serde_json::Error) -> ProviderError {
    ProviderError::Malformed {
        provider: PROVIDER,
        message: err.to_string(),
    }
}
