use crate::api::{VoiceDescriptor, VoicesReply};
use crate::config::ElevenLabsSettings;
use crate::error::ProviderError;
use crate::transport::{dispatch, HttpTransport, OutboundRequest};
use bytes::Bytes;
use serde_json::json;
use std::sync::Arc;
use url::Url;

const PROVIDER: &str = "ElevenLabs";
const CREDENTIAL: &str = "ELEVENLABS_API_KEY";

/// Text-to-speech and voice catalogue. Unlike the chat provider, the credential
/// is required before any call is attempted.
#[derive(Clone)]
pub struct ElevenLabsClient {
    settings: ElevenLabsSettings,
    transport: Arc<dyn HttpTransport>,
}

impl ElevenLabsClient {
    pub fn new(settings: ElevenLabsSettings, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            settings,
            transport,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.settings.api_key.is_some()
    }

    pub fn default_voice_id(&self) -> &str {
        &self.settings.default_voice_id
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.settings
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingCredential(CREDENTIAL))
    }

    /// Returns the synthesised speech as MPEG audio.
    pub async fn synthesize(&self, text: &str, voice_id: &str) -> Result<Bytes, ProviderError> {
        let api_key = self.api_key()?;
        let body = json!({
            "text": text,
            "model_id": self.settings.model_id,
            "voice_settings": {
                "stability": self.settings.stability,
                "similarity_boost": self.settings.similarity_boost,
            },
        });
        let request = OutboundRequest::post_json(self.speech_url(voice_id)?, body)
            .header("Accept", "audio/mpeg")
            .header("xi-api-key", api_key);
        let response = dispatch(self.transport.as_ref(), PROVIDER, request).await?;
        if !response.is_success() {
            return Err(ProviderError::Upstream {
                provider: PROVIDER,
                status: response.status,
                message: format!("ElevenLabs error: {}", response.text()),
            });
        }
        Ok(response.body)
    }

    pub async fn voices(&self) -> Result<Vec<VoiceDescriptor>, ProviderError> {
        let api_key = self.api_key()?;
        let request = OutboundRequest::get(format!("{}/v1/voices", self.settings.base_url))
            .header("xi-api-key", api_key);
        let response = dispatch(self.transport.as_ref(), PROVIDER, request).await?;
        if !response.is_success() {
            return Err(ProviderError::Upstream {
                provider: PROVIDER,
                status: response.status,
                message: "Error fetching voices".to_string(),
            });
        }
        let catalogue: VoicesReply = response.json().map_err(|err| ProviderError::Malformed {
            provider: PROVIDER,
            message: err.to_string(),
        })?;
        Ok(catalogue.voices)
    }

    fn speech_url(&self, voice_id: &str) -> Result<String, ProviderError> {
        let invalid = |message: String| ProviderError::Malformed {
            provider: PROVIDER,
            message,
        };
        let mut url = Url::parse(&format!("{}/v1/text-to-speech", self.settings.base_url))
            .map_err(|err| invalid(format!("bad speech url: {err}")))?;
        url.path_segments_mut()
            .map_err(|_| invalid("speech url cannot take a voice id".to_string()))?
            .push(voice_id);
        Ok(url.into())
    }
}
