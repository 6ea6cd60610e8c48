use crate::api::{
    ChatReply, ChatRequest, ChatTurn, ErrorReply, ImageQuality, ImageReply, ImageRequest,
    ImageSize, VoiceDescriptor, VoiceRequest, VoicesReply, DEFAULT_VOICE_ID,
};
use crate::state::{ConversationId, ConversationStore, MessageRole, NewMessage, ViewKind};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use parking_lot::RwLock;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use url::Url;

pub const CHAT_APOLOGY: &str =
    "Lo siento, hubo un error al procesar tu mensaje. Por favor, intenta de nuevo.";
pub const IMAGE_APOLOGY: &str =
    "Lo siento, hubo un error al generar la imagen. Por favor, intenta de nuevo.";
pub const VOICE_APOLOGY: &str =
    "Lo siento, hubo un error al generar el audio. Por favor, intenta de nuevo.";
const FALLBACK_VOICE_NAME: &str = "Voz";

#[derive(thiserror::Error, Debug)]
pub enum BackendError {
    #[error("request to the proxy failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid proxy url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("{0}")]
    Remote(String),
    #[error("proxy responded with status {0}")]
    Status(StatusCode),
    #[error("unexpected proxy response: {0}")]
    Decode(String),
}

/// What the UI runtime needs from the proxy routes.
#[async_trait]
pub trait AssistantBackend: Send + Sync {
    async fn chat(&self, messages: &[ChatTurn]) -> Result<String, BackendError>;
    async fn generate_image(&self, request: &ImageRequest) -> Result<String, BackendError>;
    async fn synthesize(&self, request: &VoiceRequest) -> Result<Bytes, BackendError>;
    async fn voices(&self) -> Result<Vec<VoiceDescriptor>, BackendError>;
}

/// Talks to a running `chati-server` over HTTP.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base: Url,
}

impl HttpBackend {
    /// `base_url` is where the proxy routes are mounted. Routes are resolved
    /// relative to it, so `http://host/chati` reaches `http://host/chati/api/chat`.
    pub fn new(base_url: &str) -> Result<Self, BackendError> {
        Ok(Self::with_client(Client::new(), Url::parse(base_url)?))
    }

    pub fn with_client(client: Client, mut base: Url) -> Self {
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Self { client, base }
    }

    fn endpoint(&self, route: &str) -> Result<Url, BackendError> {
        Ok(self.base.join(route)?)
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, BackendError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.endpoint(path)?)
            .json(body)
            .send()
            .await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, BackendError> {
    let status = response.status();
    let value: Value = response.json().await?;
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        return Err(BackendError::Remote(error.to_string()));
    }
    if !status.is_success() {
        return Err(BackendError::Status(status));
    }
    serde_json::from_value(value).map_err(|err| BackendError::Decode(err.to_string()))
}

#[async_trait]
impl AssistantBackend for HttpBackend {
    async fn chat(&self, messages: &[ChatTurn]) -> Result<String, BackendError> {
        let request = ChatRequest {
            messages: messages.to_vec(),
        };
        let reply: ChatReply = self.post_json("api/chat", &request).await?;
        Ok(reply.content)
    }

    async fn generate_image(&self, request: &ImageRequest) -> Result<String, BackendError> {
        let reply: ImageReply = self.post_json("api/image", request).await?;
        Ok(reply.image_url)
    }

    async fn synthesize(&self, request: &VoiceRequest) -> Result<Bytes, BackendError> {
        let response = self
            .client
            .post(self.endpoint("api/voice")?)
            .json(request)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await?;
            return Err(match serde_json::from_slice::<ErrorReply>(&body) {
                Ok(reply) => BackendError::Remote(reply.error),
                Err(_) => BackendError::Status(status),
            });
        }
        Ok(response.bytes().await?)
    }

    async fn voices(&self) -> Result<Vec<VoiceDescriptor>, BackendError> {
        let response = self
            .client
            .get(self.endpoint("api/voices")?)
            .send()
            .await?;
        let reply: VoicesReply = decode(response).await?;
        Ok(reply.voices)
    }
}

struct VoiceSelection {
    available: Vec<VoiceDescriptor>,
    selected: String,
}

/// Handle owned by the UI runtime: the conversation store plus the backend the
/// views submit through. Store locks are never held across an await.
#[derive(Clone)]
pub struct AppState {
    store: Arc<RwLock<ConversationStore>>,
    voices: Arc<RwLock<VoiceSelection>>,
    backend: Arc<dyn AssistantBackend>,
}

impl AppState {
    pub fn new(backend: Arc<dyn AssistantBackend>) -> Self {
        Self {
            store: Arc::new(RwLock::new(ConversationStore::new())),
            voices: Arc::new(RwLock::new(VoiceSelection {
                available: Vec::new(),
                selected: DEFAULT_VOICE_ID.to_string(),
            })),
            backend,
        }
    }

    pub fn snapshot(&self) -> ConversationStore {
        self.store.read().clone()
    }

    pub fn update<R>(&self, mutate: impl FnOnce(&mut ConversationStore) -> R) -> R {
        mutate(&mut *self.store.write())
    }

    /// Returns the conversation the message went to, or `None` when the input
    /// was blank or another request is still in flight.
    pub async fn send_chat_message(&self, input: &str) -> Option<ConversationId> {
        let (conversation_id, _) = self.begin(input, ViewKind::Chat)?;
        let history = self.history(conversation_id);
        let reply = match self.backend.chat(&history).await {
            Ok(content) => NewMessage::text(MessageRole::Assistant, content),
            Err(err) => {
                tracing::warn!(%err, "chat request failed");
                NewMessage::text(MessageRole::Assistant, CHAT_APOLOGY)
            }
        };
        self.finish(conversation_id, reply);
        Some(conversation_id)
    }

    pub async fn generate_image(
        &self,
        input: &str,
        size: ImageSize,
        quality: ImageQuality,
    ) -> Option<ConversationId> {
        let (conversation_id, prompt) = self.begin(input, ViewKind::Image)?;
        let request = ImageRequest {
            prompt: prompt.clone(),
            size,
            quality,
        };
        let reply = match self.backend.generate_image(&request).await {
            Ok(url) => NewMessage::image(format!("Imagen generada: \"{prompt}\""), url),
            Err(err) => {
                tracing::warn!(%err, "image generation failed");
                NewMessage::text(MessageRole::Assistant, IMAGE_APOLOGY)
            }
        };
        self.finish(conversation_id, reply);
        Some(conversation_id)
    }

    pub async fn synthesize_voice(&self, input: &str) -> Option<ConversationId> {
        let (conversation_id, text) = self.begin(input, ViewKind::Voice)?;
        let voice_id = self.selected_voice();
        let request = VoiceRequest {
            text,
            voice_id: Some(voice_id.clone()),
        };
        let reply = match self.backend.synthesize(&request).await {
            Ok(audio) => {
                let audio_url = format!("data:audio/mpeg;base64,{}", STANDARD.encode(&audio));
                let voice_name = self.voice_name(&voice_id);
                NewMessage::audio(format!("Audio generado con {voice_name}"), audio_url)
            }
            Err(err) => {
                tracing::warn!(%err, "speech synthesis failed");
                NewMessage::text(MessageRole::Assistant, VOICE_APOLOGY)
            }
        };
        self.finish(conversation_id, reply);
        Some(conversation_id)
    }

    /// Reloads the voice catalogue. A failed load keeps the previous list.
    pub async fn refresh_voices(&self) -> bool {
        match self.backend.voices().await {
            Ok(voices) => {
                self.voices.write().available = voices;
                true
            }
            Err(err) => {
                tracing::warn!(%err, "failed to load voices");
                false
            }
        }
    }

    pub fn voices(&self) -> Vec<VoiceDescriptor> {
        self.voices.read().available.clone()
    }

    pub fn selected_voice(&self) -> String {
        self.voices.read().selected.clone()
    }

    pub fn select_voice(&self, voice_id: impl Into<String>) {
        self.voices.write().selected = voice_id.into();
    }

    fn voice_name(&self, voice_id: &str) -> String {
        self.voices
            .read()
            .available
            .iter()
            .find(|voice| voice.voice_id() == Some(voice_id))
            .and_then(VoiceDescriptor::name)
            .map(str::to_string)
            .unwrap_or_else(|| FALLBACK_VOICE_NAME.to_string())
    }

    fn begin(&self, input: &str, view: ViewKind) -> Option<(ConversationId, String)> {
        let text = input.trim();
        let mut store = self.store.write();
        if text.is_empty() || store.is_loading() {
            return None;
        }
        let conversation_id = store
            .visible_conversation(view)
            .map(|conversation| conversation.id)
            .unwrap_or_else(|| store.add_conversation(view));
        store.add_message(conversation_id, NewMessage::text(MessageRole::User, text));
        store.set_is_loading(true);
        Some((conversation_id, text.to_string()))
    }

    fn finish(&self, conversation_id: ConversationId, reply: NewMessage) {
        let mut store = self.store.write();
        store.add_message(conversation_id, reply);
        store.set_is_loading(false);
    }

    fn history(&self, conversation_id: ConversationId) -> Vec<ChatTurn> {
        let store = self.store.read();
        store
            .conversation(conversation_id)
            .map(|conversation| {
                conversation
                    .messages
                    .iter()
                    .map(|message| ChatTurn::new(message.role, message.content.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}
