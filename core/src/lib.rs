pub mod api;
pub mod config;
pub mod elevenlabs;
pub mod error;
pub mod openai;
pub mod session;
pub mod state;
pub mod telemetry;
pub mod transport;

pub use api::{ChatTurn, ImageQuality, ImageSize, VoiceDescriptor, DEFAULT_VOICE_ID};
pub use config::{ConfigError, ServerSettings};
pub use elevenlabs::ElevenLabsClient;
pub use error::ProviderError;
pub use openai::OpenAiClient;
pub use session::{AppState, AssistantBackend, BackendError, HttpBackend};
pub use state::{
    Conversation, ConversationId, ConversationStore, Message, MessageKind, MessageRole,
    NewMessage, ViewKind,
};
pub use transport::{HttpTransport, MockTransport, ReqwestTransport};
