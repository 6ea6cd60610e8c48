use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ConversationId = Uuid;
pub type MessageId = Uuid;

const TITLE_MAX_CHARS: usize = 30;
const TITLE_ELLIPSIS: &str = "...";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    Image,
    Audio,
}

/// The three workspaces of the assistant. Used both as a conversation's kind
/// and as the view currently on screen.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ViewKind {
    #[default]
    Chat,
    Image,
    Voice,
}

impl ViewKind {
    pub fn default_title(self) -> &'static str {
        match self {
            Self::Chat => "Nueva conversación",
            Self::Image => "Nueva imagen",
            Self::Voice => "Nuevo audio",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

/// A message before the store has assigned it an id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub role: MessageRole,
    pub content: String,
    pub kind: MessageKind,
    pub image_url: Option<String>,
    pub audio_url: Option<String>,
}

impl NewMessage {
    pub fn text(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            kind: MessageKind::Text,
            image_url: None,
            audio_url: None,
        }
    }

    pub fn image(content: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            kind: MessageKind::Image,
            image_url: Some(image_url.into()),
            audio_url: None,
        }
    }

    pub fn audio(content: impl Into<String>, audio_url: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            kind: MessageKind::Audio,
            image_url: None,
            audio_url: Some(audio_url.into()),
        }
    }

    fn into_message(self) -> Message {
        Message {
            id: Uuid::new_v4(),
            role: self.role,
            content: self.content,
            timestamp: Utc::now(),
            kind: self.kind,
            image_url: self.image_url,
            audio_url: self.audio_url,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: ConversationId,
    pub title: String,
    pub messages: Vec<Message>,
    #[serde(rename = "type")]
    pub kind: ViewKind,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(kind: ViewKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: kind.default_title().to_string(),
            messages: Vec::new(),
            kind,
            created_at: Utc::now(),
        }
    }

    fn push(&mut self, message: Message) {
        if self.messages.is_empty() && message.role == MessageRole::User {
            self.title = title_from(&message.content);
        }
        self.messages.push(message);
    }
}

/// Navigation state and conversation history of one UI runtime.
///
/// Every mutation is synchronous and total. Operations addressed at an id the
/// store does not know leave the state untouched and report it through their
/// return value instead of an error.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationStore {
    sidebar_collapsed: bool,
    current_view: ViewKind,
    conversations: Vec<Conversation>,
    current_conversation_id: Option<ConversationId>,
    is_loading: bool,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sidebar_collapsed(&self) -> bool {
        self.sidebar_collapsed
    }

    pub fn toggle_sidebar(&mut self) {
        self.sidebar_collapsed = !self.sidebar_collapsed;
    }

    pub fn current_view(&self) -> ViewKind {
        self.current_view
    }

    pub fn set_current_view(&mut self, view: ViewKind) {
        self.current_view = view;
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn set_is_loading(&mut self, loading: bool) {
        self.is_loading = loading;
    }

    /// Newest first.
    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn conversations_of(&self, kind: ViewKind) -> impl Iterator<Item = &Conversation> {
        self.conversations.iter().filter(move |c| c.kind == kind)
    }

    pub fn conversation(&self, id: ConversationId) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn current_conversation_id(&self) -> Option<ConversationId> {
        self.current_conversation_id
    }

    pub fn current_conversation(&self) -> Option<&Conversation> {
        self.current_conversation_id
            .and_then(|id| self.conversation(id))
    }

    /// The current conversation, but only when it belongs to `view`.
    pub fn visible_conversation(&self, view: ViewKind) -> Option<&Conversation> {
        self.current_conversation().filter(|c| c.kind == view)
    }

    pub fn add_conversation(&mut self, kind: ViewKind) -> ConversationId {
        let conversation = Conversation::new(kind);
        let id = conversation.id;
        self.conversations.insert(0, conversation);
        self.current_conversation_id = Some(id);
        self.current_view = kind;
        id
    }

    pub fn select_conversation(&mut self, id: ConversationId) -> bool {
        match self.conversation(id).map(|c| c.kind) {
            Some(kind) => {
                self.current_conversation_id = Some(id);
                self.current_view = kind;
                true
            }
            None => false,
        }
    }

    /// Appends a message and returns its generated id, or `None` when no
    /// conversation has that id.
    pub fn add_message(
        &mut self,
        conversation_id: ConversationId,
        message: NewMessage,
    ) -> Option<MessageId> {
        let conversation = self
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)?;
        let message = message.into_message();
        let id = message.id;
        conversation.push(message);
        Some(id)
    }

    pub fn delete_conversation(&mut self, id: ConversationId) -> bool {
        let Some(position) = self.conversations.iter().position(|c| c.id == id) else {
            return false;
        };
        self.conversations.remove(position);
        if self.current_conversation_id == Some(id) {
            self.current_conversation_id = self.conversations.first().map(|c| c.id);
        }
        true
    }
}

fn title_from(content: &str) -> String {
    let mut chars = content.chars();
    let mut title: String = chars.by_ref().take(TITLE_MAX_CHARS).collect();
    if chars.next().is_some() {
        title.push_str(TITLE_ELLIPSIS);
    }
    title
}
