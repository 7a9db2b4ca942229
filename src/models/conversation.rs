use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// A conversation as stored in the search index, with its messages and tags
/// embedded as nested collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationDocument {
    /// Conversation ID
    pub id: Uuid,

    /// Owning user
    pub user_id: Uuid,

    /// Title, may be empty (see [`ConversationDocument::display_title`])
    #[serde(default)]
    pub title: String,

    /// Provider label (openai, claude, gemini, ...)
    #[serde(default)]
    pub provider: String,

    /// Model label
    #[serde(default)]
    pub model: String,

    /// ID of the conversation in the source system
    #[serde(default)]
    pub source_id: String,

    /// Title as provided by the source system
    #[serde(default)]
    pub source_title: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,

    /// Messages in conversation order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<MessageDocument>,

    /// Tags attached to the conversation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<TagDocument>,
}

impl ConversationDocument {
    /// Create an empty conversation owned by `user_id`
    pub fn new(user_id: Uuid, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            title: title.into(),
            provider: String::new(),
            model: String::new(),
            source_id: String::new(),
            source_title: String::new(),
            created_at: now,
            updated_at: now,
            messages: Vec::new(),
            tags: Vec::new(),
        }
    }

    /// Title shown to users: the title, or the source title when empty
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.source_title
        } else {
            &self.title
        }
    }

    /// Append a message, stamping it with this conversation's ID
    pub fn push_message(&mut self, mut message: MessageDocument) {
        message.conversation_id = self.id;
        self.messages.push(message);
    }
}

/// A single message nested inside a [`ConversationDocument`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageDocument {
    pub id: Uuid,

    pub conversation_id: Uuid,

    pub role: Role,

    #[serde(default)]
    pub content: String,

    #[serde(default)]
    pub source_id: String,

    /// Content as provided by the source system, kept for diffing
    #[serde(default)]
    pub source_content: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl MessageDocument {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            conversation_id: Uuid::nil(),
            role,
            content: content.into(),
            source_id: String::new(),
            source_content: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Text used for matching and display: the content, or the source
    /// content when empty
    pub fn effective_content(&self) -> &str {
        if self.content.is_empty() {
            &self.source_content
        } else {
            &self.content
        }
    }
}

/// A tag nested inside a [`ConversationDocument`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagDocument {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TagDocument {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    /// Any role label not recognised above (e.g. tool output from some exports)
    #[serde(other)]
    Unknown,
}
