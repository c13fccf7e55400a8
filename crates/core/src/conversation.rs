//! Conversation-related types.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Title of a conversation that has no messages yet.
pub const NEW_CONVERSATION_TITLE: &str = "New Conversation";

/// Who wrote a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person using the chat.
    User,
    /// The search assistant.
    Assistant,
}

impl Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A message in a conversation. Messages never change once appended.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    content: String,
}

impl Message {
    /// Returns the author of this message.
    #[inline]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns the text of this message.
    #[inline]
    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Identifies a conversation.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
pub struct ConversationId(Uuid);

impl ConversationId {
    #[inline]
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Represents a conversation.
///
/// The message list is append-only.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Conversation {
    id: ConversationId,
    title: String,
    messages: Vec<Message>,
}

impl Conversation {
    /// Creates an empty conversation with a fresh identifier.
    pub fn new() -> Self {
        Self {
            id: ConversationId::new(),
            title: NEW_CONVERSATION_TITLE.to_owned(),
            messages: vec![],
        }
    }

    /// Returns the identifier of this conversation.
    #[inline]
    pub fn id(&self) -> ConversationId {
        self.id
    }

    /// Returns the title of this conversation.
    #[inline]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Replaces the title.
    #[inline]
    pub fn set_title<S: Into<String>>(&mut self, title: S) {
        self.title = title.into();
    }

    /// Returns the messages in the order they were added.
    #[inline]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Appends a message written by the user.
    pub fn push_user<S: Into<String>>(&mut self, content: S) {
        self.push(Role::User, content.into());
    }

    /// Appends a message written by the assistant.
    pub fn push_assistant<S: Into<String>>(&mut self, content: S) {
        self.push(Role::Assistant, content.into());
    }

    fn push(&mut self, role: Role, content: String) {
        if self.messages.last().map(Message::role) == Some(role) {
            // Nothing prevents this, but the UI normally alternates.
            debug!("two consecutive {role} messages in {}", self.id);
        }
        self.messages.push(Message { role, content });
    }
}

impl Default for Conversation {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
