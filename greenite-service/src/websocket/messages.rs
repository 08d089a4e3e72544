//! WebSocket message types.
//!
//! Defines the client-to-server and server-to-client message formats
//! for WebSocket communication.

use serde::{Deserialize, Serialize};

use crate::auth::LoginOutcome;
use crate::chat::ChatEvent;

/// Screens of the client application
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum View {
    /// Entry screen, the only one reachable without a session
    #[default]
    Login,
    Chat,
    Notice,
    Play,
    Badges,
}

impl View {
    /// Whether showing this view requires a live session
    pub fn is_gated(self) -> bool {
        !matches!(self, View::Login)
    }
}

/// Messages sent from client to server
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Submit credentials
    Login { email: String, password: String },
    Logout,
    /// Client switched screens
    Navigate { view: View },
    /// Queue a message for the assistant
    ChatMessage { message: String },
    /// Keepalive ping
    Ping,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Response to a login attempt
    LoginResponse {
        #[serde(flatten)]
        outcome: LoginOutcome,
    },
    /// Session ended, by request or expiry
    LoggedOut {
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    UserTurn { text: String },
    AssistantTurn { text: String },
    /// Show or hide the pending indicator
    Thinking { visible: bool },
    /// Disable or re-enable chat input
    InputLocked { locked: bool },
    QuickActionsHidden,
    /// Client must switch to the given view
    Redirect { view: View },
    /// Keepalive pong response
    Pong { timestamp: i64 },
    /// Error message
    Error {
        code: String,
        message: String,
        recoverable: bool,
    },
}

impl From<ChatEvent> for ServerMessage {
    fn from(event: ChatEvent) -> Self {
        match event {
            ChatEvent::UserTurn { text } => ServerMessage::UserTurn { text },
            ChatEvent::AssistantTurn { text } => ServerMessage::AssistantTurn { text },
            ChatEvent::ThinkingShown => ServerMessage::Thinking { visible: true },
            ChatEvent::ThinkingHidden => ServerMessage::Thinking { visible: false },
            ChatEvent::InputLocked => ServerMessage::InputLocked { locked: true },
            ChatEvent::InputUnlocked => ServerMessage::InputLocked { locked: false },
            ChatEvent::QuickActionsHidden => ServerMessage::QuickActionsHidden,
        }
    }
}
