//! Transport-independent chat events and actions
//!
//! A transport turns platform updates into [`Event`]s, hands them to
//! [`ChatService::handle`] and performs the resulting [`Outbound`] actions
//! through its [`ChatTransport`] implementation.

/// Inline button payload codec.
pub mod payload;
/// Event dispatch over search, playlists and media.
pub mod service;

pub use payload::{ButtonPayload, PayloadError, MAX_PAYLOAD_BYTES};
pub use service::ChatService;

use async_trait::async_trait;
use std::path::PathBuf;

/// Whether `text` is addressed to a bot as a command.
///
/// Such messages are never treated as search queries, even when no known
/// command matched them.
#[must_use]
pub fn looks_like_command(text: &str) -> bool {
    text.trim_start().starts_with('/')
}

/// Bot commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/start`
    Start,
    /// `/help`
    Help,
    /// `/playlist`
    Playlist,
    /// `/download <url>`; the argument may be empty
    Download(String),
}

/// What the user did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A recognized command
    Command(Command),
    /// Free text
    Text(String),
    /// An inline button was pressed
    ButtonPress {
        /// Platform id used to acknowledge the press
        callback_id: String,
        /// Raw callback data
        payload: String,
        /// Message carrying the button, `None` when the platform no longer has it
        message_id: Option<i32>,
    },
}

/// An inbound event with its origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Chat to answer in
    pub chat_id: i64,
    /// Sender
    pub user_id: i64,
    /// Event body
    pub inbound: Inbound,
}

/// A single inline button
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    /// Visible label
    pub label: String,
    /// Callback data, at most [`MAX_PAYLOAD_BYTES`]
    pub payload: String,
}

/// Inline keyboard attached to a message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineKeyboard {
    /// Button rows, top to bottom
    pub rows: Vec<Vec<InlineButton>>,
}

/// Action the transport must perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Send an HTML message
    SendText {
        /// Target chat
        chat_id: i64,
        /// HTML body
        body: String,
        /// Keyboard attached to the message
        keyboard: Option<InlineKeyboard>,
    },
    /// Answer a button press, optionally with a toast
    AcknowledgeButton {
        /// Id from [`Inbound::ButtonPress`]
        callback_id: String,
        /// Toast text
        toast: Option<String>,
    },
    /// Replace the text of a message sent earlier, dropping its keyboard
    EditText {
        /// Chat holding the message
        chat_id: i64,
        /// Message to edit
        message_id: i32,
        /// New HTML body
        body: String,
    },
    /// Upload a local audio file
    SendAudio {
        /// Target chat
        chat_id: i64,
        /// File to upload
        path: PathBuf,
        /// Track title shown by the client
        title: String,
    },
}

/// Delivery side of a chat platform
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Performs one outbound action.
    ///
    /// # Errors
    ///
    /// Returns an error when the platform rejects the action.
    async fn deliver(&self, action: Outbound) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_like_text() {
        assert!(looks_like_command("/foo"));
        assert!(looks_like_command("  /playlist@otherbot"));
        assert!(!looks_like_command("AC/DC Thunderstruck"));
        assert!(!looks_like_command("https://youtu.be/abc"));
    }
}
