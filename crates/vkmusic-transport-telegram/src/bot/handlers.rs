//! Telegram update parsing
//!
//! Converts messages and callback queries into core chat events.

use teloxide::types::{CallbackQuery, Message};
use teloxide::utils::command::BotCommands;
use vkmusic_core::chat::{self, Event, Inbound};

/// Supported commands for the bot
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Доступные команды:")]
pub enum Command {
    /// Show the welcome message
    #[command(description = "начать работу с ботом.")]
    Start,
    /// List commands
    #[command(description = "показать это сообщение.")]
    Help,
    /// Show the user's playlist
    #[command(description = "показать ваш плейлист.")]
    Playlist,
    /// Download audio from a link
    #[command(description = "скачать аудио по ссылке.")]
    Download(String),
}

impl From<Command> for chat::Command {
    fn from(cmd: Command) -> Self {
        match cmd {
            Command::Start => Self::Start,
            Command::Help => Self::Help,
            Command::Playlist => Self::Playlist,
            Command::Download(url) => Self::Download(url),
        }
    }
}

/// Safe extraction of user ID from a message.
/// Returns 0 if the user information is missing.
#[must_use]
pub fn get_user_id_safe(msg: &Message) -> i64 {
    msg.from.as_ref().map_or(0, |u| u.id.0.cast_signed())
}

/// Display name used in logs.
#[must_use]
pub fn get_user_name(msg: &Message) -> String {
    msg.from
        .as_ref()
        .map(|user| {
            user.username
                .clone()
                .unwrap_or_else(|| user.first_name.clone())
        })
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Event for a command message.
#[must_use]
pub fn command_event(msg: &Message, cmd: Command) -> Event {
    message_event(msg, Inbound::Command(cmd.into()))
}

/// Event for a plain-text message, `None` for non-text messages.
#[must_use]
pub fn text_event(msg: &Message) -> Option<Event> {
    let text = msg.text()?;
    Some(message_event(msg, Inbound::Text(text.to_string())))
}

fn message_event(msg: &Message, inbound: Inbound) -> Event {
    Event {
        chat_id: msg.chat.id.0,
        user_id: get_user_id_safe(msg),
        inbound,
    }
}

/// Event for an inline button press.
///
/// Returns `None` when the query has no data or its message is gone.
#[must_use]
pub fn callback_event(q: &CallbackQuery) -> Option<Event> {
    let payload = q.data.clone()?;
    let message = q.message.as_ref()?;

    Some(Event {
        chat_id: message.chat().id.0,
        user_id: q.from.id.0.cast_signed(),
        inbound: Inbound::ButtonPress {
            callback_id: q.id.to_string(),
            payload,
            message_id: Some(message.id().0),
        },
    })
}
