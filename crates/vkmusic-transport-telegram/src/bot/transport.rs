//! Bot API implementation of the core chat transport.

use super::resilient::{
    answer_callback_resilient, edit_message_resilient, send_audio_resilient,
    send_message_resilient,
};
use crate::config::TELEGRAM_MESSAGE_LIMIT;
use anyhow::Result;
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQuery, ChatId, InlineKeyboardButton, InlineKeyboardMarkup, MessageId,
};
use tracing::warn;
use vkmusic_core::chat::{ChatTransport, InlineKeyboard, Outbound};
use vkmusic_core::utils::split_long_message;

/// Delivers outbound actions for one incoming update
pub struct TelegramChatTransport {
    bot: Bot,
    /// Query being answered when the update was a button press
    callback: Option<CallbackQuery>,
}

impl TelegramChatTransport {
    /// Transport for a message update.
    #[must_use]
    pub fn new(bot: Bot) -> Self {
        Self {
            bot,
            callback: None,
        }
    }

    /// Transport for a callback query update.
    #[must_use]
    pub fn for_callback(bot: Bot, query: CallbackQuery) -> Self {
        Self {
            bot,
            callback: Some(query),
        }
    }

    async fn send_text(
        &self,
        chat_id: ChatId,
        body: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<()> {
        let parts = split_long_message(body, TELEGRAM_MESSAGE_LIMIT);
        let last = parts.len().saturating_sub(1);

        for (i, part) in parts.iter().enumerate() {
            let markup = if i == last { keyboard.as_ref() } else { None };
            send_message_resilient(&self.bot, chat_id, part, markup).await?;
        }
        Ok(())
    }
}

/// Converts a core keyboard into Bot API markup.
#[must_use]
pub fn to_markup(keyboard: InlineKeyboard) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(keyboard.rows.into_iter().map(|row| {
        row.into_iter()
            .map(|button| InlineKeyboardButton::callback(button.label, button.payload))
            .collect::<Vec<_>>()
    }))
}

#[async_trait]
impl ChatTransport for TelegramChatTransport {
    async fn deliver(&self, action: Outbound) -> Result<()> {
        match action {
            Outbound::SendText {
                chat_id,
                body,
                keyboard,
            } => {
                self.send_text(ChatId(chat_id), &body, keyboard.map(to_markup))
                    .await
            }
            Outbound::AcknowledgeButton { callback_id, toast } => {
                let Some(query) = self
                    .callback
                    .as_ref()
                    .filter(|q| q.id.to_string() == callback_id)
                else {
                    warn!(callback_id = %callback_id, "No matching callback query to answer");
                    return Ok(());
                };
                answer_callback_resilient(&self.bot, query, toast.as_deref()).await
            }
            Outbound::EditText {
                chat_id,
                message_id,
                body,
            } => {
                edit_message_resilient(&self.bot, ChatId(chat_id), MessageId(message_id), &body)
                    .await
            }
            Outbound::SendAudio {
                chat_id,
                path,
                title,
            } => send_audio_resilient(&self.bot, ChatId(chat_id), &path, &title).await,
        }
    }
}
