//! Resilient messaging with automatic retry for Telegram API operations.
//!
//! Bot API calls are retried on failure with exponential backoff and jitter.
//! Only chat delivery goes through here; catalog searches are never retried.

use crate::config::{
    TELEGRAM_API_INITIAL_BACKOFF_MS, TELEGRAM_API_MAX_BACKOFF_MS, TELEGRAM_API_MAX_RETRIES,
};
use anyhow::Result;
use std::path::Path;
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQuery, ChatId, InlineKeyboardMarkup, InputFile, MessageId, ParseMode,
};
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;
use tracing::warn;

/// Retry an async Telegram operation with exponential backoff.
///
/// Strategy: 500ms initial delay, 4s max delay, 3 retries, with jitter.
///
/// # Errors
///
/// Returns the last error if every attempt fails.
///
/// # Examples
///
/// ```no_run
/// use vkmusic_transport_telegram::bot::resilient::retry_telegram_operation;
///
/// # async fn example() -> anyhow::Result<()> {
/// let value = retry_telegram_operation(|| async { Ok::<_, anyhow::Error>(42) }).await?;
/// assert_eq!(value, 42);
/// # Ok(())
/// # }
/// ```
pub async fn retry_telegram_operation<F, Fut, T>(operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let retry_strategy = ExponentialBackoff::from_millis(TELEGRAM_API_INITIAL_BACKOFF_MS)
        .max_delay(Duration::from_millis(TELEGRAM_API_MAX_BACKOFF_MS))
        .map(jitter)
        .take(TELEGRAM_API_MAX_RETRIES);

    Retry::spawn(retry_strategy, operation).await.map_err(|e| {
        warn!(
            "Telegram API operation failed after {} retries: {}",
            TELEGRAM_API_MAX_RETRIES, e
        );
        e
    })
}

/// Send an HTML message, optionally with an inline keyboard.
///
/// # Errors
///
/// Returns an error after all retries are exhausted.
pub async fn send_message_resilient(
    bot: &Bot,
    chat_id: ChatId,
    text: &str,
    keyboard: Option<&InlineKeyboardMarkup>,
) -> Result<()> {
    retry_telegram_operation(|| async {
        let mut req = bot
            .send_message(chat_id, text.to_string())
            .parse_mode(ParseMode::Html);
        if let Some(markup) = keyboard {
            req = req.reply_markup(markup.clone());
        }
        req.await
            .map(|_| ())
            .map_err(|e| anyhow::anyhow!("Telegram send error: {e}"))
    })
    .await
}

/// Answer a callback query, showing `toast` as a notification when present.
///
/// # Errors
///
/// Returns an error after all retries are exhausted.
pub async fn answer_callback_resilient(
    bot: &Bot,
    query: &CallbackQuery,
    toast: Option<&str>,
) -> Result<()> {
    retry_telegram_operation(|| async {
        let mut req = bot.answer_callback_query(query.id.clone());
        if let Some(text) = toast {
            req = req.text(text.to_string());
        }
        req.await
            .map(|_| ())
            .map_err(|e| anyhow::anyhow!("Telegram callback answer error: {e}"))
    })
    .await
}

/// Replace the text of an earlier message.
///
/// # Errors
///
/// Returns an error after all retries are exhausted.
pub async fn edit_message_resilient(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    text: &str,
) -> Result<()> {
    retry_telegram_operation(|| async {
        bot.edit_message_text(chat_id, message_id, text.to_string())
            .parse_mode(ParseMode::Html)
            .await
            .map(|_| ())
            .map_err(|e| anyhow::anyhow!("Telegram edit error: {e}"))
    })
    .await
}

/// Upload a local audio file.
///
/// # Errors
///
/// Returns an error after all retries are exhausted.
pub async fn send_audio_resilient(
    bot: &Bot,
    chat_id: ChatId,
    path: &Path,
    title: &str,
) -> Result<()> {
    retry_telegram_operation(|| async {
        let mut req = bot.send_audio(chat_id, InputFile::file(path.to_path_buf()));
        if !title.is_empty() {
            req = req.title(title.to_string());
        }
        req.await
            .map(|_| ())
            .map_err(|e| anyhow::anyhow!("Telegram audio upload error: {e}"))
    })
    .await
}
