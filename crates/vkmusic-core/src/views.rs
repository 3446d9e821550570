//! User-facing texts
//!
//! All bodies are Telegram HTML; catalog-provided strings are escaped here.

use crate::catalog::{Track, TrackId};
use crate::utils::truncate_str;
use std::fmt::Write as _;

/// Maximum characters of an inline button label
const BUTTON_LABEL_LIMIT: usize = 40;

// ─────────────────────────────────────────────────────────────────────────────
// Trait definition
// ─────────────────────────────────────────────────────────────────────────────

/// Texts and formatting for the music bot
pub trait MusicView {
    /// Greeting for `/start`
    fn welcome_message() -> &'static str;

    /// Command list for `/help`
    fn help_message() -> &'static str;

    /// Prompt shown for an empty search query
    fn query_required() -> &'static str;

    /// Shown when a search fails or finds nothing
    fn nothing_found() -> &'static str;

    /// Search results list
    fn search_results(tracks: &[Track]) -> String;

    /// Label of the "add" button for a track
    fn add_button_label(track: &Track) -> String;

    /// Shown for `/playlist` when nothing was added yet
    fn playlist_empty() -> &'static str;

    /// Playlist listing
    fn playlist(tracks: &[TrackId]) -> String;

    /// Toast after a successful add
    fn track_added() -> &'static str;

    /// Replaces the search results once a track was added
    fn track_added_notice() -> &'static str;

    /// Toast for a button rendered for someone else
    fn foreign_button() -> &'static str;

    /// Toast for an unreadable button
    fn button_expired() -> &'static str;

    /// `/download` without an argument
    fn download_usage() -> &'static str;

    /// Shown while yt-dlp runs
    fn download_started() -> &'static str;

    /// Shown when extraction fails
    fn download_failed(unavailable: bool) -> &'static str;
}

// ─────────────────────────────────────────────────────────────────────────────
// Default implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Default Russian-language implementation of `MusicView`
pub struct DefaultMusicView;

impl MusicView for DefaultMusicView {
    fn welcome_message() -> &'static str {
        "Привет! Я могу помочь найти музыку. Отправь название трека или используй команды:\n\
         /playlist - показать твой плейлист\n\
         /download &lt;ссылка&gt; - скачать аудио по ссылке\n\
         /help - помощь"
    }

    fn help_message() -> &'static str {
        "<b>Доступные команды:</b>\n\
         /start - начать работу с ботом\n\
         /playlist - показать ваш плейлист\n\
         /download &lt;ссылка&gt; - скачать аудио по ссылке\n\
         /help - показать это сообщение\n\n\
         Или просто отправьте название трека для поиска."
    }

    fn query_required() -> &'static str {
        "Пожалуйста, введите название трека."
    }

    fn nothing_found() -> &'static str {
        "Не удалось найти треки. Попробуйте еще раз."
    }

    fn search_results(tracks: &[Track]) -> String {
        let mut text = String::from("🎵 <b>Найденные треки:</b>\n");
        for (i, track) in tracks.iter().enumerate() {
            let _ = write!(
                text,
                "\n{}. {}: {}",
                i + 1,
                html_escape::encode_text(&track.display_name()),
                track.source_ref.page_url()
            );
        }
        text.push_str("\n\nВыберите трек для добавления в плейлист:");
        text
    }

    fn add_button_label(track: &Track) -> String {
        format!("➕ {}", truncate_str(track.display_name(), BUTTON_LABEL_LIMIT))
    }

    fn playlist_empty() -> &'static str {
        "Ваш плейлист пуст. Добавьте треки с помощью поиска."
    }

    fn playlist(tracks: &[TrackId]) -> String {
        let mut text = String::from("📋 <b>Ваш плейлист:</b>\n");
        for (i, track_id) in tracks.iter().enumerate() {
            let id = html_escape::encode_text(track_id.as_str());
            match track_id.page_url() {
                Some(url) => {
                    let _ = write!(text, "\n{}. ID трека: {id}\n{url}", i + 1);
                }
                None => {
                    let _ = write!(text, "\n{}. ID трека: {id}", i + 1);
                }
            }
        }
        text
    }

    fn track_added() -> &'static str {
        "Трек добавлен в ваш плейлист!"
    }

    fn track_added_notice() -> &'static str {
        "Трек успешно добавлен в ваш плейлист."
    }

    fn foreign_button() -> &'static str {
        "Эта кнопка относится к чужому поиску."
    }

    fn button_expired() -> &'static str {
        "Кнопка устарела. Повторите поиск."
    }

    fn download_usage() -> &'static str {
        "Использование: /download &lt;ссылка&gt;"
    }

    fn download_started() -> &'static str {
        "⏳ Скачиваю аудио..."
    }

    fn download_failed(unavailable: bool) -> &'static str {
        if unavailable {
            "❌ Это аудио недоступно для скачивания."
        } else {
            "❌ Не удалось скачать аудио. Попробуйте позже."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_track;

    #[test]
    fn test_search_results_layout() {
        let tracks = vec![
            sample_track(371_745_461, 456_239_017, "Adele", "Hello"),
            sample_track(-2_001, 7, "Tom & Jerry", "<Intro>"),
        ];
        insta::assert_snapshot!(DefaultMusicView::search_results(&tracks), @r"
        🎵 <b>Найденные треки:</b>

        1. Adele - Hello: https://vk.com/audio371745461_456239017
        2. Tom &amp; Jerry - &lt;Intro&gt;: https://vk.com/audio-2001_7

        Выберите трек для добавления в плейлист:
        ");
    }

    #[test]
    fn test_playlist_lists_links() {
        let text = DefaultMusicView::playlist(&[TrackId::from("1_2"), TrackId::from("legacy")]);
        assert!(text.contains("1. ID трека: 1_2\nhttps://vk.com/audio1_2"));
        assert!(text.ends_with("2. ID трека: legacy"));
    }

    #[test]
    fn test_button_label_is_truncated() {
        let track = sample_track(1, 2, &"A".repeat(60), "B");
        let label = DefaultMusicView::add_button_label(&track);
        assert!(label.chars().count() <= BUTTON_LABEL_LIMIT + 5);
        assert!(label.starts_with("➕ AAA"));
    }
}
