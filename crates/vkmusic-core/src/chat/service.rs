use super::{
    looks_like_command, ButtonPayload, ChatTransport, Command, Event, Inbound, InlineButton,
    InlineKeyboard, Outbound,
};
use crate::catalog::Track;
use crate::media::{parse_link, MediaError, MediaFetcher};
use crate::playlist::PlaylistStore;
use crate::search::{SearchError, SearchService};
use crate::views::{DefaultMusicView, MusicView};
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Routes chat events to search, playlists and media extraction
pub struct ChatService {
    search: Arc<SearchService>,
    playlists: Arc<dyn PlaylistStore>,
    media: Arc<dyn MediaFetcher>,
}

impl ChatService {
    /// Creates a chat service over shared collaborators.
    #[must_use]
    pub fn new(
        search: Arc<SearchService>,
        playlists: Arc<dyn PlaylistStore>,
        media: Arc<dyn MediaFetcher>,
    ) -> Self {
        Self {
            search,
            playlists,
            media,
        }
    }

    /// Handles one event, delivering every resulting action through `transport`.
    ///
    /// Search, playlist and media failures are turned into user-facing
    /// messages here.
    ///
    /// # Errors
    ///
    /// Returns an error only when the transport fails to deliver an action.
    pub async fn handle(&self, event: Event, transport: &dyn ChatTransport) -> Result<()> {
        let Event {
            chat_id,
            user_id,
            inbound,
        } = event;

        match inbound {
            Inbound::Command(Command::Start) => {
                send_text(transport, chat_id, DefaultMusicView::welcome_message()).await
            }
            Inbound::Command(Command::Help) => {
                send_text(transport, chat_id, DefaultMusicView::help_message()).await
            }
            Inbound::Command(Command::Playlist) => {
                self.show_playlist(transport, chat_id, user_id).await
            }
            Inbound::Command(Command::Download(url)) => {
                if url.trim().is_empty() {
                    return send_text(transport, chat_id, DefaultMusicView::download_usage()).await;
                }
                self.download(transport, chat_id, url.trim()).await
            }
            Inbound::Text(text) => {
                if looks_like_command(&text) {
                    debug!(user_id, "Ignoring unrecognized command");
                    Ok(())
                } else if parse_link(&text).is_some() {
                    self.download(transport, chat_id, text.trim()).await
                } else {
                    self.search(transport, chat_id, user_id, &text).await
                }
            }
            Inbound::ButtonPress {
                callback_id,
                payload,
                message_id,
            } => {
                let added = self
                    .button_press(transport, user_id, callback_id, &payload)
                    .await?;
                match message_id {
                    Some(message_id) if added => {
                        transport
                            .deliver(Outbound::EditText {
                                chat_id,
                                message_id,
                                body: DefaultMusicView::track_added_notice().to_string(),
                            })
                            .await
                    }
                    _ => Ok(()),
                }
            }
        }
    }

    async fn show_playlist(
        &self,
        transport: &dyn ChatTransport,
        chat_id: i64,
        user_id: i64,
    ) -> Result<()> {
        let tracks = self.playlists.list(user_id).await;
        if tracks.is_empty() {
            return send_text(transport, chat_id, DefaultMusicView::playlist_empty()).await;
        }
        send_text(transport, chat_id, DefaultMusicView::playlist(&tracks)).await
    }

    async fn search(
        &self,
        transport: &dyn ChatTransport,
        chat_id: i64,
        user_id: i64,
        query: &str,
    ) -> Result<()> {
        let tracks = match self.search.search(query).await {
            Ok(tracks) if !tracks.is_empty() => tracks,
            Ok(_) | Err(SearchError::Upstream(_)) => {
                return send_text(transport, chat_id, DefaultMusicView::nothing_found()).await;
            }
            Err(SearchError::InvalidQuery) => {
                return send_text(transport, chat_id, DefaultMusicView::query_required()).await;
            }
        };

        info!(user_id, results = tracks.len(), "Search answered");
        let keyboard = add_keyboard(user_id, &tracks);
        transport
            .deliver(Outbound::SendText {
                chat_id,
                body: DefaultMusicView::search_results(&tracks),
                keyboard: (!keyboard.rows.is_empty()).then_some(keyboard),
            })
            .await
    }

    /// Acknowledges the press; returns whether a track was appended.
    async fn button_press(
        &self,
        transport: &dyn ChatTransport,
        user_id: i64,
        callback_id: String,
        payload: &str,
    ) -> Result<bool> {
        let (added, toast) = match ButtonPayload::decode(payload) {
            Ok(ButtonPayload::AddToPlaylist {
                user_id: owner,
                track_id,
            }) => {
                if owner == user_id {
                    self.playlists.append(user_id, track_id).await;
                    (true, DefaultMusicView::track_added())
                } else {
                    warn!(user_id, owner, "Button pressed by a different user");
                    (false, DefaultMusicView::foreign_button())
                }
            }
            Err(e) => {
                warn!(user_id, error = %e, "Unreadable button payload");
                (false, DefaultMusicView::button_expired())
            }
        };

        transport
            .deliver(Outbound::AcknowledgeButton {
                callback_id,
                toast: Some(toast.to_string()),
            })
            .await?;
        Ok(added)
    }

    async fn download(&self, transport: &dyn ChatTransport, chat_id: i64, url: &str) -> Result<()> {
        send_text(transport, chat_id, DefaultMusicView::download_started()).await?;

        let audio = match self.media.fetch_audio(url).await {
            Ok(audio) => audio,
            Err(e) => {
                let unavailable = matches!(e, MediaError::Unavailable(_) | MediaError::InvalidUrl(_));
                return send_text(transport, chat_id, DefaultMusicView::download_failed(unavailable))
                    .await;
            }
        };

        let delivered = transport
            .deliver(Outbound::SendAudio {
                chat_id,
                path: audio.path.clone(),
                title: audio.title.clone(),
            })
            .await;
        audio.cleanup().await;

        if let Err(e) = delivered {
            warn!(error = %e, "Audio upload failed");
            return send_text(transport, chat_id, DefaultMusicView::download_failed(false)).await;
        }
        Ok(())
    }
}

async fn send_text(
    transport: &dyn ChatTransport,
    chat_id: i64,
    body: impl Into<String>,
) -> Result<()> {
    transport
        .deliver(Outbound::SendText {
            chat_id,
            body: body.into(),
            keyboard: None,
        })
        .await
}

/// One "add" button per track; tracks whose payload would not fit are skipped.
fn add_keyboard(user_id: i64, tracks: &[Track]) -> InlineKeyboard {
    let rows = tracks
        .iter()
        .filter_map(|track| {
            let payload = ButtonPayload::AddToPlaylist {
                user_id,
                track_id: track.id.clone(),
            };
            match payload.encode() {
                Ok(payload) => Some(vec![InlineButton {
                    label: DefaultMusicView::add_button_label(track),
                    payload,
                }]),
                Err(e) => {
                    warn!(track_id = %track.id, error = %e, "Skipping add button");
                    None
                }
            }
        })
        .collect();
    InlineKeyboard { rows }
}
