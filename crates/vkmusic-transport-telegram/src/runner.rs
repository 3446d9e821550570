use crate::bot::handlers::{
    callback_event, command_event, get_user_id_safe, get_user_name, text_event, Command,
};
use crate::bot::{TelegramChatTransport, UnauthorizedCache};
use crate::config::{
    get_unauthorized_cache_max_size, get_unauthorized_cache_ttl, get_unauthorized_cooldown,
    BotSettings,
};
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use tracing::{debug, error, info};
use vkmusic_core::cache::InMemoryLookupCache;
use vkmusic_core::catalog::VkClient;
use vkmusic_core::chat::{looks_like_command, ChatService};
use vkmusic_core::config::SettingsError;
use vkmusic_core::media::YtDlpFetcher;
use vkmusic_core::playlist::InMemoryPlaylistStore;
use vkmusic_core::search::SearchService;

/// Run the Telegram transport runtime.
pub async fn run_bot(settings: Arc<BotSettings>) {
    let chat = match build_chat_service(&settings) {
        Ok(chat) => Arc::new(chat),
        Err(e) => {
            error!("Failed to initialize music services: {}", e);
            std::process::exit(1);
        }
    };

    let bot = Bot::new(settings.telegram.telegram_token.clone());
    let unauthorized_cache = init_unauthorized_cache();
    let handler = setup_handler();

    info!("Bot is running...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![chat, settings, unauthorized_cache])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

/// Wires the catalog client, stores and media fetcher into a chat service.
///
/// # Errors
///
/// Returns an error when the VK token is missing or the cache policy is invalid.
pub fn build_chat_service(settings: &BotSettings) -> Result<ChatService, SettingsError> {
    let music = settings.music.as_ref();

    let policy = music.eviction_policy()?;
    info!(
        "Initializing search cache (policy: {:?}, ttl: {:?})",
        policy,
        music.cache_ttl()
    );
    let cache = Arc::new(InMemoryLookupCache::new(music.cache_ttl(), policy));

    let catalog = Arc::new(VkClient::new(
        music.vk_api_base_url.clone(),
        music.vk_token()?,
        music.vk_http_timeout(),
    ));
    let search = Arc::new(SearchService::new(
        catalog,
        cache,
        music.vk_api_version.clone(),
        music.vk_http_timeout(),
    ));

    let media = Arc::new(YtDlpFetcher::new(
        music.ytdlp_binary.clone(),
        music.downloads_dir(),
        music.media_timeout(),
    ));

    Ok(ChatService::new(
        search,
        Arc::new(InMemoryPlaylistStore::new()),
        media,
    ))
}

fn init_unauthorized_cache() -> Arc<UnauthorizedCache> {
    let cooldown = get_unauthorized_cooldown();
    let ttl = get_unauthorized_cache_ttl();
    let max_size = get_unauthorized_cache_max_size();

    info!(
        "Initializing UnauthorizedCache (cooldown: {}s, ttl: {}s, max_size: {})",
        cooldown, ttl, max_size
    );

    Arc::new(UnauthorizedCache::new(cooldown, ttl, max_size))
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(
            Update::filter_callback_query()
                .filter(|q: CallbackQuery, settings: Arc<BotSettings>| {
                    settings.telegram.is_allowed(q.from.id.0.cast_signed())
                })
                .endpoint(handle_callback),
        )
        .branch(
            // Buttons pressed by users outside the allow-list
            Update::filter_callback_query().endpoint(handle_unauthorized_callback),
        )
        .branch(
            Update::filter_message().branch(
                dptree::filter(|msg: Message, settings: Arc<BotSettings>| {
                    settings.telegram.is_allowed(get_user_id_safe(&msg))
                })
                .branch(
                    dptree::entry()
                        .filter_command::<Command>()
                        .endpoint(handle_command),
                )
                .branch(
                    dptree::filter(|msg: Message| msg.text().is_some_and(looks_like_command))
                        .endpoint(handle_unknown_command),
                )
                .branch(
                    dptree::filter(|msg: Message| msg.text().is_some()).endpoint(handle_text),
                )
                .branch(dptree::endpoint(handle_unsupported)),
            ),
        )
        .branch(
            // Everyone not admitted above
            Update::filter_message().endpoint(handle_unauthorized),
        )
}

async fn handle_unauthorized(
    bot: Bot,
    msg: Message,
    cache: Arc<UnauthorizedCache>,
) -> Result<(), teloxide::RequestError> {
    let user_id = get_user_id_safe(&msg);

    if cache.should_notify(user_id).await {
        info!(
            "⛔️ Unauthorized access from user {} ({}). Sending denial message.",
            user_id,
            get_user_name(&msg)
        );

        if let Err(e) = bot.send_message(msg.chat.id, "⛔️ Доступ запрещён").await {
            error!("Failed to send access denied message to {}: {}", user_id, e);
        } else {
            cache.mark_notified(user_id).await;
        }
    }

    respond(())
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    chat: Arc<ChatService>,
) -> Result<(), teloxide::RequestError> {
    let transport = TelegramChatTransport::new(bot);
    if let Err(e) = chat.handle(command_event(&msg, cmd), &transport).await {
        error!("Command error: {}", e);
    }
    respond(())
}

async fn handle_text(
    bot: Bot,
    msg: Message,
    chat: Arc<ChatService>,
) -> Result<(), teloxide::RequestError> {
    let Some(event) = text_event(&msg) else {
        return respond(());
    };
    let transport = TelegramChatTransport::new(bot);
    if let Err(e) = chat.handle(event, &transport).await {
        error!("Text handler error: {}", e);
    }
    respond(())
}

async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    chat: Arc<ChatService>,
) -> Result<(), teloxide::RequestError> {
    let Some(event) = callback_event(&q) else {
        debug!("Ignoring callback query without data or message");
        let _ = bot.answer_callback_query(q.id.clone()).await;
        return respond(());
    };
    let transport = TelegramChatTransport::for_callback(bot, q);
    if let Err(e) = chat.handle(event, &transport).await {
        error!("Callback handler error: {}", e);
    }
    respond(())
}

async fn handle_unauthorized_callback(
    bot: Bot,
    q: CallbackQuery,
) -> Result<(), teloxide::RequestError> {
    debug!("Answering callback query from unauthorized user {}", q.from.id);
    if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
        error!("Failed to answer callback query from {}: {}", q.from.id, e);
    }
    respond(())
}

async fn handle_unknown_command(msg: Message) -> Result<(), teloxide::RequestError> {
    debug!(
        "Ignoring unknown or foreign command from user {}",
        get_user_id_safe(&msg)
    );
    respond(())
}

async fn handle_unsupported(msg: Message) -> Result<(), teloxide::RequestError> {
    debug!(
        "Ignoring non-text message from user {}",
        get_user_id_safe(&msg)
    );
    respond(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TelegramSettings;
    use vkmusic_core::config::MusicSettings;

    fn settings(music: MusicSettings) -> BotSettings {
        BotSettings::new(music, TelegramSettings::default())
    }

    #[test]
    fn test_build_requires_vk_token() {
        assert!(matches!(
            build_chat_service(&settings(MusicSettings::default())),
            Err(SettingsError::MissingVkToken)
        ));
    }

    #[test]
    fn test_build_rejects_unknown_eviction() {
        let music = MusicSettings {
            vk_service_token: Some("token".to_string()),
            cache_eviction: "random".to_string(),
            ..MusicSettings::default()
        };
        assert!(matches!(
            build_chat_service(&settings(music)),
            Err(SettingsError::UnknownEviction(_))
        ));
    }

    #[tokio::test]
    async fn test_callback_from_unlisted_user_is_answered() -> anyhow::Result<()> {
        use std::ops::ControlFlow;
        use wiremock::matchers::{method, path_regex};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex("(?i)/answercallbackquery$"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"ok": true, "result": true})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let music = MusicSettings {
            vk_service_token: Some("token".to_string()),
            ..MusicSettings::default()
        };
        let telegram = TelegramSettings {
            telegram_token: "123456:test".to_string(),
            allowed_users_str: Some("1".to_string()),
        };
        let settings = Arc::new(BotSettings::new(music, telegram));
        let chat = Arc::new(build_chat_service(&settings)?);
        let bot = Bot::new("123456:test").set_api_url(server.uri().parse()?);
        let update: Update = serde_json::from_str(&serde_json::json!({
            "update_id": 1,
            "callback_query": {
                "id": "cb-9",
                "from": {"id": 2, "is_bot": false, "first_name": "Eve"},
                "chat_instance": "ci",
                "data": "add:2:1_2"
            }
        }).to_string())?;

        let outcome = setup_handler()
            .dispatch(dptree::deps![
                bot,
                update,
                settings,
                chat,
                Arc::new(UnauthorizedCache::new(60, 60, 10))
            ])
            .await;

        assert!(matches!(outcome, ControlFlow::Break(Ok(()))));
        server.verify().await;
        Ok(())
    }

    #[test]
    fn test_build_with_defaults() {
        let music = MusicSettings {
            vk_service_key: Some("legacy".to_string()),
            ..MusicSettings::default()
        };
        assert!(build_chat_service(&settings(music)).is_ok());
    }
}
