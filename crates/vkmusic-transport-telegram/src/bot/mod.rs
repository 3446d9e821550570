/// Command parsing and conversion of Telegram updates into chat events
pub mod handlers;
/// Resilient messaging with automatic retry for Telegram API operations
pub mod resilient;
/// `ChatTransport` implementation over the Bot API
pub mod transport;
/// Unauthorized access flood protection
pub mod unauthorized_cache;

pub use transport::TelegramChatTransport;
pub use unauthorized_cache::UnauthorizedCache;
