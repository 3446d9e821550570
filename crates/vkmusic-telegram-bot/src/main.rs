use dotenvy::dotenv;
use regex::Regex;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{prelude::*, EnvFilter};
use vkmusic_core::config::MusicSettings;
use vkmusic_transport_telegram::config::{BotSettings, TelegramSettings};
use vkmusic_transport_telegram::runner::run_bot;

/// Regex patterns for redacting credentials from log output
struct RedactionPatterns {
    bot_url: Regex,
    bot_token: Regex,
    vk_query: Regex,
    vk_env: Regex,
}

impl RedactionPatterns {
    /// Compile all patterns.
    ///
    /// # Errors
    ///
    /// Returns an error if any regex pattern is invalid
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            bot_url: Regex::new(r"(https?://[^/]+/bot)([0-9]+:[A-Za-z0-9_-]+)")?,
            bot_token: Regex::new(r"\b[0-9]{8,10}:[A-Za-z0-9_-]{35}\b")?,
            vk_query: Regex::new(r"(access_token=)[^\s&]+")?,
            vk_env: Regex::new(r"(VK_SERVICE_(?:TOKEN|KEY)=)[^\s&]+")?,
        })
    }

    fn redact(&self, input: &str) -> String {
        let output = self.bot_url.replace_all(input, "$1[TELEGRAM_TOKEN]");
        let output = self.bot_token.replace_all(&output, "[TELEGRAM_TOKEN]");
        let output = self.vk_query.replace_all(&output, "$1[MASKED]");
        let output = self.vk_env.replace_all(&output, "$1[MASKED]");
        output.into_owned()
    }
}

struct RedactingWriter<W: Write> {
    inner: W,
    patterns: Arc<RedactionPatterns>,
}

impl<W: Write> RedactingWriter<W> {
    const fn new(inner: W, patterns: Arc<RedactionPatterns>) -> Self {
        Self { inner, patterns }
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        let redacted = self.patterns.redact(&s);
        self.inner.write_all(redacted.as_bytes())?;
        // Callers track progress against the unredacted buffer
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct RedactingMakeWriter<F> {
    make_inner: F,
    patterns: Arc<RedactionPatterns>,
}

impl<F> RedactingMakeWriter<F> {
    const fn new(make_inner: F, patterns: Arc<RedactionPatterns>) -> Self {
        Self {
            make_inner,
            patterns,
        }
    }
}

impl<'a, F, W> tracing_subscriber::fmt::MakeWriter<'a> for RedactingMakeWriter<F>
where
    F: Fn() -> W + 'static,
    W: Write,
{
    type Writer = RedactingWriter<W>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter::new((self.make_inner)(), self.patterns.clone())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    // Patterns must exist before the first log line
    let patterns = Arc::new(RedactionPatterns::new().map_err(|e| {
        eprintln!("Failed to compile regex patterns: {e}");
        e
    })?);

    init_logging(patterns);

    info!("Starting VK music bot...");

    let settings = init_settings();

    run_bot(settings).await;

    Ok(())
}

fn init_logging(patterns: Arc<RedactionPatterns>) {
    let make_writer = RedactingMakeWriter::new(io::stderr, patterns);

    let debug_mode = std::env::var("DEBUG_MODE")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false);

    let filter = if debug_mode {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(
                "vkmusic_core=info,vkmusic_transport_telegram=info,vkmusic_telegram_bot=info,teloxide=warn,hyper=warn,h2=error,reqwest=warn,tokio=warn",
            )
        })
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer))
        .init();
}

fn init_settings() -> Arc<BotSettings> {
    let music_settings = match MusicSettings::new() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load music configuration: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = music_settings.vk_token() {
        error!("Invalid music configuration: {}", e);
        std::process::exit(1);
    }

    let telegram_settings = match TelegramSettings::new() {
        Ok(settings) if !settings.telegram_token.trim().is_empty() => settings,
        Ok(_) => {
            error!("TELEGRAM_TOKEN is missing");
            std::process::exit(1);
        }
        Err(e) => {
            error!("Failed to load telegram configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!("Configuration loaded successfully.");
    Arc::new(BotSettings::new(music_settings, telegram_settings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacts_credentials() -> Result<(), regex::Error> {
        let patterns = RedactionPatterns::new()?;

        let line = "GET https://api.telegram.org/bot123456789:AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsawq/sendMessage failed";
        let redacted = patterns.redact(line);
        assert!(!redacted.contains("AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsawq"));
        assert!(redacted.contains("/bot[TELEGRAM_TOKEN]/sendMessage"));

        let line = "url=https://api.vk.com/method/audio.search?q=adele&access_token=vk1.a.secret&v=5.131";
        assert_eq!(
            patterns.redact(line),
            "url=https://api.vk.com/method/audio.search?q=adele&access_token=[MASKED]&v=5.131"
        );

        assert_eq!(
            patterns.redact("VK_SERVICE_KEY=abc123 loaded"),
            "VK_SERVICE_KEY=[MASKED] loaded"
        );
        Ok(())
    }

    #[test]
    fn test_writer_reports_input_length() -> io::Result<()> {
        let patterns = Arc::new(
            RedactionPatterns::new().map_err(|e| io::Error::other(e.to_string()))?,
        );
        let mut writer = RedactingWriter::new(Vec::new(), patterns);

        let input = b"access_token=abcdef";
        assert_eq!(writer.write(input)?, input.len());
        assert_eq!(writer.inner, b"access_token=[MASKED]");
        Ok(())
    }
}
