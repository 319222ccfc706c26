use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use tau_presence::{supported_presence_action_keys, GlobalDefaults, PresenceAction};
use tau_presence_telegram::TelegramPresenceRuntimeConfig;

#[derive(Debug, Parser)]
#[command(
    name = "tau-presence-bot",
    about = "Keeps Telegram chats showing a typing indicator while conversations are active",
    version
)]
pub(crate) struct Cli {
    #[arg(
        long = "telegram-bot-token",
        env = "TAU_TELEGRAM_BOT_TOKEN",
        hide_env_values = true,
        help = "Bot API token issued by @BotFather"
    )]
    pub(crate) telegram_bot_token: String,

    #[arg(
        long = "telegram-api-base",
        env = "TAU_TELEGRAM_API_BASE",
        default_value = "https://api.telegram.org",
        help = "Base URL for the Telegram Bot API"
    )]
    pub(crate) telegram_api_base: String,

    #[arg(
        long = "presence-ttl-seconds",
        env = "TAU_PRESENCE_TTL_SECONDS",
        default_value_t = 30,
        help = "Seconds message-triggered presence stays alive after the last message (min 5)"
    )]
    pub(crate) presence_ttl_seconds: u64,

    #[arg(
        long = "presence-cadence-seconds",
        env = "TAU_PRESENCE_CADENCE_SECONDS",
        default_value_t = 4.0,
        help = "Seconds between presence signals (min 1)"
    )]
    pub(crate) presence_cadence_seconds: f64,

    #[arg(
        long = "presence-action",
        env = "TAU_PRESENCE_ACTION",
        default_value = "typing",
        help = "Default presence kind; unknown keys fall back to typing"
    )]
    pub(crate) presence_action: String,

    #[arg(
        long = "poll-timeout-seconds",
        env = "TAU_TELEGRAM_POLL_TIMEOUT_SECONDS",
        default_value_t = 25,
        help = "Long-poll timeout passed to getUpdates"
    )]
    pub(crate) poll_timeout_seconds: u64,

    #[arg(
        long = "request-timeout-ms",
        env = "TAU_TELEGRAM_REQUEST_TIMEOUT_MS",
        default_value_t = 35_000,
        help = "HTTP timeout for Bot API requests; keep above the poll timeout"
    )]
    pub(crate) request_timeout_ms: u64,

    #[arg(
        long = "retry-delay-ms",
        env = "TAU_TELEGRAM_RETRY_DELAY_MS",
        default_value_t = 3_000,
        help = "Delay before retrying a failed getUpdates call"
    )]
    pub(crate) retry_delay_ms: u64,

    #[arg(
        long = "owner-user-id",
        env = "TAU_PRESENCE_OWNER_USER_IDS",
        value_delimiter = ',',
        help = "Telegram user id(s) allowed to run /stopall and /setdefault. Empty means chat admins."
    )]
    pub(crate) owner_user_ids: Vec<i64>,
}

impl Cli {
    pub(crate) fn runtime_config(&self) -> Result<TelegramPresenceRuntimeConfig> {
        if self.telegram_bot_token.trim().is_empty() {
            bail!("--telegram-bot-token cannot be empty");
        }
        let defaults = GlobalDefaults::new(
            self.presence_ttl_seconds,
            self.presence_cadence_seconds,
            &self.presence_action,
        );
        if PresenceAction::from_key(&self.presence_action).is_none() {
            tracing::warn!(
                requested = %self.presence_action,
                supported = %supported_presence_action_keys().join(","),
                "unknown presence action, using typing"
            );
        }
        Ok(TelegramPresenceRuntimeConfig {
            api_base: self.telegram_api_base.clone(),
            bot_token: self.telegram_bot_token.clone(),
            request_timeout_ms: self.request_timeout_ms,
            poll_timeout_seconds: self.poll_timeout_seconds,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            defaults,
            owner_user_ids: self.owner_user_ids.clone(),
        })
    }
}
