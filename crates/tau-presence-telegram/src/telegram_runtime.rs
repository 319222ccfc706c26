//! Long-polling Telegram runtime that feeds the presence dispatcher.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tau_presence::{GlobalDefaults, PresenceScheduler};
use tracing::{debug, info, warn};

use crate::presence_dispatch::{DispatchOutcome, PresenceDispatcher, PresenceDispatcherConfig};
use crate::telegram_api_client::{TelegramApiClient, TelegramApiError, TelegramUpdate};

#[derive(Debug, Clone)]
/// Runtime configuration for the Telegram presence bot.
pub struct TelegramPresenceRuntimeConfig {
    pub api_base: String,
    pub bot_token: String,
    pub request_timeout_ms: u64,
    pub poll_timeout_seconds: u64,
    pub retry_delay: Duration,
    pub defaults: GlobalDefaults,
    pub owner_user_ids: Vec<i64>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct PollCycleReport {
    pub discovered_updates: usize,
    pub messages: usize,
    pub commands: usize,
    pub denied_commands: usize,
    pub ignored_updates: usize,
    pub failed_replies: usize,
}

impl PollCycleReport {
    fn is_empty(&self) -> bool {
        self.discovered_updates == 0 && self.failed_replies == 0
    }
}

/// Runs the Telegram presence bot until ctrl-c, then stops every presence loop.
pub async fn run_telegram_presence_bot(config: TelegramPresenceRuntimeConfig) -> Result<()> {
    let mut runtime = TelegramPresenceRuntime::new(config).await?;
    runtime.run().await
}

struct TelegramPresenceRuntime {
    config: TelegramPresenceRuntimeConfig,
    client: Arc<TelegramApiClient>,
    dispatcher: PresenceDispatcher,
    next_offset: Option<i64>,
}

impl TelegramPresenceRuntime {
    async fn new(config: TelegramPresenceRuntimeConfig) -> Result<Self> {
        let client = Arc::new(TelegramApiClient::new(
            &config.api_base,
            &config.bot_token,
            config.request_timeout_ms,
        )?);
        if config.request_timeout_ms <= config.poll_timeout_seconds.saturating_mul(1_000) {
            warn!(
                request_timeout_ms = config.request_timeout_ms,
                poll_timeout_seconds = config.poll_timeout_seconds,
                "request timeout does not exceed the long-poll timeout; polls may time out"
            );
        }

        let me = client
            .get_me()
            .await
            .context("failed to resolve telegram bot identity")?;
        let scheduler = Arc::new(PresenceScheduler::new(client.clone(), config.defaults)?);
        let dispatcher = PresenceDispatcher::new(
            scheduler,
            client.clone(),
            PresenceDispatcherConfig {
                bot_username: me.username.clone(),
                owner_user_ids: config.owner_user_ids.clone(),
            },
        );
        info!(
            bot_id = me.id,
            bot_username = me.username.as_deref().unwrap_or("unknown"),
            owners = config.owner_user_ids.len(),
            "telegram presence bot connected"
        );

        Ok(Self {
            config,
            client,
            dispatcher,
            next_offset: None,
        })
    }

    async fn run(&mut self) -> Result<()> {
        loop {
            let fetched = tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("telegram presence bot shutdown requested");
                    break;
                }
                result = self.fetch_updates() => result,
            };

            match fetched {
                Ok(updates) => {
                    let report = self.process_updates(updates).await;
                    if !report.is_empty() {
                        debug!(
                            discovered = report.discovered_updates,
                            messages = report.messages,
                            commands = report.commands,
                            denied = report.denied_commands,
                            ignored = report.ignored_updates,
                            failed_replies = report.failed_replies,
                            "telegram poll cycle"
                        );
                    }
                }
                Err(error) => {
                    warn!(error = %error, "telegram getUpdates failed");
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {
                            info!("telegram presence bot shutdown requested");
                            break;
                        }
                        _ = tokio::time::sleep(self.config.retry_delay) => {}
                    }
                }
            }
        }

        let stopped = self.dispatcher.scheduler().stop_all().await;
        info!(stopped, "telegram presence bot stopped");
        Ok(())
    }

    async fn fetch_updates(&self) -> Result<Vec<TelegramUpdate>, TelegramApiError> {
        self.client
            .get_updates(self.next_offset, self.config.poll_timeout_seconds)
            .await
    }

    async fn process_updates(&mut self, updates: Vec<TelegramUpdate>) -> PollCycleReport {
        let mut report = PollCycleReport {
            discovered_updates: updates.len(),
            ..PollCycleReport::default()
        };
        for update in updates {
            let next = update.update_id.saturating_add(1);
            self.next_offset = Some(self.next_offset.map_or(next, |current| current.max(next)));

            let Some(message) = update.message else {
                report.ignored_updates += 1;
                continue;
            };
            let outcome = self.dispatcher.dispatch_message(&message).await;
            match &outcome {
                DispatchOutcome::Ignored => report.ignored_updates += 1,
                DispatchOutcome::Message { .. } => report.messages += 1,
                DispatchOutcome::Replied { .. } => report.commands += 1,
                DispatchOutcome::Denied { .. } => report.denied_commands += 1,
            }
            if let Some(reply) = outcome.reply() {
                if let Err(error) = self.client.send_message(message.chat.id, reply).await {
                    report.failed_replies += 1;
                    warn!(
                        chat_id = message.chat.id,
                        error = %error,
                        "failed to send presence command reply"
                    );
                }
            }
        }
        report
    }
}
