//! Routes inbound Telegram messages to the presence scheduler.

use std::sync::Arc;

use async_trait::async_trait;
use tau_presence::{ConversationId, PresenceScheduler};
use tracing::{debug, info, warn};

use crate::presence_command::{
    parse_presence_input, presence_command_usage, CommandAccess, ParsedInput, PresenceCommand,
};
use crate::presence_render::{render_defaults_reply, render_stats_reply, render_status_reply};
use crate::telegram_api_client::{ChatMemberRole, TelegramMessage};

const DEFAULT_MUTE_MINUTES: u64 = 1;

#[async_trait]
/// Resolves a user's role inside a chat for command authorization.
pub trait ChatRoleLookup: Send + Sync {
    async fn chat_member_role(&self, chat_id: i64, user_id: i64) -> anyhow::Result<ChatMemberRole>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresenceDispatcherConfig {
    /// Own username, used to ignore `/command@otherbot`.
    pub bot_username: Option<String>,
    /// Users allowed to run process-wide commands. Empty falls back to chat privileges.
    pub owner_user_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Result of dispatching one inbound message.
pub enum DispatchOutcome {
    Ignored,
    Message { refreshed: bool },
    Replied { command: &'static str, text: String },
    Denied { command: &'static str, text: String },
}

impl DispatchOutcome {
    pub fn reply(&self) -> Option<&str> {
        match self {
            Self::Replied { text, .. } | Self::Denied { text, .. } => Some(text.as_str()),
            Self::Ignored | Self::Message { .. } => None,
        }
    }
}

pub struct PresenceDispatcher {
    scheduler: Arc<PresenceScheduler>,
    roles: Arc<dyn ChatRoleLookup>,
    config: PresenceDispatcherConfig,
}

impl PresenceDispatcher {
    pub fn new(
        scheduler: Arc<PresenceScheduler>,
        roles: Arc<dyn ChatRoleLookup>,
        config: PresenceDispatcherConfig,
    ) -> Self {
        Self {
            scheduler,
            roles,
            config,
        }
    }

    pub fn scheduler(&self) -> &Arc<PresenceScheduler> {
        &self.scheduler
    }

    pub async fn dispatch_message(&self, message: &TelegramMessage) -> DispatchOutcome {
        if message.from.as_ref().is_some_and(|user| user.is_bot) {
            return DispatchOutcome::Ignored;
        }
        let conversation_id = ConversationId(message.chat.id);
        let text = message.text.as_deref().unwrap_or_default();
        let command = match parse_presence_input(text, self.config.bot_username.as_deref()) {
            ParsedInput::Message => {
                let refreshed = self.scheduler.on_message(conversation_id);
                return DispatchOutcome::Message { refreshed };
            }
            ParsedInput::ForeignCommand => return DispatchOutcome::Ignored,
            ParsedInput::Command(command) => command,
        };

        let name = command.name();
        let allowed = match command.access() {
            CommandAccess::Public => true,
            CommandAccess::ChatAdmin => self.is_chat_privileged(message).await,
            CommandAccess::Owner => self.is_owner(message).await,
        };
        if !allowed {
            debug!(
                conversation_id = %conversation_id,
                command = name,
                "presence command denied"
            );
            let text = match command.access() {
                CommandAccess::Owner => format!("Only the bot owner can use /{name}."),
                _ => format!("Only chat administrators can use /{name}."),
            };
            return DispatchOutcome::Denied {
                command: name,
                text,
            };
        }

        let text = self.execute(conversation_id, command).await;
        info!(
            conversation_id = %conversation_id,
            command = name,
            "presence command handled"
        );
        DispatchOutcome::Replied {
            command: name,
            text,
        }
    }

    async fn is_chat_privileged(&self, message: &TelegramMessage) -> bool {
        if message.chat.kind == "private" {
            return true;
        }
        let Some(user) = message.from.as_ref() else {
            return false;
        };
        match self.roles.chat_member_role(message.chat.id, user.id).await {
            Ok(role) => role.is_privileged(),
            Err(error) => {
                warn!(
                    chat_id = message.chat.id,
                    user_id = user.id,
                    error = %error,
                    "chat role lookup failed"
                );
                false
            }
        }
    }

    async fn is_owner(&self, message: &TelegramMessage) -> bool {
        if self.config.owner_user_ids.is_empty() {
            return self.is_chat_privileged(message).await;
        }
        message
            .from
            .as_ref()
            .is_some_and(|user| self.config.owner_user_ids.contains(&user.id))
    }

    async fn execute(&self, id: ConversationId, command: PresenceCommand) -> String {
        let scheduler = &self.scheduler;
        match command {
            PresenceCommand::Help => presence_command_usage(),
            PresenceCommand::TypingOn => {
                scheduler.set_continuous(id);
                "Continuous typing enabled. Use /typing_off to stop.".to_string()
            }
            PresenceCommand::TypingOff => {
                if scheduler.stop_one(id).await {
                    "Typing stopped.".to_string()
                } else {
                    "Typing was not active.".to_string()
                }
            }
            PresenceCommand::TypingAuto => {
                if scheduler.set_message_triggered(id) {
                    "Typing now follows incoming messages.".to_string()
                } else {
                    "Typing is idle; it starts with the next message.".to_string()
                }
            }
            PresenceCommand::Ttl { raw } => {
                let seconds = parse_whole_number(&raw)
                    .unwrap_or_else(|| scheduler.defaults().ttl_seconds);
                let applied = scheduler.set_ttl(id, seconds);
                format!("TTL set to {applied}s.")
            }
            PresenceCommand::Interval { raw } => {
                let seconds = raw
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|value| value.is_finite())
                    .unwrap_or_else(|| scheduler.defaults().cadence_seconds);
                let applied = scheduler.set_cadence(id, seconds);
                format!("Interval set to {applied}s.")
            }
            PresenceCommand::Action { key } => {
                let applied = scheduler.set_action(id, &key);
                format!("Action set to {applied}.")
            }
            PresenceCommand::AutoTrigger { enabled } => {
                scheduler.set_auto_trigger(id, enabled);
                format!(
                    "Message auto-trigger {}.",
                    if enabled { "enabled" } else { "disabled" }
                )
            }
            PresenceCommand::Mute { raw } => {
                let minutes = raw
                    .as_deref()
                    .and_then(parse_whole_number)
                    .unwrap_or(DEFAULT_MUTE_MINUTES);
                let applied = scheduler.set_mute(id, minutes);
                format!("Muted for {applied} minute(s).")
            }
            PresenceCommand::Unmute => {
                scheduler.clear_mute(id);
                "Unmuted.".to_string()
            }
            PresenceCommand::Status => render_status_reply(&scheduler.status()),
            PresenceCommand::Stats => {
                render_stats_reply(&scheduler.stats(id), &scheduler.defaults())
            }
            PresenceCommand::StopAll => {
                let stopped = scheduler.stop_all().await;
                format!("Stopped {stopped} presence loop(s).")
            }
            PresenceCommand::SetDefault { kind, raw } => {
                render_defaults_reply(&scheduler.set_global_default(kind, &raw))
            }
            PresenceCommand::Invalid { message } => message,
        }
    }
}

/// Parses a whole number; negative values become zero so clamping applies.
fn parse_whole_number(raw: &str) -> Option<u64> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .map(|value| u64::try_from(value).unwrap_or(0))
}
