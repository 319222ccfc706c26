//! Telegram front end for the Tau presence scheduler.
//!
//! Polls the Bot API for messages, routes chat commands through
//! [`PresenceDispatcher`], and emits `sendChatAction` signals on behalf of
//! each conversation's presence loop.

pub mod presence_command;
pub mod presence_dispatch;
mod presence_render;
pub mod telegram_api_client;
mod telegram_runtime;

pub use presence_command::{
    parse_presence_input, presence_command_usage, CommandAccess, ParsedInput, PresenceCommand,
};
pub use presence_dispatch::{
    ChatRoleLookup, DispatchOutcome, PresenceDispatcher, PresenceDispatcherConfig,
};
pub use telegram_api_client::{
    ChatMemberRole, TelegramApiClient, TelegramApiError, TelegramChat, TelegramMessage,
    TelegramUpdate, TelegramUser,
};
pub use telegram_runtime::{run_telegram_presence_bot, TelegramPresenceRuntimeConfig};
