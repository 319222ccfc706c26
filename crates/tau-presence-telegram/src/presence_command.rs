//! Presence bot command parsing and usage text.

use tau_presence::{supported_presence_action_keys, GlobalDefaultKind};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Enumerates supported presence bot commands.
pub enum PresenceCommand {
    Help,
    TypingOn,
    TypingOff,
    TypingAuto,
    Ttl { raw: String },
    Interval { raw: String },
    Action { key: String },
    AutoTrigger { enabled: bool },
    Mute { raw: Option<String> },
    Unmute,
    Status,
    Stats,
    StopAll,
    SetDefault { kind: GlobalDefaultKind, raw: String },
    Invalid { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Authorization level a command requires.
pub enum CommandAccess {
    Public,
    ChatAdmin,
    Owner,
}

impl PresenceCommand {
    pub fn access(&self) -> CommandAccess {
        match self {
            Self::Help | Self::Status | Self::Stats | Self::Invalid { .. } => CommandAccess::Public,
            Self::StopAll | Self::SetDefault { .. } => CommandAccess::Owner,
            Self::TypingOn
            | Self::TypingOff
            | Self::TypingAuto
            | Self::Ttl { .. }
            | Self::Interval { .. }
            | Self::Action { .. }
            | Self::AutoTrigger { .. }
            | Self::Mute { .. }
            | Self::Unmute => CommandAccess::ChatAdmin,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::TypingOn => "typing_on",
            Self::TypingOff => "typing_off",
            Self::TypingAuto => "typing_auto",
            Self::Ttl { .. } => "ttl",
            Self::Interval { .. } => "interval",
            Self::Action { .. } => "action",
            Self::AutoTrigger { .. } => "autotrigger",
            Self::Mute { .. } => "mute",
            Self::Unmute => "unmute",
            Self::Status => "status",
            Self::Stats => "stats",
            Self::StopAll => "stopall",
            Self::SetDefault { .. } => "setdefault",
            Self::Invalid { .. } => "invalid",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Classification of an inbound message's text.
pub enum ParsedInput {
    /// Ordinary chat traffic.
    Message,
    /// A slash command addressed to a different bot.
    ForeignCommand,
    Command(PresenceCommand),
}

pub fn presence_command_usage() -> String {
    [
        "Presence commands:".to_string(),
        "/typing_on - keep typing continuously".to_string(),
        "/typing_off - stop typing in this chat".to_string(),
        "/typing_auto - type only after messages (TTL based)".to_string(),
        "/ttl <seconds> - message-triggered lifetime (min 5)".to_string(),
        "/interval <seconds> - signal cadence (min 1)".to_string(),
        "/action <key> - presence kind".to_string(),
        "/autotrigger <on|off> - react to incoming messages".to_string(),
        "/mute [minutes] - pause signals (default 1)".to_string(),
        "/unmute - resume signals".to_string(),
        "/status - list active chats".to_string(),
        "/stats - counters and this chat's settings".to_string(),
        "/stopall - stop every chat (owner)".to_string(),
        "/setdefault <ttl|interval|action> <value> - change defaults (owner)".to_string(),
        format!("Actions: {}", supported_presence_action_keys().join(", ")),
    ]
    .join("\n")
}

fn parse_toggle(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Some(true),
        "off" | "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

fn invalid(usage: &str) -> PresenceCommand {
    PresenceCommand::Invalid {
        message: format!("Usage: {usage}"),
    }
}

fn no_args(remainder: &str, command: PresenceCommand, usage: &str) -> PresenceCommand {
    if remainder.is_empty() {
        command
    } else {
        invalid(usage)
    }
}

/// Parses message text. `bot_username` filters `/command@otherbot` mentions.
pub fn parse_presence_input(text: &str, bot_username: Option<&str>) -> ParsedInput {
    let trimmed = text.trim();
    if !trimmed.starts_with('/') {
        return ParsedInput::Message;
    }

    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let head = parts.next().unwrap_or_default();
    let remainder = parts.next().unwrap_or_default().trim();
    let (command, mention) = match head[1..].split_once('@') {
        Some((command, mention)) => (command, Some(mention)),
        None => (&head[1..], None),
    };
    if let (Some(mention), Some(bot_username)) = (mention, bot_username) {
        if !mention.eq_ignore_ascii_case(bot_username.trim_start_matches('@')) {
            return ParsedInput::ForeignCommand;
        }
    }

    let mut args = remainder.split_whitespace();
    let first_arg = args.next();
    let extra_arg = args.next();
    let parsed = match command.to_ascii_lowercase().as_str() {
        "start" | "help" => PresenceCommand::Help,
        "typing_on" => no_args(remainder, PresenceCommand::TypingOn, "/typing_on"),
        "typing_off" => no_args(remainder, PresenceCommand::TypingOff, "/typing_off"),
        "typing_auto" => no_args(remainder, PresenceCommand::TypingAuto, "/typing_auto"),
        "unmute" => no_args(remainder, PresenceCommand::Unmute, "/unmute"),
        "status" => no_args(remainder, PresenceCommand::Status, "/status"),
        "stats" => no_args(remainder, PresenceCommand::Stats, "/stats"),
        "stopall" => no_args(remainder, PresenceCommand::StopAll, "/stopall"),
        "ttl" => match (first_arg, extra_arg) {
            (Some(raw), None) => PresenceCommand::Ttl {
                raw: raw.to_string(),
            },
            _ => invalid("/ttl <seconds>"),
        },
        "interval" => match (first_arg, extra_arg) {
            (Some(raw), None) => PresenceCommand::Interval {
                raw: raw.to_string(),
            },
            _ => invalid("/interval <seconds>"),
        },
        "action" => match (first_arg, extra_arg) {
            (Some(key), None) => PresenceCommand::Action {
                key: key.to_string(),
            },
            _ => PresenceCommand::Invalid {
                message: format!(
                    "Usage: /action <key>\nActions: {}",
                    supported_presence_action_keys().join(", ")
                ),
            },
        },
        "autotrigger" => match (first_arg.and_then(parse_toggle), extra_arg) {
            (Some(enabled), None) => PresenceCommand::AutoTrigger { enabled },
            _ => invalid("/autotrigger <on|off>"),
        },
        "mute" => match (first_arg, extra_arg) {
            (raw, None) => PresenceCommand::Mute {
                raw: raw.map(str::to_string),
            },
            _ => invalid("/mute [minutes]"),
        },
        "setdefault" => {
            let third_arg = args.next();
            match (
                first_arg.and_then(GlobalDefaultKind::parse),
                extra_arg,
                third_arg,
            ) {
                (Some(kind), Some(raw), None) => PresenceCommand::SetDefault {
                    kind,
                    raw: raw.to_string(),
                },
                _ => invalid("/setdefault <ttl|interval|action> <value>"),
            }
        }
        _ => PresenceCommand::Invalid {
            message: format!(
                "Unknown command `/{command}`.\n\n{}",
                presence_command_usage()
            ),
        },
    };
    ParsedInput::Command(parsed)
}

#[cfg(test)]
mod tests {
    use super::{parse_presence_input, CommandAccess, ParsedInput, PresenceCommand};
    use tau_presence::GlobalDefaultKind;

    fn command(text: &str) -> PresenceCommand {
        match parse_presence_input(text, Some("tau_presence_bot")) {
            ParsedInput::Command(command) => command,
            other => panic!("expected command for {text:?}, got {other:?}"),
        }
    }

    #[test]
    fn unit_plain_text_is_a_message() {
        assert_eq!(
            parse_presence_input("hello there", None),
            ParsedInput::Message
        );
        assert_eq!(parse_presence_input("  ", None), ParsedInput::Message);
    }

    #[test]
    fn unit_parses_original_command_set() {
        assert_eq!(command("/start"), PresenceCommand::Help);
        assert_eq!(command("/typing_on"), PresenceCommand::TypingOn);
        assert_eq!(command("/typing_off"), PresenceCommand::TypingOff);
        assert_eq!(command("/stopall"), PresenceCommand::StopAll);
        assert_eq!(command("/status"), PresenceCommand::Status);
    }

    #[test]
    fn unit_parses_configuration_commands_with_arguments() {
        assert_eq!(
            command("/ttl 45"),
            PresenceCommand::Ttl {
                raw: "45".to_string()
            }
        );
        assert_eq!(
            command("/interval 2.5"),
            PresenceCommand::Interval {
                raw: "2.5".to_string()
            }
        );
        assert_eq!(
            command("/action upload-photo"),
            PresenceCommand::Action {
                key: "upload-photo".to_string()
            }
        );
        assert_eq!(
            command("/autotrigger OFF"),
            PresenceCommand::AutoTrigger { enabled: false }
        );
        assert_eq!(command("/mute"), PresenceCommand::Mute { raw: None });
        assert_eq!(
            command("/mute 15"),
            PresenceCommand::Mute {
                raw: Some("15".to_string())
            }
        );
        assert_eq!(
            command("/setdefault interval 6"),
            PresenceCommand::SetDefault {
                kind: GlobalDefaultKind::Cadence,
                raw: "6".to_string()
            }
        );
    }

    #[test]
    fn functional_bot_mentions_are_matched_case_insensitively() {
        assert_eq!(command("/typing_on@Tau_Presence_Bot"), PresenceCommand::TypingOn);
        assert_eq!(
            parse_presence_input("/typing_on@other_bot", Some("tau_presence_bot")),
            ParsedInput::ForeignCommand
        );
        assert_eq!(
            parse_presence_input("/typing_on@other_bot", None),
            ParsedInput::Command(PresenceCommand::TypingOn)
        );
    }

    #[test]
    fn regression_bad_arguments_produce_usage_messages() {
        for text in [
            "/ttl",
            "/ttl 1 2",
            "/autotrigger maybe",
            "/setdefault volume 3",
            "/setdefault ttl",
            "/status now",
        ] {
            match command(text) {
                PresenceCommand::Invalid { message } => assert!(message.starts_with("Usage:")),
                other => panic!("expected usage for {text:?}, got {other:?}"),
            }
        }
        match command("/dance") {
            PresenceCommand::Invalid { message } => {
                assert!(message.contains("Unknown command `/dance`"));
                assert!(message.contains("/typing_on"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unit_access_levels_follow_command_scope() {
        assert_eq!(command("/status").access(), CommandAccess::Public);
        assert_eq!(command("/mute 3").access(), CommandAccess::ChatAdmin);
        assert_eq!(command("/stopall").access(), CommandAccess::Owner);
        assert_eq!(
            command("/setdefault ttl 60").access(),
            CommandAccess::Owner
        );
    }
}
