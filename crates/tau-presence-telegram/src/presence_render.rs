//! Chat reply text for presence commands.

use tau_presence::{ConversationStatus, GlobalDefaults, PresenceStats};

pub fn render_status_reply(rows: &[ConversationStatus]) -> String {
    if rows.is_empty() {
        return "No active presence loops.".to_string();
    }
    let mut lines = vec![format!("Active presence loops: {}", rows.len())];
    for row in rows {
        let muted = if row.muted { " muted" } else { "" };
        lines.push(format!(
            "- {} {} {}{}",
            row.conversation_id,
            row.mode.as_str(),
            row.action_key,
            muted
        ));
    }
    lines.join("\n")
}

pub fn render_stats_reply(stats: &PresenceStats, defaults: &GlobalDefaults) -> String {
    let telemetry = &stats.telemetry;
    let mut lines = vec![
        format!("active_conversations={}", stats.active_conversations),
        format!(
            "signals emitted={} failed={}",
            telemetry.signals_emitted, telemetry.signals_failed
        ),
        format!(
            "loops started={} finished={}",
            telemetry.loops_started, telemetry.loops_finished
        ),
        format!(
            "defaults ttl={}s interval={}s action={}",
            defaults.ttl_seconds, defaults.cadence_seconds, defaults.action_key
        ),
    ];
    match &stats.conversation {
        Some(conversation) => {
            lines.push(format!(
                "this chat: mode={} interval={}s ttl={}s action={} autotrigger={}",
                conversation.mode.as_str(),
                conversation.cadence_seconds,
                conversation.ttl_seconds,
                conversation.action_key,
                if conversation.auto_trigger_on_message {
                    "on"
                } else {
                    "off"
                },
            ));
            lines.push(format!(
                "this chat: expires_in={}s muted_for={}s loop_running={}",
                conversation.expires_in_seconds,
                conversation.muted_for_seconds,
                conversation.loop_running
            ));
        }
        None => lines.push("this chat: idle".to_string()),
    }
    lines.join("\n")
}

pub fn render_defaults_reply(defaults: &GlobalDefaults) -> String {
    format!(
        "Defaults updated: ttl={}s interval={}s action={}",
        defaults.ttl_seconds, defaults.cadence_seconds, defaults.action_key
    )
}

#[cfg(test)]
mod tests {
    use super::{render_stats_reply, render_status_reply};
    use tau_presence::{
        ConversationId, ConversationSnapshot, ConversationStatus, GlobalDefaults, PresenceMode,
        PresenceStats, PresenceTelemetrySnapshot,
    };

    #[test]
    fn unit_status_reply_handles_empty_and_populated_tables() {
        assert_eq!(render_status_reply(&[]), "No active presence loops.");
        let rendered = render_status_reply(&[
            ConversationStatus {
                conversation_id: ConversationId(-100),
                mode: PresenceMode::Continuous,
                muted: true,
                action_key: "typing",
            },
            ConversationStatus {
                conversation_id: ConversationId(7),
                mode: PresenceMode::MessageTriggered,
                muted: false,
                action_key: "upload-photo",
            },
        ]);
        assert_eq!(
            rendered,
            "Active presence loops: 2\n- -100 continuous typing muted\n- 7 message_triggered upload-photo"
        );
    }

    #[test]
    fn unit_stats_reply_includes_counters_and_chat_settings() {
        let stats = PresenceStats {
            active_conversations: 1,
            telemetry: PresenceTelemetrySnapshot {
                signals_emitted: 12,
                signals_failed: 1,
                loops_started: 2,
                loops_finished: 1,
            },
            conversation: Some(ConversationSnapshot {
                conversation_id: ConversationId(5),
                mode: PresenceMode::MessageTriggered,
                cadence_seconds: 4.0,
                ttl_seconds: 30,
                action_key: "typing",
                auto_trigger_on_message: false,
                expires_in_seconds: 18,
                muted_for_seconds: 0,
                loop_running: true,
            }),
        };
        let rendered = render_stats_reply(&stats, &GlobalDefaults::default());
        assert!(rendered.contains("signals emitted=12 failed=1"));
        assert!(rendered.contains("defaults ttl=30s interval=4s action=typing"));
        assert!(rendered.contains("autotrigger=off"));
        assert!(rendered.contains("expires_in=18s"));

        let idle = PresenceStats {
            conversation: None,
            ..stats
        };
        assert!(render_stats_reply(&idle, &GlobalDefaults::default()).ends_with("this chat: idle"));
    }
}
