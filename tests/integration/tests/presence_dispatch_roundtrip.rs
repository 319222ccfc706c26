use std::{collections::VecDeque, sync::Arc, time::Duration};

use async_trait::async_trait;
use tau_presence::{
    ConversationId, GlobalDefaults, PresenceAction, PresenceMode, PresenceScheduler,
    PresenceTransport, PresenceTransportError,
};
use tau_presence_telegram::{
    ChatMemberRole, ChatRoleLookup, DispatchOutcome, PresenceDispatcher,
    PresenceDispatcherConfig, TelegramChat, TelegramMessage, TelegramUser,
};
use tokio::sync::Mutex as AsyncMutex;

const GROUP_ID: i64 = -1_002_003;
const ADMIN_ID: i64 = 501;
const MEMBER_ID: i64 = 502;
const OWNER_ID: i64 = 900;

/// Replays scripted send outcomes, then succeeds once the script runs out.
struct ScriptedTransport {
    outcomes: AsyncMutex<VecDeque<Result<(), PresenceTransportError>>>,
    sent: AsyncMutex<Vec<(ConversationId, PresenceAction)>>,
}

impl ScriptedTransport {
    fn new(outcomes: Vec<Result<(), PresenceTransportError>>) -> Self {
        Self {
            outcomes: AsyncMutex::new(VecDeque::from(outcomes)),
            sent: AsyncMutex::new(Vec::new()),
        }
    }

    async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    async fn last_action(&self) -> Option<PresenceAction> {
        self.sent.lock().await.last().map(|(_, action)| *action)
    }
}

#[async_trait]
impl PresenceTransport for ScriptedTransport {
    async fn send_presence(
        &self,
        conversation_id: ConversationId,
        action: PresenceAction,
    ) -> Result<(), PresenceTransportError> {
        self.sent.lock().await.push((conversation_id, action));
        self.outcomes.lock().await.pop_front().unwrap_or(Ok(()))
    }
}

struct GroupRoles;

#[async_trait]
impl ChatRoleLookup for GroupRoles {
    async fn chat_member_role(&self, chat_id: i64, user_id: i64) -> anyhow::Result<ChatMemberRole> {
        match (chat_id, user_id) {
            (GROUP_ID, ADMIN_ID) => Ok(ChatMemberRole::Creator),
            (GROUP_ID, MEMBER_ID) => Ok(ChatMemberRole::Member),
            _ => anyhow::bail!("user {user_id} is not part of chat {chat_id}"),
        }
    }
}

fn harness(
    transport: Arc<ScriptedTransport>,
    owner_user_ids: Vec<i64>,
) -> PresenceDispatcher {
    let scheduler = Arc::new(
        PresenceScheduler::new(transport, GlobalDefaults::default())
            .expect("scheduler should start inside the test runtime"),
    );
    PresenceDispatcher::new(
        scheduler,
        Arc::new(GroupRoles),
        PresenceDispatcherConfig {
            bot_username: Some("tau_presence_bot".to_string()),
            owner_user_ids,
        },
    )
}

fn message(chat_id: i64, chat_kind: &str, user_id: i64, text: &str) -> TelegramMessage {
    TelegramMessage {
        message_id: 1,
        chat: TelegramChat {
            id: chat_id,
            kind: chat_kind.to_string(),
        },
        from: Some(TelegramUser {
            id: user_id,
            is_bot: false,
            username: None,
        }),
        text: Some(text.to_string()),
    }
}

async fn in_group(dispatcher: &PresenceDispatcher, user_id: i64, text: &str) -> DispatchOutcome {
    dispatcher
        .dispatch_message(&message(GROUP_ID, "supergroup", user_id, text))
        .await
}

#[tokio::test(start_paused = true)]
async fn integration_group_chat_walks_through_every_presence_mode() {
    let transport = Arc::new(ScriptedTransport::new(Vec::new()));
    let dispatcher = harness(transport.clone(), Vec::new());
    let scheduler = dispatcher.scheduler().clone();
    let group = ConversationId(GROUP_ID);

    let denied = in_group(&dispatcher, MEMBER_ID, "/typing_on").await;
    assert!(matches!(denied, DispatchOutcome::Denied { .. }));
    assert!(!scheduler.is_active(group));

    in_group(&dispatcher, ADMIN_ID, "/typing_on").await;
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(transport.sent_count().await, 3);

    in_group(&dispatcher, ADMIN_ID, "/action upload_document").await;
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(transport.sent_count().await, 4);
    assert_eq!(
        transport.last_action().await,
        Some(PresenceAction::UploadDocument)
    );

    let muted = in_group(&dispatcher, ADMIN_ID, "/mute").await;
    assert_eq!(muted.reply(), Some("Muted for 1 minute(s)."));
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(transport.sent_count().await, 4);
    assert!(scheduler.is_active(group));

    in_group(&dispatcher, ADMIN_ID, "/unmute").await;
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(transport.sent_count().await, 5);

    let auto = in_group(&dispatcher, ADMIN_ID, "/typing_auto").await;
    assert_eq!(auto.reply(), Some("Typing now follows incoming messages."));
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(!scheduler.is_active(group));
    assert_eq!(transport.sent_count().await, 5);

    let refreshed = in_group(&dispatcher, MEMBER_ID, "anyone around?").await;
    assert_eq!(refreshed, DispatchOutcome::Message { refreshed: true });
    let conversation = scheduler
        .stats(group)
        .conversation
        .expect("fresh conversation after message");
    assert_eq!(conversation.mode, PresenceMode::MessageTriggered);
    assert_eq!(conversation.action_key, "typing");

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert!(!scheduler.is_active(group));
    assert_eq!(transport.sent_count().await, 13);

    let telemetry = scheduler.stats(group).telemetry;
    assert_eq!(telemetry.loops_started, 2);
    assert_eq!(telemetry.loops_finished, 2);
    assert_eq!(telemetry.signals_emitted, 13);
}

#[tokio::test(start_paused = true)]
async fn integration_transport_failures_are_swallowed_by_the_loop() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        Err(PresenceTransportError::Http("connection reset".to_string())),
        Err(PresenceTransportError::Api {
            description: "Too Many Requests: retry after 3".to_string(),
        }),
    ]));
    let dispatcher = harness(transport.clone(), Vec::new());
    let private = ConversationId(42);

    dispatcher
        .dispatch_message(&message(42, "private", 42, "hello"))
        .await;
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(transport.sent_count().await, 3);
    assert!(dispatcher.scheduler().is_active(private));
    let telemetry = dispatcher.scheduler().stats(private).telemetry;
    assert_eq!(telemetry.signals_failed, 2);
    assert_eq!(telemetry.signals_emitted, 1);
    dispatcher.scheduler().stop_all().await;
}

#[tokio::test(start_paused = true)]
async fn integration_owner_stopall_clears_every_conversation() {
    let transport = Arc::new(ScriptedTransport::new(Vec::new()));
    let dispatcher = harness(transport.clone(), vec![OWNER_ID]);

    for chat_id in [1, 2, 3] {
        dispatcher
            .dispatch_message(&message(chat_id, "private", chat_id, "ping"))
            .await;
    }
    in_group(&dispatcher, ADMIN_ID, "/typing_on").await;
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(dispatcher.scheduler().active_conversations(), 4);

    let denied = in_group(&dispatcher, ADMIN_ID, "/stopall").await;
    assert_eq!(denied.reply(), Some("Only the bot owner can use /stopall."));

    let stopped = dispatcher
        .dispatch_message(&message(OWNER_ID, "private", OWNER_ID, "/stopall"))
        .await;
    assert_eq!(stopped.reply(), Some("Stopped 4 presence loop(s)."));
    assert_eq!(dispatcher.scheduler().active_conversations(), 0);

    let before = transport.sent_count().await;
    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(transport.sent_count().await, before);

    let status = dispatcher
        .dispatch_message(&message(OWNER_ID, "private", OWNER_ID, "/status"))
        .await;
    assert_eq!(status.reply(), Some("No active presence loops."));
}
