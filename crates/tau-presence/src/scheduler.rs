//! Scheduler facade: the only way control code mutates presence state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::time::Instant;
use tracing::info;

use crate::action::normalize_presence_action_key;
use crate::presence_loop::{spawn_presence_loop, PresenceLoopContext, PresenceTask};
use crate::state::{
    clamp_cadence_seconds, clamp_mute_minutes, clamp_ttl_seconds, ConversationId,
    ConversationState, GlobalDefaultKind, GlobalDefaults, PresenceMode,
};
use crate::store::ConversationStore;
use crate::telemetry::{PresenceTelemetry, PresenceTelemetrySnapshot};
use crate::transport::PresenceTransport;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// One row of `PresenceScheduler::status`.
pub struct ConversationStatus {
    pub conversation_id: ConversationId,
    pub mode: PresenceMode,
    pub muted: bool,
    pub action_key: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Full configuration snapshot of one conversation.
pub struct ConversationSnapshot {
    pub conversation_id: ConversationId,
    pub mode: PresenceMode,
    pub cadence_seconds: f64,
    pub ttl_seconds: u64,
    pub action_key: &'static str,
    pub auto_trigger_on_message: bool,
    pub expires_in_seconds: u64,
    pub muted_for_seconds: u64,
    pub loop_running: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Result of `PresenceScheduler::stats`.
pub struct PresenceStats {
    pub active_conversations: usize,
    pub telemetry: PresenceTelemetrySnapshot,
    pub conversation: Option<ConversationSnapshot>,
}

fn ceil_seconds(duration: Duration) -> u64 {
    let whole = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        whole.saturating_add(1)
    } else {
        whole
    }
}

/// Owns every conversation's presence state and loop.
///
/// Configuration calls never fail: numeric input is clamped and unknown action
/// keys become `typing`. Every conversation-scoped mutation keeps a loop running
/// for the conversation it touches, so an entry never outlives its loop.
pub struct PresenceScheduler {
    store: Arc<ConversationStore>,
    defaults: Mutex<GlobalDefaults>,
    transport: Arc<dyn PresenceTransport>,
    telemetry: Arc<PresenceTelemetry>,
    runtime: Handle,
    next_generation: AtomicU64,
}

impl PresenceScheduler {
    /// Builds a scheduler bound to the current Tokio runtime.
    pub fn new(transport: Arc<dyn PresenceTransport>, defaults: GlobalDefaults) -> Result<Self> {
        let runtime = Handle::try_current()
            .context("presence scheduler requires an active Tokio runtime")?;
        Ok(Self {
            store: Arc::new(ConversationStore::default()),
            defaults: Mutex::new(defaults),
            transport,
            telemetry: Arc::new(PresenceTelemetry::default()),
            runtime,
            next_generation: AtomicU64::new(1),
        })
    }

    pub fn defaults(&self) -> GlobalDefaults {
        *self.defaults.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Updates one global default from raw operator input. Existing conversations keep their values.
    pub fn set_global_default(&self, kind: GlobalDefaultKind, raw: &str) -> GlobalDefaults {
        let mut defaults = self.defaults.lock().unwrap_or_else(PoisonError::into_inner);
        defaults.apply(kind, raw);
        info!(
            kind = kind.as_str(),
            ttl_seconds = defaults.ttl_seconds,
            cadence_seconds = defaults.cadence_seconds,
            action = defaults.action_key,
            "presence defaults updated"
        );
        *defaults
    }

    fn ensure_loop(&self, id: ConversationId, state: &mut ConversationState) {
        if state.has_live_task() {
            return;
        }
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let task = spawn_presence_loop(
            &self.runtime,
            PresenceLoopContext {
                conversation_id: id,
                generation,
                store: Arc::clone(&self.store),
                transport: Arc::clone(&self.transport),
                telemetry: Arc::clone(&self.telemetry),
            },
        );
        state.task = Some(task);
    }

    /// Get-or-create, mutate, then make sure a loop is running; all under one lock.
    fn configure<R>(
        &self,
        id: ConversationId,
        apply: impl FnOnce(&mut ConversationState, Instant) -> R,
    ) -> R {
        let defaults = self.defaults();
        let now = Instant::now();
        self.store.get_or_create_with(id, &defaults, now, |state| {
            let result = apply(state, now);
            self.ensure_loop(id, state);
            result
        })
    }

    /// Inbound message hook. Returns whether the message refreshed presence.
    pub fn on_message(&self, id: ConversationId) -> bool {
        let defaults = self.defaults();
        let now = Instant::now();
        self.store.get_or_create_with(id, &defaults, now, |state| {
            if !state.auto_trigger_on_message {
                return false;
            }
            state.refresh_expiry(now);
            self.ensure_loop(id, state);
            true
        })
    }

    pub fn set_continuous(&self, id: ConversationId) {
        self.configure(id, |state, now| {
            state.mode = PresenceMode::Continuous;
            state.refresh_expiry(now);
        });
        info!(conversation_id = %id, "presence switched to continuous");
    }

    /// Switches to message-triggered mode with an already elapsed expiry, so the
    /// loop winds down on its next cycle. No-op for idle conversations.
    pub fn set_message_triggered(&self, id: ConversationId) -> bool {
        let now = Instant::now();
        let switched = self
            .store
            .get_with(id, |state| {
                state.mode = PresenceMode::MessageTriggered;
                state.expires_at = now;
            })
            .is_some();
        if switched {
            info!(conversation_id = %id, "presence switched to message-triggered");
        }
        switched
    }

    /// Returns the effective TTL after clamping.
    pub fn set_ttl(&self, id: ConversationId, seconds: u64) -> u64 {
        let ttl = clamp_ttl_seconds(seconds);
        self.configure(id, |state, _| state.ttl_seconds = ttl);
        ttl
    }

    /// Returns the effective cadence after clamping.
    pub fn set_cadence(&self, id: ConversationId, seconds: f64) -> f64 {
        let cadence = clamp_cadence_seconds(seconds);
        self.configure(id, |state, _| state.cadence_seconds = cadence);
        cadence
    }

    /// Returns the canonical key actually stored.
    pub fn set_action(&self, id: ConversationId, key: &str) -> &'static str {
        let action_key = normalize_presence_action_key(key);
        self.configure(id, |state, _| state.action_key = action_key);
        action_key
    }

    pub fn set_auto_trigger(&self, id: ConversationId, enabled: bool) {
        self.configure(id, |state, _| state.auto_trigger_on_message = enabled);
    }

    /// Mutes emission for `minutes` (at least one). Returns the applied minutes.
    pub fn set_mute(&self, id: ConversationId, minutes: u64) -> u64 {
        let minutes = clamp_mute_minutes(minutes);
        self.configure(id, |state, now| {
            state.mute_until = Some(now + Duration::from_secs(minutes.saturating_mul(60)));
        });
        info!(conversation_id = %id, minutes, "presence muted");
        minutes
    }

    pub fn clear_mute(&self, id: ConversationId) {
        self.configure(id, |state, _| state.mute_until = None);
    }

    /// Cancels and awaits the conversation's loop, removing its entry.
    /// Returns whether a live loop was stopped.
    pub async fn stop_one(&self, id: ConversationId) -> bool {
        let Some(task) = self.store.remove(id).and_then(|mut state| state.task.take()) else {
            return false;
        };
        let was_live = !task.is_finished();
        task.request_cancel();
        task.join().await;
        if was_live {
            info!(conversation_id = %id, "presence loop stopped on request");
        }
        was_live
    }

    /// Stops every loop in the current snapshot. Returns how many were live.
    pub async fn stop_all(&self) -> usize {
        let tasks = self
            .store
            .drain()
            .into_iter()
            .filter_map(|(_, mut state)| state.task.take())
            .collect::<Vec<PresenceTask>>();
        let mut stopped = 0_usize;
        for task in &tasks {
            if !task.is_finished() {
                stopped = stopped.saturating_add(1);
            }
            task.request_cancel();
        }
        for task in tasks {
            task.join().await;
        }
        info!(stopped, "all presence loops stopped");
        stopped
    }

    pub fn status(&self) -> Vec<ConversationStatus> {
        let now = Instant::now();
        self.store.collect_sorted(|id, state| ConversationStatus {
            conversation_id: id,
            mode: state.mode,
            muted: state.is_muted(now),
            action_key: state.action_key,
        })
    }

    pub fn stats(&self, id: ConversationId) -> PresenceStats {
        let now = Instant::now();
        let conversation = self.store.get_with(id, |state| ConversationSnapshot {
            conversation_id: id,
            mode: state.mode,
            cadence_seconds: state.cadence_seconds,
            ttl_seconds: state.ttl_seconds,
            action_key: state.action_key,
            auto_trigger_on_message: state.auto_trigger_on_message,
            expires_in_seconds: ceil_seconds(state.expires_at.saturating_duration_since(now)),
            muted_for_seconds: state
                .mute_until
                .map(|until| ceil_seconds(until.saturating_duration_since(now)))
                .unwrap_or(0),
            loop_running: state.has_live_task(),
        });
        PresenceStats {
            active_conversations: self.store.len(),
            telemetry: self.telemetry.snapshot(),
            conversation,
        }
    }

    pub fn is_active(&self, id: ConversationId) -> bool {
        self.store.contains(id)
    }

    pub fn active_conversations(&self) -> usize {
        self.store.len()
    }
}
