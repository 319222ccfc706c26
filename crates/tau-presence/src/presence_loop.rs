//! Per-conversation presence loop: emit, stay muted, or terminate on each cycle.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::action::{resolve_presence_action, PresenceAction};
use crate::state::{clamp_cadence_seconds, ConversationId, ConversationView, PresenceMode};
use crate::store::ConversationStore;
use crate::telemetry::PresenceTelemetry;
use crate::transport::PresenceTransport;

pub const MUTE_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug)]
/// Handle to one running presence loop, held in its conversation's state.
pub(crate) struct PresenceTask {
    generation: u64,
    cancel_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl PresenceTask {
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Signals cancellation without waiting for the loop to observe it.
    pub(crate) fn request_cancel(&self) {
        let _ = self.cancel_tx.send(true);
    }

    /// Waits for the loop to exit after `request_cancel`.
    pub(crate) async fn join(self) {
        let _ = self.handle.await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// Decision taken at the top of each loop cycle.
pub(crate) enum LoopStep {
    Emit { action: PresenceAction, wait: Duration },
    /// Woke before the cadence elapsed since the last emission.
    Hold(Duration),
    Muted,
    Terminate(TerminateReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TerminateReason {
    /// Entry was removed or now belongs to another loop.
    Released,
    Expired,
}

impl TerminateReason {
    fn as_str(self) -> &'static str {
        match self {
            Self::Released => "released",
            Self::Expired => "expired",
        }
    }
}

/// Pure cycle planner over a copy of the conversation state.
///
/// In message-triggered mode waits are capped at the remaining TTL so expiry is
/// observed on time; emissions still never come closer than the cadence.
pub(crate) fn plan_cycle(
    view: Option<ConversationView>,
    last_emit: Option<Instant>,
    now: Instant,
) -> LoopStep {
    let Some(view) = view else {
        return LoopStep::Terminate(TerminateReason::Released);
    };
    if view.mode == PresenceMode::MessageTriggered && now >= view.expires_at {
        return LoopStep::Terminate(TerminateReason::Expired);
    }
    if matches!(view.mute_until, Some(until) if now < until) {
        return LoopStep::Muted;
    }

    let cadence = Duration::from_secs_f64(clamp_cadence_seconds(view.cadence_seconds));
    let cap_to_expiry = |wait: Duration| {
        if view.mode == PresenceMode::MessageTriggered {
            wait.min(view.expires_at.saturating_duration_since(now))
        } else {
            wait
        }
    };
    if let Some(last_emit) = last_emit {
        let next_due = last_emit + cadence;
        if now < next_due {
            return LoopStep::Hold(cap_to_expiry(next_due.saturating_duration_since(now)));
        }
    }
    LoopStep::Emit {
        action: resolve_presence_action(view.action_key),
        wait: cap_to_expiry(cadence),
    }
}

/// Plans the next cycle and, on expiry, removes the entry in the same critical section.
fn begin_cycle(
    store: &ConversationStore,
    id: ConversationId,
    generation: u64,
    last_emit: Option<Instant>,
    now: Instant,
) -> LoopStep {
    store.with_entries(|entries| {
        let owned_view = entries
            .get(&id)
            .filter(|state| {
                state
                    .task
                    .as_ref()
                    .is_some_and(|task| task.generation() == generation)
            })
            .map(|state| state.view());
        let step = plan_cycle(owned_view, last_emit, now);
        if step == LoopStep::Terminate(TerminateReason::Expired) {
            entries.remove(&id);
        }
        step
    })
}

#[derive(Clone)]
pub(crate) struct PresenceLoopContext {
    pub(crate) conversation_id: ConversationId,
    pub(crate) generation: u64,
    pub(crate) store: Arc<ConversationStore>,
    pub(crate) transport: Arc<dyn PresenceTransport>,
    pub(crate) telemetry: Arc<PresenceTelemetry>,
}

pub(crate) fn spawn_presence_loop(runtime: &Handle, context: PresenceLoopContext) -> PresenceTask {
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let generation = context.generation;
    context.telemetry.record_loop_started();
    let handle = runtime.spawn(run_presence_loop(context, cancel_rx));
    PresenceTask {
        generation,
        cancel_tx,
        handle,
    }
}

async fn run_presence_loop(context: PresenceLoopContext, mut cancel_rx: watch::Receiver<bool>) {
    let conversation_id = context.conversation_id;
    info!(
        conversation_id = %conversation_id,
        generation = context.generation,
        "presence loop started"
    );

    let mut last_emit: Option<Instant> = None;
    let exit_reason = loop {
        let now = Instant::now();
        let step = begin_cycle(
            &context.store,
            conversation_id,
            context.generation,
            last_emit,
            now,
        );
        let wait = match step {
            LoopStep::Terminate(reason) => break reason.as_str(),
            LoopStep::Muted => MUTE_POLL_INTERVAL,
            LoopStep::Hold(wait) => wait,
            LoopStep::Emit { action, wait } => {
                last_emit = Some(now);
                match context
                    .transport
                    .send_presence(conversation_id, action)
                    .await
                {
                    Ok(()) => {
                        context.telemetry.record_signal_emitted();
                        debug!(
                            conversation_id = %conversation_id,
                            action = action.as_wire_str(),
                            "presence signal emitted"
                        );
                    }
                    Err(error) => {
                        context.telemetry.record_signal_failed();
                        debug!(
                            conversation_id = %conversation_id,
                            action = action.as_wire_str(),
                            %error,
                            "presence signal dropped"
                        );
                    }
                }
                wait
            }
        };

        tokio::select! {
            biased;
            _ = cancel_rx.changed() => break "cancelled",
            _ = tokio::time::sleep(wait) => {}
        }
    };

    context.telemetry.record_loop_finished();
    info!(
        conversation_id = %conversation_id,
        generation = context.generation,
        reason = exit_reason,
        "presence loop stopped"
    );
}
