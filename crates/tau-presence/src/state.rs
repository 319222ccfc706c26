//! Per-conversation presence configuration and process-wide defaults.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::action::{normalize_presence_action_key, DEFAULT_PRESENCE_ACTION_KEY};
use crate::presence_loop::PresenceTask;

pub const MIN_CADENCE_SECONDS: f64 = 1.0;
pub const MAX_CADENCE_SECONDS: f64 = 3_600.0;
pub const MIN_TTL_SECONDS: u64 = 5;
pub const MAX_TTL_SECONDS: u64 = 7 * 24 * 3_600;
pub const MIN_MUTE_MINUTES: u64 = 1;
pub const MAX_MUTE_MINUTES: u64 = 7 * 24 * 60;
pub const DEFAULT_TTL_SECONDS: u64 = 30;
pub const DEFAULT_CADENCE_SECONDS: f64 = 4.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// Opaque chat identifier used as the scheduler key.
pub struct ConversationId(pub i64);

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ConversationId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// Enumerates how a conversation's presence loop decides to stop.
pub enum PresenceMode {
    /// Stops once the TTL since the last qualifying message elapses.
    MessageTriggered,
    /// Runs until switched back or stopped explicitly.
    Continuous,
}

impl PresenceMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MessageTriggered => "message_triggered",
            Self::Continuous => "continuous",
        }
    }
}

/// Clamps a cadence into `[MIN_CADENCE_SECONDS, MAX_CADENCE_SECONDS]`; non-finite input maps to the minimum.
pub fn clamp_cadence_seconds(value: f64) -> f64 {
    if !value.is_finite() {
        return MIN_CADENCE_SECONDS;
    }
    value.clamp(MIN_CADENCE_SECONDS, MAX_CADENCE_SECONDS)
}

pub fn clamp_ttl_seconds(value: u64) -> u64 {
    value.clamp(MIN_TTL_SECONDS, MAX_TTL_SECONDS)
}

pub fn clamp_mute_minutes(value: u64) -> u64 {
    value.clamp(MIN_MUTE_MINUTES, MAX_MUTE_MINUTES)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Enumerates the `GlobalDefaults` fields adjustable at runtime.
pub enum GlobalDefaultKind {
    Ttl,
    Cadence,
    Action,
}

impl GlobalDefaultKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "ttl" => Some(Self::Ttl),
            "interval" | "cadence" => Some(Self::Cadence),
            "action" => Some(Self::Action),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ttl => "ttl",
            Self::Cadence => "interval",
            Self::Action => "action",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
/// Values copied into every newly created conversation state.
pub struct GlobalDefaults {
    pub ttl_seconds: u64,
    pub cadence_seconds: f64,
    pub action_key: &'static str,
}

impl Default for GlobalDefaults {
    fn default() -> Self {
        Self {
            ttl_seconds: DEFAULT_TTL_SECONDS,
            cadence_seconds: DEFAULT_CADENCE_SECONDS,
            action_key: DEFAULT_PRESENCE_ACTION_KEY,
        }
    }
}

impl GlobalDefaults {
    pub fn new(ttl_seconds: u64, cadence_seconds: f64, action_key: &str) -> Self {
        Self {
            ttl_seconds: clamp_ttl_seconds(ttl_seconds),
            cadence_seconds: clamp_cadence_seconds(cadence_seconds),
            action_key: normalize_presence_action_key(action_key),
        }
    }

    /// Applies a raw operator value. Unparsable numbers keep the current value.
    pub fn apply(&mut self, kind: GlobalDefaultKind, raw: &str) {
        let raw = raw.trim();
        match kind {
            GlobalDefaultKind::Ttl => {
                if let Ok(value) = raw.parse::<u64>() {
                    self.ttl_seconds = clamp_ttl_seconds(value);
                }
            }
            GlobalDefaultKind::Cadence => {
                if let Ok(value) = raw.parse::<f64>() {
                    self.cadence_seconds = clamp_cadence_seconds(value);
                }
            }
            GlobalDefaultKind::Action => {
                self.action_key = normalize_presence_action_key(raw);
            }
        }
    }
}

#[derive(Debug)]
/// Mutable per-conversation configuration plus the handle of its presence loop.
pub struct ConversationState {
    pub mode: PresenceMode,
    pub expires_at: Instant,
    pub cadence_seconds: f64,
    pub ttl_seconds: u64,
    pub mute_until: Option<Instant>,
    pub auto_trigger_on_message: bool,
    pub action_key: &'static str,
    pub(crate) task: Option<PresenceTask>,
}

impl ConversationState {
    pub(crate) fn from_defaults(defaults: &GlobalDefaults, now: Instant) -> Self {
        Self {
            mode: PresenceMode::MessageTriggered,
            expires_at: now + Duration::from_secs(defaults.ttl_seconds),
            cadence_seconds: defaults.cadence_seconds,
            ttl_seconds: defaults.ttl_seconds,
            mute_until: None,
            auto_trigger_on_message: true,
            action_key: defaults.action_key,
            task: None,
        }
    }

    /// Sets `expires_at = now + ttl`.
    pub(crate) fn refresh_expiry(&mut self, now: Instant) {
        self.expires_at = now + Duration::from_secs(self.ttl_seconds);
    }

    pub fn is_muted(&self, now: Instant) -> bool {
        matches!(self.mute_until, Some(until) if now < until)
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.mode == PresenceMode::MessageTriggered && now >= self.expires_at
    }

    pub fn has_live_task(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    pub(crate) fn view(&self) -> ConversationView {
        ConversationView {
            mode: self.mode,
            expires_at: self.expires_at,
            cadence_seconds: self.cadence_seconds,
            mute_until: self.mute_until,
            action_key: self.action_key,
        }
    }
}

#[derive(Debug, Clone, Copy)]
/// Copy of the fields a presence loop needs for one cycle.
pub(crate) struct ConversationView {
    pub(crate) mode: PresenceMode,
    pub(crate) expires_at: Instant,
    pub(crate) cadence_seconds: f64,
    pub(crate) mute_until: Option<Instant>,
    pub(crate) action_key: &'static str,
}
