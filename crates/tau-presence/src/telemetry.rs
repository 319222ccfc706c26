use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
/// Process-wide counters for presence emission outcomes.
pub(crate) struct PresenceTelemetry {
    signals_emitted: AtomicU64,
    signals_failed: AtomicU64,
    loops_started: AtomicU64,
    loops_finished: AtomicU64,
}

impl PresenceTelemetry {
    pub(crate) fn record_signal_emitted(&self) {
        self.signals_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_signal_failed(&self) {
        self.signals_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_loop_started(&self) {
        self.loops_started.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_loop_finished(&self) {
        self.loops_finished.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> PresenceTelemetrySnapshot {
        PresenceTelemetrySnapshot {
            signals_emitted: self.signals_emitted.load(Ordering::Relaxed),
            signals_failed: self.signals_failed.load(Ordering::Relaxed),
            loops_started: self.loops_started.load(Ordering::Relaxed),
            loops_finished: self.loops_finished.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
/// Point-in-time copy of the presence counters.
pub struct PresenceTelemetrySnapshot {
    pub signals_emitted: u64,
    pub signals_failed: u64,
    pub loops_started: u64,
    pub loops_finished: u64,
}
