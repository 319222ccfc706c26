//! In-memory conversation state store shared by the scheduler and its loops.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::time::Instant;

use crate::state::{ConversationId, ConversationState, GlobalDefaults};

#[derive(Debug, Default)]
/// Maps conversation ids to their presence state behind one coarse lock.
///
/// The lock is never held across an await point, so transport calls made by
/// presence loops are not serialized by it.
pub(crate) struct ConversationStore {
    entries: Mutex<HashMap<ConversationId, ConversationState>>,
}

impl ConversationStore {
    fn lock(&self) -> MutexGuard<'_, HashMap<ConversationId, ConversationState>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `apply` against the entry for `id`, creating it from `defaults` first if absent.
    pub(crate) fn get_or_create_with<R>(
        &self,
        id: ConversationId,
        defaults: &GlobalDefaults,
        now: Instant,
        apply: impl FnOnce(&mut ConversationState) -> R,
    ) -> R {
        let mut entries = self.lock();
        let state = entries
            .entry(id)
            .or_insert_with(|| ConversationState::from_defaults(defaults, now));
        apply(state)
    }

    /// Runs `apply` against the existing entry for `id`, if any.
    pub(crate) fn get_with<R>(
        &self,
        id: ConversationId,
        apply: impl FnOnce(&mut ConversationState) -> R,
    ) -> Option<R> {
        let mut entries = self.lock();
        entries.get_mut(&id).map(apply)
    }

    /// Runs `apply` with exclusive access to every entry.
    pub(crate) fn with_entries<R>(
        &self,
        apply: impl FnOnce(&mut HashMap<ConversationId, ConversationState>) -> R,
    ) -> R {
        let mut entries = self.lock();
        apply(&mut entries)
    }

    pub(crate) fn remove(&self, id: ConversationId) -> Option<ConversationState> {
        self.lock().remove(&id)
    }

    /// Removes and returns every entry at once.
    pub(crate) fn drain(&self) -> Vec<(ConversationId, ConversationState)> {
        self.lock().drain().collect()
    }

    pub(crate) fn contains(&self, id: ConversationId) -> bool {
        self.lock().contains_key(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    /// Maps every entry while holding the lock once; output is sorted by id.
    pub(crate) fn collect_sorted<T>(
        &self,
        mut map: impl FnMut(ConversationId, &ConversationState) -> T,
    ) -> Vec<T> {
        let entries = self.lock();
        let mut ids = entries.keys().copied().collect::<Vec<_>>();
        ids.sort();
        ids.into_iter()
            .filter_map(|id| entries.get(&id).map(|state| map(id, state)))
            .collect()
    }
}
