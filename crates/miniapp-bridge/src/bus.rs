// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Event bus: the process-wide relay for inbound native events.
//
// One inbound event kind, fanned out synchronously to every subscriber in
// registration order. Dispatch works on a snapshot of the subscriber list
// taken under the lock and released before any listener runs, so a listener
// that subscribes or unsubscribes mid-pass (every transient correlation
// subscriber does) never affects the pass in progress and never deadlocks.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use miniapp_core::NativeEvent;

type Listener = Arc<dyn Fn(&NativeEvent) + Send + Sync>;

/// Handle for internal removal of transient subscribers. There is no public
/// unsubscribe: application listeners registered through `sub` are permanent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SubscriberId(u64);

struct Registry {
    subscribers: Vec<(SubscriberId, Listener)>,
    next_id: u64,
}

/// In-process relay fanning one native event kind out to all subscribers.
pub struct EventBus {
    registry: Mutex<Registry>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(Registry {
                subscribers: Vec::new(),
                next_id: 0,
            }),
        }
    }

    /// Register a permanent subscriber. Delivery starts with the next
    /// dispatched event; there is no way to remove it.
    pub fn subscribe(&self, listener: impl Fn(&NativeEvent) + Send + Sync + 'static) {
        self.subscribe_keyed(Arc::new(listener));
    }

    /// Register a subscriber that can later be removed by its id. Used by
    /// the correlation engine for its transient per-call subscribers.
    pub(crate) fn subscribe_keyed(&self, listener: Listener) -> SubscriberId {
        let mut registry = self.lock();
        let id = SubscriberId(registry.next_id);
        registry.next_id += 1;
        registry.subscribers.push((id, listener));
        id
    }

    /// Remove a keyed subscriber. Removing an id twice is a no-op.
    pub(crate) fn unsubscribe(&self, id: SubscriberId) {
        self.lock().subscribers.retain(|(sub_id, _)| *sub_id != id);
    }

    /// Fan the event out to a snapshot of the current subscribers, in
    /// registration order.
    pub fn dispatch(&self, event: &NativeEvent) {
        let snapshot: Vec<Listener> = self
            .lock()
            .subscribers
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in snapshot {
            listener(event);
        }
    }

    /// Current number of subscribers. Transient subscribers must be gone
    /// once their call settles; tests lean on this to catch leaks.
    pub(crate) fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    // A panicking listener poisons the mutex; the bus itself is still
    // consistent, so recover the guard rather than propagate.
    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
