//! Per-subscriber queues.

use crate::topic::Topic;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Opaque subscription id, unique within one bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

/// Returned by `subscribe`; pass it back to `unsubscribe`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    pub(crate) topic: Topic,
    pub(crate) id: SubscriptionId,
}

impl SubscriptionHandle {
    /// Topic this subscription listens on.
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Subscription id.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

/// Lifecycle of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Receiving messages.
    Active,
    /// Sentinel queued; messages ahead of it are still delivered.
    UnsubscribePending,
    /// Sentinel processed and detached from its topic.
    Removed,
}

pub(crate) enum Payload<M> {
    Message(M),
    Unsubscribe,
}

pub(crate) struct Envelope<M> {
    pub(crate) seq: u64,
    pub(crate) enqueued_at: Instant,
    pub(crate) payload: Payload<M>,
}

pub(crate) struct Queue<M> {
    pub(crate) state: SubscriptionState,
    pub(crate) pending: VecDeque<Envelope<M>>,
}

pub(crate) type Callback<M> = Box<dyn FnMut(&M) + Send + 'static>;

pub(crate) struct Subscription<M> {
    pub(crate) handle: SubscriptionHandle,
    pub(crate) queue: Mutex<Queue<M>>,
    pub(crate) callback: Mutex<Callback<M>>,
}

impl<M> Subscription<M> {
    pub(crate) fn new(handle: SubscriptionHandle, callback: Callback<M>) -> Self {
        Self {
            handle,
            queue: Mutex::new(Queue {
                state: SubscriptionState::Active,
                pending: VecDeque::new(),
            }),
            callback: Mutex::new(callback),
        }
    }

    pub(crate) fn state(&self) -> SubscriptionState {
        lock(&self.queue).state
    }

    /// Queue a message; refused unless the subscription is still active.
    pub(crate) fn enqueue(&self, seq: u64, message: M) -> bool {
        let mut queue = lock(&self.queue);
        if queue.state != SubscriptionState::Active {
            return false;
        }
        queue.pending.push_back(Envelope {
            seq,
            enqueued_at: Instant::now(),
            payload: Payload::Message(message),
        });
        true
    }

    /// Queue the unsubscribe sentinel; false if one is already queued.
    pub(crate) fn enqueue_sentinel(&self, seq: u64) -> bool {
        let mut queue = lock(&self.queue);
        if queue.state != SubscriptionState::Active {
            return false;
        }
        queue.state = SubscriptionState::UnsubscribePending;
        queue.pending.push_back(Envelope {
            seq,
            enqueued_at: Instant::now(),
            payload: Payload::Unsubscribe,
        });
        true
    }

    pub(crate) fn backlog(&self) -> usize {
        lock(&self.queue).pending.len()
    }

    pub(crate) fn pop(&self) -> Option<Envelope<M>> {
        lock(&self.queue).pending.pop_front()
    }

    /// Mark removed and discard anything left behind the sentinel.
    pub(crate) fn retire(&self) -> usize {
        let mut queue = lock(&self.queue);
        queue.state = SubscriptionState::Removed;
        let dropped = queue.pending.len();
        queue.pending.clear();
        dropped
    }
}

impl<M> fmt::Debug for Subscription<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("handle", &self.handle)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
