#![warn(missing_docs)]
//! Topic-keyed publish/subscribe with deferred, ordered delivery.
//!
//! Publishing only enqueues. Messages reach callbacks during a drain pass,
//! run either by the background task started with [`MessageBus::start`] or
//! directly through [`MessageBus::drain`]. Each subscription owns a FIFO
//! queue, and unsubscribing enqueues a sentinel on that queue, so a message
//! published before `unsubscribe` is still delivered while anything after it
//! is dropped.
//!
//! ```
//! use mudsim_bus::{MessageBus, Topic};
//! use std::sync::{Arc, Mutex};
//!
//! let bus = MessageBus::<String>::default();
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = seen.clone();
//! let handle = bus
//!     .subscribe(Topic::new("lobby"), move |msg: &String| sink.lock().unwrap().push(msg.clone()))
//!     .unwrap();
//!
//! bus.publish(&Topic::new("lobby"), "m1".to_string());
//! bus.unsubscribe(&handle);
//! bus.publish(&Topic::new("lobby"), "m2".to_string());
//! bus.drain();
//!
//! assert_eq!(*seen.lock().unwrap(), vec!["m1".to_string()]);
//! ```

mod subscription;
mod topic;

pub use subscription::{SubscriptionHandle, SubscriptionId, SubscriptionState};
pub use topic::Topic;

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use subscription::{lock, Payload, Subscription};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, trace, warn};

/// Default drain interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Errors surfaced by the bus.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BusError {
    /// The bus was shut down; no new subscriptions or drain tasks.
    #[error("message bus has been shut down")]
    ShutDown,
    /// `start` was called while a drain task is already running.
    #[error("message bus drain task already running")]
    AlreadyStarted,
}

/// Totals for one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Messages handed to callbacks.
    pub delivered: usize,
    /// Messages discarded because they sat behind an unsubscribe sentinel.
    pub dropped: usize,
    /// Subscriptions detached from their topic.
    pub removed: usize,
}

struct BusInner<M> {
    topics: Mutex<BTreeMap<Topic, Vec<Arc<Subscription<M>>>>>,
    drain_pass: Mutex<()>,
    drain_task: Mutex<Option<JoinHandle<()>>>,
    next_id: AtomicU64,
    next_seq: AtomicU64,
    shut_down: AtomicBool,
    poll_interval: Duration,
}

/// Cloneable handle to one bus instance.
pub struct MessageBus<M> {
    inner: Arc<BusInner<M>>,
}

impl<M> Clone for MessageBus<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M> std::fmt::Debug for MessageBus<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageBus")
            .field("topics", &lock(&self.inner.topics).len())
            .field("poll_interval", &self.inner.poll_interval)
            .field("shut_down", &self.inner.shut_down.load(Ordering::Relaxed))
            .finish()
    }
}

impl<M: Clone + Send + 'static> Default for MessageBus<M> {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl<M: Clone + Send + 'static> MessageBus<M> {
    /// Create a bus that drains every `poll_interval` once started.
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            inner: Arc::new(BusInner {
                topics: Mutex::new(BTreeMap::new()),
                drain_pass: Mutex::new(()),
                drain_task: Mutex::new(None),
                next_id: AtomicU64::new(1),
                next_seq: AtomicU64::new(0),
                shut_down: AtomicBool::new(false),
                poll_interval: poll_interval.max(Duration::from_millis(1)),
            }),
        }
    }

    /// Interval used by the drain task.
    pub fn poll_interval(&self) -> Duration {
        self.inner.poll_interval
    }

    /// Whether [`shutdown`](Self::shutdown) has run.
    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::Acquire)
    }

    /// Register `callback` for messages published to `topic`.
    pub fn subscribe<F>(&self, topic: Topic, callback: F) -> Result<SubscriptionHandle, BusError>
    where
        F: FnMut(&M) + Send + 'static,
    {
        if self.is_shut_down() {
            return Err(BusError::ShutDown);
        }

        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let handle = SubscriptionHandle {
            topic: topic.clone(),
            id,
        };
        let subscription = Arc::new(Subscription::new(handle.clone(), Box::new(callback)));

        lock(&self.inner.topics)
            .entry(topic)
            .or_default()
            .push(subscription);

        trace!(topic = %handle.topic, id = id.0, "subscribed");
        Ok(handle)
    }

    /// Queue `message` for every active subscriber of `topic`.
    ///
    /// Returns how many subscriptions accepted it; zero (no subscribers) is
    /// not an error.
    pub fn publish(&self, topic: &Topic, message: M) -> usize {
        let topics = lock(&self.inner.topics);
        let Some(subscribers) = topics.get(topic) else {
            return 0;
        };

        let seq = self.inner.next_seq.fetch_add(1, Ordering::Relaxed);
        subscribers
            .iter()
            .filter(|subscription| subscription.enqueue(seq, message.clone()))
            .count()
    }

    /// Queue the unsubscribe sentinel behind everything already published.
    ///
    /// Returns false when the handle is unknown or already unsubscribing.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) -> bool {
        let Some(subscription) = self.find(handle) else {
            return false;
        };
        let seq = self.inner.next_seq.fetch_add(1, Ordering::Relaxed);
        subscription.enqueue_sentinel(seq)
    }

    /// Current lifecycle state for a handle.
    pub fn state(&self, handle: &SubscriptionHandle) -> SubscriptionState {
        self.find(handle)
            .map(|subscription| subscription.state())
            .unwrap_or(SubscriptionState::Removed)
    }

    /// Number of subscriptions attached to `topic`.
    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        lock(&self.inner.topics).get(topic).map_or(0, Vec::len)
    }

    /// Number of topics with at least one subscription.
    pub fn topic_count(&self) -> usize {
        lock(&self.inner.topics).len()
    }

    /// Deliver everything queued, in per-subscription FIFO order.
    ///
    /// Only one pass runs at a time and each pass delivers at most what was
    /// queued when it reached a subscription. Callbacks may publish or
    /// subscribe, but must not call `drain` or `shutdown` themselves.
    pub fn drain(&self) -> DrainReport {
        let _pass = lock(&self.inner.drain_pass);

        let snapshot: Vec<Arc<Subscription<M>>> = lock(&self.inner.topics)
            .values()
            .flat_map(|subscribers| subscribers.iter().cloned())
            .collect();

        let mut report = DrainReport::default();
        let mut max_lag = Duration::ZERO;

        for subscription in snapshot {
            // Messages published by callbacks during this pass wait for the next one.
            let backlog = subscription.backlog();
            for envelope in std::iter::from_fn(|| subscription.pop()).take(backlog) {
                max_lag = max_lag.max(envelope.enqueued_at.elapsed());
                match envelope.payload {
                    Payload::Message(message) => {
                        trace!(seq = envelope.seq, topic = %subscription.handle.topic, "delivering");
                        invoke(&subscription, &message);
                        report.delivered += 1;
                    }
                    Payload::Unsubscribe => {
                        report.dropped += subscription.retire();
                        self.detach(&subscription.handle);
                        report.removed += 1;
                        break;
                    }
                }
            }
        }

        if report != DrainReport::default() {
            debug!(
                delivered = report.delivered,
                dropped = report.dropped,
                removed = report.removed,
                max_lag_us = max_lag.as_micros() as u64,
                "bus drain complete"
            );
        }
        report
    }

    /// Spawn the background drain task on the current tokio runtime.
    pub fn start(&self) -> Result<(), BusError> {
        if self.is_shut_down() {
            return Err(BusError::ShutDown);
        }

        let mut slot = lock(&self.inner.drain_task);
        if slot.as_ref().is_some_and(|task| !task.is_finished()) {
            return Err(BusError::AlreadyStarted);
        }

        let bus = self.clone();
        *slot = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(bus.poll_interval());
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if bus.is_shut_down() {
                    break;
                }
                bus.drain();
            }
        }));

        info!(poll_ms = self.inner.poll_interval.as_millis() as u64, "message bus started");
        Ok(())
    }

    /// Stop the drain task and push every subscription through unsubscribe.
    ///
    /// Messages already queued ahead of the forced sentinels are delivered
    /// synchronously; no callback runs after this returns.
    pub fn shutdown(&self) -> DrainReport {
        if self.inner.shut_down.swap(true, Ordering::AcqRel) {
            return DrainReport::default();
        }

        if let Some(task) = lock(&self.inner.drain_task).take() {
            task.abort();
        }

        let handles: Vec<SubscriptionHandle> = lock(&self.inner.topics)
            .values()
            .flat_map(|subscribers| subscribers.iter().map(|s| s.handle.clone()))
            .collect();
        for handle in &handles {
            self.unsubscribe(handle);
        }

        let report = self.drain();
        let leftover = self.topic_count();
        if leftover != 0 {
            warn!(leftover, "topics still registered after bus shutdown");
        }
        info!(
            delivered = report.delivered,
            removed = report.removed,
            "message bus shut down"
        );
        report
    }

    fn find(&self, handle: &SubscriptionHandle) -> Option<Arc<Subscription<M>>> {
        lock(&self.inner.topics)
            .get(&handle.topic)?
            .iter()
            .find(|subscription| subscription.handle.id == handle.id)
            .cloned()
    }

    fn detach(&self, handle: &SubscriptionHandle) {
        let mut topics = lock(&self.inner.topics);
        if let Some(subscribers) = topics.get_mut(&handle.topic) {
            subscribers.retain(|subscription| subscription.handle.id != handle.id);
            if subscribers.is_empty() {
                topics.remove(&handle.topic);
            }
        }
        trace!(topic = %handle.topic, id = handle.id.0, "unsubscribed");
    }
}

fn invoke<M>(subscription: &Subscription<M>, message: &M) {
    let mut callback = lock(&subscription.callback);
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| (callback)(message)));
    if outcome.is_err() {
        error!(
            topic = %subscription.handle.topic,
            id = subscription.handle.id.0,
            "subscriber callback panicked; message dropped"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<u32>>>, impl FnMut(&u32) + Send + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |msg: &u32| sink.lock().unwrap().push(*msg))
    }

    #[test]
    fn publish_without_subscribers_is_a_no_op() {
        let bus = MessageBus::<u32>::default();
        assert_eq!(bus.publish(&Topic::new("empty"), 1), 0);
        assert_eq!(bus.drain(), DrainReport::default());
    }

    #[test]
    fn nothing_is_delivered_before_a_drain() {
        let bus = MessageBus::<u32>::default();
        let (seen, callback) = recorder();
        bus.subscribe(Topic::new("t"), callback).unwrap();

        assert_eq!(bus.publish(&Topic::new("t"), 7), 1);
        assert!(seen.lock().unwrap().is_empty());

        bus.drain();
        assert_eq!(*seen.lock().unwrap(), vec![7]);
    }

    #[test]
    fn delivery_follows_publish_order_for_every_subscriber() {
        let bus = MessageBus::<u32>::default();
        let topic = Topic::new("t");
        let (first, cb1) = recorder();
        let (second, cb2) = recorder();
        bus.subscribe(topic.clone(), cb1).unwrap();
        bus.subscribe(topic.clone(), cb2).unwrap();

        for msg in [1, 2, 3] {
            bus.publish(&topic, msg);
        }
        let report = bus.drain();

        assert_eq!(report.delivered, 6);
        assert_eq!(*first.lock().unwrap(), vec![1, 2, 3]);
        assert_eq!(*second.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn unsubscribe_is_ordered_with_pending_publishes() {
        let bus = MessageBus::<u32>::default();
        let topic = Topic::new("t");
        let (seen, callback) = recorder();
        let handle = bus.subscribe(topic.clone(), callback).unwrap();

        bus.publish(&topic, 1);
        assert!(bus.unsubscribe(&handle));
        assert_eq!(bus.state(&handle), SubscriptionState::UnsubscribePending);
        assert_eq!(bus.publish(&topic, 2), 0);

        let report = bus.drain();
        assert_eq!(*seen.lock().unwrap(), vec![1]);
        assert_eq!(report.removed, 1);
        assert_eq!(bus.state(&handle), SubscriptionState::Removed);
        assert_eq!(bus.subscriber_count(&topic), 0);
        assert_eq!(bus.topic_count(), 0);
    }

    #[test]
    fn double_unsubscribe_is_rejected() {
        let bus = MessageBus::<u32>::default();
        let (_, callback) = recorder();
        let handle = bus.subscribe(Topic::new("t"), callback).unwrap();

        assert!(bus.unsubscribe(&handle));
        assert!(!bus.unsubscribe(&handle));
        bus.drain();
        assert!(!bus.unsubscribe(&handle));
    }

    #[test]
    fn other_subscribers_keep_receiving_after_one_leaves() {
        let bus = MessageBus::<u32>::default();
        let topic = Topic::new("t");
        let (leaver, cb1) = recorder();
        let (stayer, cb2) = recorder();
        let handle = bus.subscribe(topic.clone(), cb1).unwrap();
        bus.subscribe(topic.clone(), cb2).unwrap();

        bus.unsubscribe(&handle);
        bus.publish(&topic, 5);
        bus.drain();

        assert!(leaver.lock().unwrap().is_empty());
        assert_eq!(*stayer.lock().unwrap(), vec![5]);
        assert_eq!(bus.subscriber_count(&topic), 1);
    }

    #[test]
    fn callbacks_may_publish_during_a_drain() {
        let bus = MessageBus::<u32>::default();
        let echo_topic = Topic::new("echo");
        let (seen, callback) = recorder();
        bus.subscribe(echo_topic.clone(), callback).unwrap();

        let relay = bus.clone();
        let target = echo_topic.clone();
        bus.subscribe(Topic::new("in"), move |msg: &u32| {
            relay.publish(&target, msg * 10);
        })
        .unwrap();

        bus.publish(&Topic::new("in"), 4);
        bus.drain();
        bus.drain();

        assert_eq!(*seen.lock().unwrap(), vec![40]);
    }

    #[test]
    fn self_echo_waits_for_the_next_pass() {
        let bus = MessageBus::<u32>::default();
        let topic = Topic::new("echo");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let relay = bus.clone();
        let own = topic.clone();
        bus.subscribe(topic.clone(), move |msg: &u32| {
            sink.lock().unwrap().push(*msg);
            relay.publish(&own, msg + 1);
        })
        .unwrap();

        bus.publish(&topic, 1);
        assert_eq!(bus.drain().delivered, 1);
        assert_eq!(bus.drain().delivered, 1);
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);

        let report = bus.shutdown();
        assert_eq!(report.delivered, 1);
        assert_eq!(report.removed, 1);
        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn panicking_callback_does_not_stop_the_pass() {
        let bus = MessageBus::<u32>::default();
        let topic = Topic::new("t");
        bus.subscribe(topic.clone(), |_msg: &u32| panic!("boom"))
            .unwrap();
        let (seen, callback) = recorder();
        bus.subscribe(topic.clone(), callback).unwrap();

        bus.publish(&topic, 9);
        bus.drain();

        assert_eq!(*seen.lock().unwrap(), vec![9]);
    }

    #[test]
    fn shutdown_flushes_then_refuses_new_work() {
        let bus = MessageBus::<u32>::default();
        let topic = Topic::new("t");
        let (seen, callback) = recorder();
        bus.subscribe(topic.clone(), callback).unwrap();
        bus.publish(&topic, 1);
        bus.publish(&topic, 2);

        let report = bus.shutdown();

        assert_eq!(report.delivered, 2);
        assert_eq!(report.removed, 1);
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
        assert_eq!(bus.publish(&topic, 3), 0);
        assert_eq!(bus.drain(), DrainReport::default());
        assert!(matches!(
            bus.subscribe(topic, |_msg: &u32| {}),
            Err(BusError::ShutDown)
        ));
        assert_eq!(bus.shutdown(), DrainReport::default());
    }
}
