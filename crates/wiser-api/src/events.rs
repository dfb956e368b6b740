//! Per-device event distribution.
//!
//! [`EventDistributor`] is an explicit registry mapping a [`DeviceId`] to the
//! ordered list of callbacks interested in it. The push channel publishes
//! every decoded message into it; consumers subscribe per id and receive
//! callbacks synchronously, in registration order. Nothing is buffered: a
//! subscriber registered after an event fired never sees that event.
//!
//! ```rust,ignore
//! let events = EventDistributor::new();
//! let sub = events.subscribe(DeviceId(7), |event| println!("{event:?}"));
//! // ...
//! events.unsubscribe(sub);
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::models::{ButtonEvent, DeviceId, LoadState, PushMessage};

// ── DeviceEvent ──────────────────────────────────────────────────────

/// Payload handed to subscribers of a device id.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    /// New actuation state of a load.
    Load(LoadState),
    /// A smart-button press.
    Button(ButtonEvent),
}

impl From<PushMessage> for (DeviceId, DeviceEvent) {
    fn from(msg: PushMessage) -> Self {
        match msg {
            PushMessage::Load(update) => (update.id, DeviceEvent::Load(update.state)),
            PushMessage::Button(event) => (event.id, DeviceEvent::Button(event)),
        }
    }
}

// ── Subscription ─────────────────────────────────────────────────────

type Callback = Arc<dyn Fn(&DeviceEvent) + Send + Sync>;

struct Registration {
    token: u64,
    callback: Callback,
}

/// Handle identifying one registration; pass it to
/// [`EventDistributor::unsubscribe`] to cancel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    id: DeviceId,
    token: u64,
}

impl Subscription {
    /// The device id this subscription listens to.
    pub fn device_id(&self) -> DeviceId {
        self.id
    }
}

// ── EventDistributor ─────────────────────────────────────────────────

/// Registry of per-device subscribers.
///
/// Cheaply cloneable; all clones share the same registry.
#[derive(Clone, Default)]
pub struct EventDistributor {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    subscribers: DashMap<DeviceId, Vec<Registration>>,
    next_token: AtomicU64,
}

impl fmt::Debug for EventDistributor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDistributor")
            .field("devices", &self.inner.subscribers.len())
            .finish_non_exhaustive()
    }
}

impl EventDistributor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for events of `id`. Several callbacks per id are
    /// allowed; they run in registration order.
    pub fn subscribe<F>(&self, id: DeviceId, callback: F) -> Subscription
    where
        F: Fn(&DeviceEvent) + Send + Sync + 'static,
    {
        let token = self.inner.next_token.fetch_add(1, Ordering::Relaxed);
        self.inner
            .subscribers
            .entry(id)
            .or_default()
            .push(Registration {
                token,
                callback: Arc::new(callback),
            });
        Subscription { id, token }
    }

    /// Subscribe through an unbounded channel instead of a callback.
    ///
    /// The receiver yields every event of `id` published after this call.
    /// It closes once the subscription is cancelled and the registry drops
    /// its sender.
    pub fn subscribe_channel(
        &self,
        id: DeviceId,
    ) -> (Subscription, mpsc::UnboundedReceiver<DeviceEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sub = self.subscribe(id, move |event| {
            // Receiver dropped: the consumer no longer cares.
            let _ = tx.send(event.clone());
        });
        (sub, rx)
    }

    /// Remove a registration. Returns `false` if it was already removed.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let removed = match self.inner.subscribers.get_mut(&subscription.id) {
            Some(mut registrations) => {
                let before = registrations.len();
                registrations.retain(|r| r.token != subscription.token);
                registrations.len() != before
            }
            None => false,
        };
        self.inner
            .subscribers
            .remove_if(&subscription.id, |_, registrations| registrations.is_empty());
        removed
    }

    /// Invoke every callback currently registered for `id`, in order.
    ///
    /// Returns the number of callbacks invoked; publishing to an id without
    /// subscribers is a no-op. The callback list is snapshotted first, so
    /// callbacks may themselves subscribe or unsubscribe.
    pub fn publish(&self, id: DeviceId, event: &DeviceEvent) -> usize {
        let callbacks: Vec<Callback> = match self.inner.subscribers.get(&id) {
            Some(registrations) => registrations
                .iter()
                .map(|r| Arc::clone(&r.callback))
                .collect(),
            None => return 0,
        };

        for callback in &callbacks {
            callback(event);
        }
        callbacks.len()
    }

    /// Decode-side convenience: route a push message to its id.
    pub fn publish_message(&self, msg: PushMessage) -> usize {
        let (id, event) = msg.into();
        self.publish(id, &event)
    }

    /// Number of live registrations for `id`.
    pub fn subscriber_count(&self, id: DeviceId) -> usize {
        self.inner.subscribers.get(&id).map_or(0, |r| r.len())
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::models::ButtonAction;

    fn bri(value: u64) -> DeviceEvent {
        DeviceEvent::Load(LoadState::new().with("bri", value))
    }

    #[test]
    fn publish_without_subscribers_is_noop() {
        let events = EventDistributor::new();
        assert_eq!(events.publish(DeviceId(7), &bri(50)), 0);
    }

    #[test]
    fn callbacks_run_in_registration_order() {
        let events = EventDistributor::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let seen = Arc::clone(&seen);
            events.subscribe(DeviceId(1), move |_| seen.lock().unwrap().push(tag));
        }

        assert_eq!(events.publish(DeviceId(1), &bri(1)), 3);
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn routes_only_to_matching_id() {
        let events = EventDistributor::new();
        let hits = Arc::new(Mutex::new(Vec::new()));

        for id in [3, 4] {
            let hits = Arc::clone(&hits);
            events.subscribe(DeviceId(id), move |e| hits.lock().unwrap().push((id, e.clone())));
        }

        let press = DeviceEvent::Button(ButtonEvent {
            id: DeviceId(3),
            action: ButtonAction::Double,
        });
        events.publish(DeviceId(3), &press);

        let hits = hits.lock().unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0], (3, press));
    }

    #[test]
    fn unsubscribe_removes_only_that_registration() {
        let events = EventDistributor::new();
        let a = events.subscribe(DeviceId(9), |_| {});
        let _b = events.subscribe(DeviceId(9), |_| {});

        assert!(events.unsubscribe(a));
        assert!(!events.unsubscribe(a));
        assert_eq!(events.subscriber_count(DeviceId(9)), 1);
        assert_eq!(events.publish(DeviceId(9), &bri(0)), 1);
    }

    #[test]
    fn last_unsubscribe_drops_the_entry() {
        let events = EventDistributor::new();
        let sub = events.subscribe(DeviceId(5), |_| {});
        assert_eq!(sub.device_id(), DeviceId(5));
        events.unsubscribe(sub);
        assert_eq!(events.subscriber_count(DeviceId(5)), 0);
        assert!(events.inner.subscribers.is_empty());
    }

    #[test]
    fn late_subscriber_misses_earlier_events() {
        let events = EventDistributor::new();
        events.publish(DeviceId(2), &bri(10));

        let (_sub, mut rx) = events.subscribe_channel(DeviceId(2));
        assert!(rx.try_recv().is_err());

        events.publish(DeviceId(2), &bri(20));
        assert_eq!(rx.try_recv().unwrap(), bri(20));
    }

    #[test]
    fn callback_may_subscribe_reentrantly() {
        let events = EventDistributor::new();
        let inner = events.clone();
        events.subscribe(DeviceId(1), move |_| {
            inner.subscribe(DeviceId(1), |_| {});
        });

        assert_eq!(events.publish(DeviceId(1), &bri(1)), 1);
        assert_eq!(events.subscriber_count(DeviceId(1)), 2);
    }

    #[test]
    fn push_message_routes_by_id() {
        let events = EventDistributor::new();
        let (_sub, mut rx) = events.subscribe_channel(DeviceId(7));

        let msg = crate::codec::decode_push(r#"{"load":{"id":7,"state":{"bri":50}}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(events.publish_message(msg), 1);
        assert_eq!(rx.try_recv().unwrap(), bri(50));
    }
}
