//! Realtime broadcast subscription lifecycle.
//!
//! [`RetroSubscriber`] holds at most one live subscription to the retro
//! channel for a view instance. Mounting or changing (retro id, token)
//! replaces the subscription — the old handle is closed before the new
//! one is created, never leaving two live at once. Unmounting closes the
//! subscription terminally.
//!
//! Inbound messages are forwarded into an `mpsc` sink verbatim; the owner
//! pumps them back into the dispatcher as
//! [`Action::RetroDataReceived`](crate::actions::Action::RetroDataReceived)
//! so remote mutations reconcile through the same path as local ones.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::actions::Action;
use crate::dispatcher::Dispatcher;

/// Channel name retro subscriptions are created on.
pub const RETRO_CHANNEL: &str = "retro";

/// Where a subscription delivers its inbound message payloads.
pub type MessageSink = mpsc::UnboundedSender<Value>;

/// A live subscription handle.
///
/// `close()` stops message delivery and must not reconnect. Closing twice
/// is allowed and does nothing the second time.
pub trait Subscription: Send {
    fn close(&mut self);
}

/// A pub/sub channel service (the realtime transport boundary).
pub trait Channel: Send + Sync {
    /// Open a subscription on `name` with the given params, delivering
    /// every inbound message payload to `sink`.
    fn subscribe(&self, name: &str, params: Value, sink: MessageSink) -> Box<dyn Subscription>;
}

struct ActiveSubscription {
    retro_id: String,
    api_token: Option<String>,
    handle: Box<dyn Subscription>,
}

/// Lifecycle states: unsubscribed → subscribed (replaceable) → closed
/// (terminal).
pub struct RetroSubscriber {
    channel: Arc<dyn Channel>,
    sink: MessageSink,
    active: Option<ActiveSubscription>,
    closed: bool,
}

impl RetroSubscriber {
    /// Create an unsubscribed lifecycle over a channel service. Messages
    /// will be delivered to `sink`.
    pub fn new(channel: Arc<dyn Channel>, sink: MessageSink) -> Self {
        Self {
            channel,
            sink,
            active: None,
            closed: false,
        }
    }

    /// Mount or update: ensure exactly one subscription for
    /// `(retro_id, api_token)`.
    ///
    /// Unchanged inputs keep the current subscription. Changed inputs
    /// close the old handle first, then subscribe anew — at no instant
    /// are two subscriptions live. After [`close`](Self::close) this is a
    /// no-op.
    pub fn update(&mut self, retro_id: &str, api_token: Option<&str>) {
        if self.closed {
            tracing::warn!(retro_id, "Subscriber already closed, ignoring update");
            return;
        }

        if let Some(active) = &self.active {
            if active.retro_id == retro_id && active.api_token.as_deref() == api_token {
                return;
            }
        }

        if let Some(mut previous) = self.active.take() {
            previous.handle.close();
        }

        let params = json!({
            "retro_id": retro_id,
            "api_token": api_token,
        });
        let handle = self
            .channel
            .subscribe(RETRO_CHANNEL, params, self.sink.clone());

        self.active = Some(ActiveSubscription {
            retro_id: retro_id.to_string(),
            api_token: api_token.map(String::from),
            handle,
        });
    }

    /// Whether a subscription is currently live.
    pub fn is_subscribed(&self) -> bool {
        self.active.is_some()
    }

    /// Unmount: close the subscription and refuse any further updates.
    pub fn close(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.handle.close();
        }
        self.closed = true;
    }
}

impl Drop for RetroSubscriber {
    fn drop(&mut self) {
        self.close();
    }
}

/// Pump messages from a subscription sink's receiver into the dispatcher.
///
/// Runs until the sending side (every subscription handle) is gone. Each
/// payload re-enters the dispatcher verbatim as `RetroDataReceived`.
pub async fn forward_messages(mut rx: mpsc::UnboundedReceiver<Value>, dispatcher: &mut Dispatcher) {
    while let Some(payload) = rx.recv().await {
        dispatcher.dispatch(Action::RetroDataReceived { payload }).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Records subscriptions, their sinks, and close calls.
    #[derive(Default)]
    struct MockChannel {
        log: Arc<Mutex<Vec<SubscriptionRecord>>>,
        sinks: Mutex<Vec<MessageSink>>,
    }

    #[derive(Clone, Debug)]
    struct SubscriptionRecord {
        params: Value,
        closes: usize,
    }

    struct MockSubscription {
        log: Arc<Mutex<Vec<SubscriptionRecord>>>,
        index: usize,
    }

    impl MockChannel {
        fn records(&self) -> Vec<SubscriptionRecord> {
            self.log.lock().unwrap().clone()
        }

        /// Push a message through the most recent subscription's sink.
        fn deliver(&self, payload: Value) {
            let sinks = self.sinks.lock().unwrap();
            let sink = sinks.last().expect("a subscription exists");
            let _ = sink.send(payload);
        }
    }

    impl Channel for MockChannel {
        fn subscribe(
            &self,
            _name: &str,
            params: Value,
            sink: MessageSink,
        ) -> Box<dyn Subscription> {
            let mut log = self.log.lock().unwrap();
            log.push(SubscriptionRecord { params, closes: 0 });
            self.sinks.lock().unwrap().push(sink);
            Box::new(MockSubscription {
                log: Arc::clone(&self.log),
                index: log.len() - 1,
            })
        }
    }

    impl Subscription for MockSubscription {
        fn close(&mut self) {
            self.log.lock().unwrap()[self.index].closes += 1;
        }
    }

    fn subscriber() -> (RetroSubscriber, Arc<MockChannel>, mpsc::UnboundedReceiver<Value>) {
        let channel = Arc::new(MockChannel::default());
        let (tx, rx) = mpsc::unbounded_channel();
        let sub = RetroSubscriber::new(channel.clone() as Arc<dyn Channel>, tx);
        (sub, channel, rx)
    }

    #[test]
    fn token_change_replaces_the_subscription_exactly_once() {
        let (mut sub, channel, _rx) = subscriber();

        sub.update("r1", Some("T1"));
        sub.update("r1", Some("T2"));

        let records = channel.records();
        assert_eq!(records.len(), 2, "exactly one new subscription created");
        assert_eq!(records[0].closes, 1, "first handle closed exactly once");
        assert_eq!(records[1].closes, 0, "second handle still live");
        assert_eq!(records[0].params["api_token"], "T1");
        assert_eq!(records[1].params["api_token"], "T2");
        assert!(sub.is_subscribed());
    }

    #[test]
    fn unchanged_props_keep_the_subscription() {
        let (mut sub, channel, _rx) = subscriber();

        sub.update("r1", Some("T1"));
        sub.update("r1", Some("T1"));
        sub.update("r1", Some("T1"));

        let records = channel.records();
        assert_eq!(records.len(), 1, "no churn for identical props");
        assert_eq!(records[0].closes, 0);
    }

    #[test]
    fn retro_change_replaces_the_subscription() {
        let (mut sub, channel, _rx) = subscriber();

        sub.update("r1", None);
        sub.update("r2", None);

        let records = channel.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].closes, 1);
        assert_eq!(records[0].params["retro_id"], "r1");
        assert_eq!(records[1].params["retro_id"], "r2");
    }

    #[test]
    fn close_is_terminal() {
        let (mut sub, channel, _rx) = subscriber();

        sub.update("r1", Some("T1"));
        sub.close();

        assert!(!sub.is_subscribed());
        assert_eq!(channel.records()[0].closes, 1);

        // Updates after close are ignored: no new subscription appears.
        sub.update("r1", Some("T2"));
        assert_eq!(channel.records().len(), 1);
        assert!(!sub.is_subscribed());
    }

    #[test]
    fn drop_closes_the_live_subscription() {
        let (mut sub, channel, _rx) = subscriber();
        sub.update("r1", None);
        drop(sub);
        assert_eq!(channel.records()[0].closes, 1);
    }

    #[tokio::test]
    async fn delivered_messages_reach_the_subscribers_sink() {
        let (mut sub, channel, mut rx) = subscriber();
        sub.update("r1", None);

        channel.deliver(json!({"retro": {"id": 1}}));

        assert_eq!(rx.recv().await.unwrap(), json!({"retro": {"id": 1}}));
    }
}
