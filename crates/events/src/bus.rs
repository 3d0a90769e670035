//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the central publish/subscribe hub for [`RetroEvent`]s.
//! It is designed to be shared via `Arc<EventBus>` across the application.

use chrono::{DateTime, Utc};
use huddle_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// RetroEvent
// ---------------------------------------------------------------------------

/// A mutation event scoped to a single retro.
///
/// `payload` carries the wire representation pushed to realtime
/// subscribers verbatim — for retro mutations this is the full serialized
/// retro under a `{"retro": ...}` envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetroEvent {
    /// Internal id of the retro this event belongs to.
    pub retro_id: DbId,

    /// Dot-separated event name, e.g. `"retro.updated"`.
    pub event_type: String,

    /// Free-form JSON payload forwarded to subscribers.
    pub payload: serde_json::Value,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl RetroEvent {
    /// Create a new event for a retro with the given type and payload.
    pub fn new(retro_id: DbId, event_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            retro_id,
            event_type: event_type.into(),
            payload,
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`RetroEvent`].
pub struct EventBus {
    sender: broadcast::Sender<RetroEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped —
    /// nobody is watching the retro.
    pub fn publish(&self, event: RetroEvent) {
        // Ignore the SendError — it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<RetroEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
