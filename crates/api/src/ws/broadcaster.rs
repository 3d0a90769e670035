//! Event-bus to WebSocket fanout.
//!
//! [`RetroBroadcaster`] subscribes to the [`EventBus`](huddle_events::EventBus)
//! and forwards every event's payload, verbatim, to the WebSocket
//! connections subscribed to that retro. Reconciliation with local state
//! is entirely the client's job.

use std::sync::Arc;

use axum::extract::ws::Message;
use huddle_events::RetroEvent;
use tokio::sync::broadcast;

use crate::ws::WsManager;

/// Routes retro events to their WebSocket subscribers.
pub struct RetroBroadcaster {
    ws_manager: Arc<WsManager>,
}

impl RetroBroadcaster {
    /// Create a new broadcaster over the given connection manager.
    pub fn new(ws_manager: Arc<WsManager>) -> Self {
        Self { ws_manager }
    }

    /// Run the fanout loop.
    ///
    /// Consumes events from `receiver` until the channel closes (i.e. the
    /// `EventBus` is dropped during shutdown).
    pub async fn run(self, mut receiver: broadcast::Receiver<RetroEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => self.fan_out(&event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Retro broadcaster lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, retro broadcaster shutting down");
                    break;
                }
            }
        }
    }

    async fn fan_out(&self, event: &RetroEvent) {
        let text = event.payload.to_string();
        let count = self
            .ws_manager
            .send_to_retro(event.retro_id, Message::Text(text.into()))
            .await;
        tracing::debug!(
            retro_id = event.retro_id,
            event_type = %event.event_type,
            subscribers = count,
            "Broadcast retro event"
        );
    }
}
