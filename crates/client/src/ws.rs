//! WebSocket-backed [`Channel`] implementation.
//!
//! Connects to the server's `/ws` endpoint with the retro id and token in
//! the query string (browser WebSocket clients cannot set headers, and
//! the server honors the same convention here). Inbound text frames are
//! parsed as JSON and forwarded to the sink. On disconnect the
//! connection task logs and exits — reconnection, if any, is a caller
//! decision, never this layer's.

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::subscriber::{Channel, MessageSink, Subscription};

/// Opens one WebSocket connection per subscription.
pub struct WebSocketChannel {
    base_url: String,
}

impl WebSocketChannel {
    /// Create a channel service against a WebSocket API root, e.g.
    /// `ws://localhost:4000/api`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl Channel for WebSocketChannel {
    fn subscribe(&self, _name: &str, params: Value, sink: MessageSink) -> Box<dyn Subscription> {
        let retro_id = params["retro_id"].as_str().unwrap_or_default().to_string();
        let mut url = format!("{}/ws?retro_id={retro_id}", self.base_url);
        if let Some(token) = params["api_token"].as_str() {
            url.push_str("&api_token=");
            url.push_str(token);
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_connection(url, sink, cancel.clone()));

        Box::new(WsSubscription { cancel, task })
    }
}

struct WsSubscription {
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

impl Subscription for WsSubscription {
    fn close(&mut self) {
        self.cancel.cancel();
    }
}

impl Drop for WsSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

/// Read loop for one connection. Exits on close, error, or cancellation;
/// never reconnects.
async fn run_connection(url: String, sink: MessageSink, cancel: CancellationToken) {
    let (stream, _) = match connect_async(&url).await {
        Ok(connected) => connected,
        Err(e) => {
            tracing::info!(error = %e, "WebSocket connect failed");
            return;
        }
    };
    tracing::debug!(%url, "WebSocket connected");

    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                let _ = write.send(Message::Close(None)).await;
                break;
            }
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<Value>(&text) {
                        Ok(payload) => {
                            if sink.send(payload).is_err() {
                                // Receiver gone; nobody is listening.
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "Non-JSON frame, ignoring");
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    tracing::info!("Disconnected from retro channel");
                    break;
                }
                Some(Ok(_)) => {
                    // Ping/pong and binary frames carry no payloads.
                }
                Some(Err(e)) => {
                    tracing::info!(error = %e, "WebSocket receive error");
                    break;
                }
            }
        }
    }
}
