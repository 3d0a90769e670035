//! Huddle event bus and delivery infrastructure.
//!
//! - [`EventBus`] — in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`. Every successful retro mutation is
//!   published here and fanned out to WebSocket subscribers.
//! - [`RetroEvent`] — the canonical event envelope.
//! - [`delivery`] — SMTP archive-email delivery.

pub mod bus;
pub mod delivery;

pub use bus::{EventBus, RetroEvent};
pub use delivery::email::{EmailConfig, EmailDelivery};
