//! Client-side coordination layer for Huddle.
//!
//! Everything a frontend needs between user interaction and rendered
//! state, with no rendering of its own:
//!
//! - [`Dispatcher`] — the single mediator. Intents issue HTTP calls
//!   through [`api::RetroApi`], responses are classified by status, and
//!   every outcome becomes a follow-up action folded into the
//!   [`store::StateTree`].
//! - [`subscriber::RetroSubscriber`] — one live realtime subscription per
//!   retro view; inbound messages re-enter the dispatcher so remote
//!   mutations and local ones share a single reconciliation path.
//! - [`cache::LocalCache`] — write-through mirror of the persistent
//!   key-value store holding auth/session tokens and UI dismissal flags.
//!
//! Both mutation paths — local intent and server broadcast — converge on
//! the dispatcher's queue, which is the only place state changes happen.

pub mod actions;
pub mod api;
pub mod cache;
pub mod dispatcher;
pub mod store;
pub mod subscriber;
pub mod types;
pub mod ws;

pub use actions::{classify, Action, StatusClass};
pub use cache::LocalCache;
pub use dispatcher::Dispatcher;
pub use store::StateTree;
pub use subscriber::RetroSubscriber;
