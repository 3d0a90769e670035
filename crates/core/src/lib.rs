//! Shared domain types for the Huddle retro tool.
//!
//! This crate holds the types every other workspace crate agrees on:
//! database id/timestamp aliases, the item category enum, slug validation,
//! and the domain-level [`CoreError`](error::CoreError).

pub mod category;
pub mod error;
pub mod slug;
pub mod types;

pub use category::Category;
pub use error::CoreError;
