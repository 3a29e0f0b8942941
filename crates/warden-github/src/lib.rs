//! Shared, I/O-free domain logic for the Warden webhook bot.
//! This crate normalizes webhook events, decides whether the assistant should
//! engage, selects the behavior mode, and enforces temporal integrity on
//! time-stamped discussion content. Runtime crates supply the network I/O.

pub mod api_types;
pub mod content_item;
pub mod event_context;
pub mod issue_filter;
pub mod mode;
pub mod temporal_filter;
pub mod tool_args;
pub mod trigger;
