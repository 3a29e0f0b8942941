//! Foundational low-level utilities shared across Warden crates.
//!
//! Provides atomic file-write helpers for prepare artifacts and the
//! timestamp helpers used by temporal-safety checks.

pub mod atomic_io;
pub mod time_utils;

pub use atomic_io::{append_text_line, write_text_atomic};
pub use time_utils::{current_unix_timestamp, parse_rfc3339_to_unix_ms};
