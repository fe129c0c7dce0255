//! Asynchronous services and external integrations
//!
//! This module contains all code that deals with external processes,
//! I/O, and async operations.

pub mod async_bridge;
pub mod log_dirs;
pub mod terminal;
pub mod terminal_modes;
#[cfg(feature = "runtime")]
pub mod tracing_setup;
