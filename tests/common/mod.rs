// Shared helpers for integration tests; not every test binary uses all of them
#![allow(dead_code)]

pub mod fake_terminal;
pub mod tracing;
