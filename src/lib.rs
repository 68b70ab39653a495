//! farmhost library crate — re-exports all modules for integration testing.
//!
//! The binary crate (`main.rs`) is the headless host entry point.
//! This library crate exposes the same modules so that `tests/` integration
//! tests can drive the bootstrap without a real game process.

pub mod shared;
pub mod config;
pub mod save;
pub mod host;
pub mod bootstrap;
pub mod stage;
pub mod lifecycle;
