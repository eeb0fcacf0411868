//! Harbor Updater — the self-update subsystem of the Harbor desktop app.
//!
//! This library crate exposes all modules for use by the binary and integration tests.

pub mod app;
pub mod platform;
pub mod services;
pub mod types;
