// Harbor updater shared type definitions
// Each submodule defines types used across the subsystem.

pub mod config;
pub mod errors;
pub mod update;
