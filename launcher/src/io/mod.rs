//! I/O helpers for launcher steps.

pub mod config;
pub mod env_store;
pub mod process;
