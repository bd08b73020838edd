//! Local launcher for the Hachapuri Mariko Telegram bot.
//!
//! One linear sequence, each step gating the next: check the runtime and
//! package manager, find the project, create or repair its `.env`, make sure
//! the bot token is set, install dependencies, build, and run the bot in the
//! foreground until it exits or the operator presses Ctrl+C.
//!
//! - **[`core`]**: Pure logic on text (the `.env` line model, polling-mode
//!   rules, manifest fields). No I/O.
//! - **[`io`]**: Settings, files on disk, child processes.
//!
//! Orchestration modules ([`context`], [`preflight`], [`steps`], [`launch`])
//! thread one explicit [`context::LaunchContext`] through the sequence.

pub mod console;
pub mod context;
pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod launch;
pub mod logging;
pub mod preflight;
pub mod steps;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
