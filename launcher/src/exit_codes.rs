//! Stable exit codes for the launcher CLI.

/// Bot ran to completion or was stopped with Ctrl+C.
pub const OK: i32 = 0;
/// Unexpected failure (unreadable files, invalid `launcher.toml`, spawn errors).
pub const INTERNAL: i32 = 1;
/// Runtime or package manager missing or not answering `--version`.
pub const MISSING_DEPENDENCY: i32 = 2;
/// No manifest in the working directory or its conventional subdirectory.
pub const WRONG_DIRECTORY: i32 = 3;
/// The mandatory secret still holds its placeholder value.
pub const SECRET_NOT_CONFIGURED: i32 = 4;
/// Dependency install exited non-zero.
pub const INSTALL_FAILED: i32 = 5;
/// Build exited non-zero.
pub const BUILD_FAILED: i32 = 6;
/// The bot process exited non-zero for a reason other than an interrupt.
pub const RUN_FAILED: i32 = 7;
