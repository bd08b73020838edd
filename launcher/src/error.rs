//! Failures that end a launch, each with its own exit code and remedy.

use std::path::PathBuf;

use crate::exit_codes;

/// Terminal failure of the launch sequence.
///
/// Operator interrupts are not errors; see [`crate::launch::LaunchOutcome`].
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("{tool} is not available: {reason}")]
    MissingDependency { tool: String, reason: String },

    #[error("no {manifest} in {} or its {subdir}/ subdirectory", .dir.display())]
    WrongDirectory {
        dir: PathBuf,
        manifest: String,
        subdir: String,
    },

    #[error("{key} in {} still holds the placeholder value", .file.display())]
    SecretNotConfigured { key: String, file: PathBuf },

    #[error("dependency install failed ({})", describe_exit(.code, .timed_out))]
    DependencyInstallFailed { code: Option<i32>, timed_out: bool },

    #[error("build failed ({})", describe_exit(.code, .timed_out))]
    BuildFailed { code: Option<i32>, timed_out: bool },

    #[error("bot exited with an error ({})", describe_exit(.code, &false))]
    RunFailed { code: Option<i32> },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl LaunchError {
    pub fn exit_code(&self) -> i32 {
        match self {
            LaunchError::MissingDependency { .. } => exit_codes::MISSING_DEPENDENCY,
            LaunchError::WrongDirectory { .. } => exit_codes::WRONG_DIRECTORY,
            LaunchError::SecretNotConfigured { .. } => exit_codes::SECRET_NOT_CONFIGURED,
            LaunchError::DependencyInstallFailed { .. } => exit_codes::INSTALL_FAILED,
            LaunchError::BuildFailed { .. } => exit_codes::BUILD_FAILED,
            LaunchError::RunFailed { .. } => exit_codes::RUN_FAILED,
            LaunchError::Internal(_) => exit_codes::INTERNAL,
        }
    }

    /// What the operator should do before running the launcher again.
    pub fn remedy(&self) -> Option<String> {
        match self {
            LaunchError::MissingDependency { tool, .. } => Some(format!(
                "install {tool} (Node.js ships with npm: https://nodejs.org) and make sure it is on PATH"
            )),
            LaunchError::WrongDirectory { subdir, .. } => Some(format!(
                "run the launcher from the {subdir}/ directory or from the directory that contains it, or pass --project-dir"
            )),
            LaunchError::SecretNotConfigured { key, file } => Some(format!(
                "set {key} in {}; get a bot token from https://t.me/BotFather",
                file.display()
            )),
            LaunchError::DependencyInstallFailed { .. } => {
                Some("fix the install errors above and run the launcher again".to_string())
            }
            LaunchError::BuildFailed { .. } => {
                Some("fix the build errors above and run the launcher again".to_string())
            }
            LaunchError::RunFailed { .. } | LaunchError::Internal(_) => None,
        }
    }
}

fn describe_exit(code: &Option<i32>, timed_out: &bool) -> String {
    match (*timed_out, *code) {
        (true, _) => "timed out".to_string(),
        (false, Some(code)) => format!("exit code {code}"),
        (false, None) => "terminated by signal".to_string(),
    }
}
