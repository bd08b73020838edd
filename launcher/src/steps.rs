//! The three external steps: install dependencies, build, run the bot.

use tracing::{debug, info, instrument, warn};

use crate::context::LaunchContext;
use crate::core::manifest::Manifest;
use crate::error::LaunchError;
use crate::io::process::{CommandRunner, CommandSpec, OutputMode, StepOutcome};

/// Outcome of the dependency step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed,
    /// Dependency directory already there; nothing ran.
    AlreadyPresent,
}

/// How the bot process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Exited,
    Interrupted,
}

/// Install dependencies unless the dependency directory exists.
///
/// Presence is all that is checked; a stale directory is accepted as is.
#[instrument(skip_all)]
pub fn install_dependencies<R: CommandRunner>(
    ctx: &LaunchContext,
    runner: &R,
) -> Result<InstallOutcome, LaunchError> {
    let dependency_dir = ctx.dependency_dir();
    if dependency_dir.exists() {
        debug!(dir = %dependency_dir.display(), "dependencies already installed");
        return Ok(InstallOutcome::AlreadyPresent);
    }

    let spec = CommandSpec::from_argv(
        &ctx.config.tools.install,
        &ctx.project_dir,
        OutputMode::Inherit,
    )?
    .with_timeout(ctx.config.limits.install_timeout());
    ctx.console.info(&format!("running {}", spec.display()));

    match runner.run(&spec)? {
        StepOutcome::Succeeded(_) => {
            info!("dependencies installed");
            Ok(InstallOutcome::Installed)
        }
        StepOutcome::Failed(captured) => Err(LaunchError::DependencyInstallFailed {
            code: captured.code,
            timed_out: captured.timed_out,
        }),
        StepOutcome::Interrupted => Err(LaunchError::DependencyInstallFailed {
            code: None,
            timed_out: false,
        }),
        StepOutcome::Unavailable { reason } => Err(LaunchError::MissingDependency {
            tool: spec.program,
            reason,
        }),
    }
}

/// Run the build, relaying its captured output verbatim if it fails.
#[instrument(skip_all)]
pub fn build_project<R: CommandRunner>(
    ctx: &LaunchContext,
    runner: &R,
) -> Result<(), LaunchError> {
    let spec = CommandSpec::from_argv(
        &ctx.config.tools.build,
        &ctx.project_dir,
        OutputMode::Capture,
    )?
    .with_timeout(ctx.config.limits.build_timeout())
    .with_output_limit(ctx.config.limits.output_limit_bytes);
    ctx.console.info(&format!("running {}", spec.display()));

    match runner.run(&spec)? {
        StepOutcome::Succeeded(_) => {
            info!("build finished");
            Ok(())
        }
        StepOutcome::Failed(captured) => {
            warn!(code = ?captured.code, timed_out = captured.timed_out, "build failed");
            let stdout = format!(
                "{}{}",
                captured.stdout,
                captured.stdout_truncated_notice("build")
            );
            let stderr = format!(
                "{}{}",
                captured.stderr,
                captured.stderr_truncated_notice("build")
            );
            ctx.console.relay("output:", &stdout);
            ctx.console.relay("errors:", &stderr);
            Err(LaunchError::BuildFailed {
                code: captured.code,
                timed_out: captured.timed_out,
            })
        }
        StepOutcome::Interrupted => Err(LaunchError::BuildFailed {
            code: None,
            timed_out: false,
        }),
        StepOutcome::Unavailable { reason } => Err(LaunchError::MissingDependency {
            tool: spec.program,
            reason,
        }),
    }
}

/// Start the bot in the foreground and wait for it.
///
/// The manifest script is only shown to the operator; what runs is
/// `tools.run`. Ctrl+C ends the step successfully.
#[instrument(skip_all)]
pub fn run_bot<R: CommandRunner>(
    ctx: &LaunchContext,
    manifest: &Manifest,
    runner: &R,
) -> Result<RunOutcome, LaunchError> {
    let output = OutputMode::Stream {
        tee: ctx.run_log_path(),
    };
    let spec = CommandSpec::from_argv(&ctx.config.tools.run, &ctx.project_dir, output)?;

    let script_name = &ctx.config.tools.run_script;
    let script = manifest.script(script_name).unwrap_or("not found");
    let console = &ctx.console;
    console.detail("directory", &ctx.project_dir.display().to_string());
    console.detail("command", &spec.display());
    console.detail(&format!("scripts.{script_name}"), script);
    if let Some(log) = ctx.run_log_path() {
        console.detail("log file", &log.display().to_string());
    }
    console.info("Press Ctrl+C to stop the bot");
    console.rule();

    runner.prepare_foreground()?;
    let outcome = runner.run(&spec)?;
    console.rule();
    match outcome {
        StepOutcome::Succeeded(_) => {
            info!("bot exited");
            Ok(RunOutcome::Exited)
        }
        StepOutcome::Interrupted => {
            info!("bot stopped by operator");
            Ok(RunOutcome::Interrupted)
        }
        StepOutcome::Failed(captured) => Err(LaunchError::RunFailed {
            code: captured.code,
        }),
        StepOutcome::Unavailable { reason } => Err(LaunchError::MissingDependency {
            tool: spec.program,
            reason,
        }),
    }
}
