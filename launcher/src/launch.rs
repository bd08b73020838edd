//! The launch sequence: each step gates the next, the first failure ends it.

use tracing::{info, instrument};

use crate::context::{LaunchContext, Resolution};
use crate::core::materialize::SecretStatus;
use crate::error::LaunchError;
use crate::io::env_store::{EnvOutcome, check_secret, ensure_env_file};
use crate::io::process::CommandRunner;
use crate::preflight::{check_manifest, check_tools};
use crate::steps::{InstallOutcome, RunOutcome, build_project, install_dependencies, run_bot};

/// How far the sequence goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Everything through running the bot.
    #[default]
    Start,
    /// Tools, manifest, configuration and secret; nothing is installed or run.
    Check,
    /// Only create or repair the configuration file.
    Env,
}

/// Terminal success states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// The bot ran and exited with status zero.
    Exited,
    /// The operator stopped the bot with Ctrl+C.
    Interrupted,
    /// `Mode::Check` passed every gate.
    Checked,
    /// `Mode::Env` finished.
    EnvPrepared(EnvOutcome),
}

#[instrument(skip_all, fields(mode = ?mode, dir = %ctx.project_dir.display()))]
pub fn launch<R: CommandRunner>(
    ctx: &LaunchContext,
    runner: &R,
    mode: Mode,
) -> Result<LaunchOutcome, LaunchError> {
    let console = &ctx.console;
    console.banner();
    report_resolution(ctx);

    if mode == Mode::Env {
        console.step("Preparing configuration");
        let outcome = prepare_env(ctx)?;
        return Ok(LaunchOutcome::EnvPrepared(outcome));
    }

    console.step("Checking required tools");
    check_tools(ctx, runner)?;
    console.ok("tools available");

    console.step("Checking project");
    let manifest = check_manifest(ctx)?;
    let name = manifest.name.as_deref().unwrap_or("unnamed project");
    console.ok(&format!("found {} ({name})", ctx.config.project.manifest));

    console.step("Preparing configuration");
    prepare_env(ctx)?;
    require_secret(ctx)?;

    if mode == Mode::Check {
        console.ok("ready to launch");
        return Ok(LaunchOutcome::Checked);
    }

    console.step("Installing dependencies");
    match install_dependencies(ctx, runner)? {
        InstallOutcome::Installed => console.ok("dependencies installed"),
        InstallOutcome::AlreadyPresent => console.ok(&format!(
            "{} already present",
            ctx.config.project.dependency_dir
        )),
    }

    console.step("Building");
    build_project(ctx, runner)?;
    console.ok("build finished");

    console.step("Starting the bot");
    match run_bot(ctx, &manifest, runner)? {
        RunOutcome::Exited => {
            console.ok("bot exited");
            Ok(LaunchOutcome::Exited)
        }
        RunOutcome::Interrupted => {
            console.ok("bot stopped, goodbye");
            Ok(LaunchOutcome::Interrupted)
        }
    }
}

fn report_resolution(ctx: &LaunchContext) {
    let dir = ctx.project_dir.display().to_string();
    match ctx.resolution {
        Resolution::Here => {}
        Resolution::Subdir => ctx.console.info(&format!("moved into {dir}")),
        Resolution::Explicit => ctx.console.detail("project", &dir),
    }
}

fn prepare_env(ctx: &LaunchContext) -> Result<EnvOutcome, LaunchError> {
    let env = &ctx.config.env;
    let outcome = ensure_env_file(&ctx.env_paths(), &env.rules())?;
    info!(?outcome, "configuration prepared");
    let console = &ctx.console;
    match outcome {
        EnvOutcome::Created => {
            console.ok(&format!("created {} from {}", env.file, env.template));
        }
        EnvOutcome::Repaired { removed } => console.ok(&format!(
            "removed {removed} webhook setting(s) from {}; the bot runs in polling mode",
            env.file
        )),
        EnvOutcome::Unchanged => console.ok(&format!("{} is in polling mode", env.file)),
        EnvOutcome::NoSource => console.warn(&format!(
            "neither {} nor {} exists; the bot starts without a configuration file",
            env.file, env.template
        )),
    }
    Ok(outcome)
}

/// Abort only on the literal placeholder; a missing or empty key is a warning.
fn require_secret(ctx: &LaunchContext) -> Result<(), LaunchError> {
    let env = &ctx.config.env;
    let paths = ctx.env_paths();
    let Some(status) = check_secret(&paths, &env.rules())? else {
        return Ok(());
    };
    let key = &env.secret_key;
    if status.blocks_launch() {
        return Err(LaunchError::SecretNotConfigured {
            key: key.clone(),
            file: paths.env_path,
        });
    }
    match status {
        SecretStatus::Missing => {
            ctx.console.warn(&format!("{key} is not defined in {}", env.file));
        }
        SecretStatus::Empty => ctx.console.warn(&format!("{key} is empty in {}", env.file)),
        SecretStatus::Configured | SecretStatus::Placeholder => {
            ctx.console.ok(&format!("{key} is set"));
        }
    }
    Ok(())
}
