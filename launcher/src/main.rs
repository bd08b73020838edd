//! `launcher`: check, prepare, build, and run the bot from a terminal.
//!
//! Run it from the bot directory or from the directory that contains it.
//! Settings come from an optional `launcher.toml` in the invocation directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::debug;

use launcher::console::Console;
use launcher::context::{LaunchContext, resolve_project_dir};
use launcher::error::LaunchError;
use launcher::exit_codes;
use launcher::io::config::{CONFIG_FILE_NAME, LauncherConfig, load_config};
use launcher::io::process::SystemRunner;
use launcher::launch::{Mode, launch};
use launcher::logging;

#[derive(Parser)]
#[command(
    name = "launcher",
    version,
    about = "Check, build, and start the Telegram bot in polling mode"
)]
struct Cli {
    /// Use this project directory instead of looking for it.
    #[arg(long, global = true, value_name = "DIR")]
    project_dir: Option<PathBuf>,

    /// Launcher settings file (default: ./launcher.toml if present).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Plain output without colours.
    #[arg(long, global = true)]
    no_color: bool,

    /// Debug tracing on stderr (RUST_LOG overrides).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Run every step and start the bot (default).
    Start,
    /// Check tools, project, and configuration without installing or running.
    Check,
    /// Only create or repair the `.env` file.
    Env,
}

impl Cli {
    fn mode(&self) -> Mode {
        match self.command {
            None | Some(Command::Start) => Mode::Start,
            Some(Command::Check) => Mode::Check,
            Some(Command::Env) => Mode::Env,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    std::process::exit(run(&cli));
}

fn run(cli: &Cli) -> i32 {
    let ctx = match build_context(cli) {
        Ok(ctx) => ctx,
        Err(err) => {
            let console = Console::from_settings(true, cli.no_color);
            report(&console, &LaunchError::Internal(err));
            return exit_codes::INTERNAL;
        }
    };

    let runner = SystemRunner::with_interrupt_flag(Arc::new(AtomicBool::new(false)));
    match launch(&ctx, &runner, cli.mode()) {
        Ok(outcome) => {
            debug!(?outcome, "launch finished");
            exit_codes::OK
        }
        Err(err) => {
            report(&ctx.console, &err);
            err.exit_code()
        }
    }
}

fn build_context(cli: &Cli) -> Result<LaunchContext> {
    let cwd = std::env::current_dir().context("read current directory")?;
    let config = read_settings(&cwd, cli.config.as_deref())?;
    let console = Console::from_settings(config.console.color, cli.no_color);
    let (project_dir, resolution) =
        resolve_project_dir(&cwd, cli.project_dir.as_deref(), &config);
    Ok(LaunchContext::new(project_dir, resolution, config, console))
}

/// An explicit `--config` must exist; the default file is optional.
fn read_settings(cwd: &Path, explicit: Option<&Path>) -> Result<LauncherConfig> {
    match explicit {
        Some(path) => {
            let path = cwd.join(path);
            if !path.is_file() {
                bail!("settings file {} not found", path.display());
            }
            load_config(&path)
        }
        None => load_config(&cwd.join(CONFIG_FILE_NAME)),
    }
}

fn report(console: &Console, err: &LaunchError) {
    console.fail(&format!("{err:#}"));
    if let Some(remedy) = err.remedy() {
        console.hint(&remedy);
    }
}
