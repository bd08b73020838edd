//! Running external commands: version checks, install, build, and the bot itself.
//!
//! Every command goes through [`CommandRunner`], which turns a [`CommandSpec`]
//! into a [`StepOutcome`]. Orchestration code never looks at raw exit statuses;
//! tests swap in a scripted runner.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

/// Exit status shells and npm report for a child killed by SIGINT.
const SIGINT_EXIT_CODE: i32 = 130;

/// How often the run step looks at the interrupt flag.
const INTERRUPT_POLL: Duration = Duration::from_millis(100);

/// Time the child gets to react to a terminal Ctrl+C on its own before the
/// interrupt is passed on to it.
const FORWARD_AFTER: Duration = Duration::from_millis(500);

/// Time the child gets after a forwarded interrupt before it is killed.
const INTERRUPT_GRACE: Duration = Duration::from_secs(10);

/// How the child's standard streams are wired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMode {
    /// Pipe stdout/stderr and keep them (bounded) for the caller.
    Capture,
    /// Child writes straight to the launcher's terminal.
    Inherit,
    /// Forward stdout line by line, optionally copying each line to `tee`.
    Stream { tee: Option<PathBuf> },
}

/// A command to run in a working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub workdir: PathBuf,
    pub output: OutputMode,
    /// `None` waits forever.
    pub timeout: Option<Duration>,
    pub output_limit_bytes: usize,
}

impl CommandSpec {
    /// Build from an argv array such as `["npm", "run", "build"]`.
    pub fn from_argv(
        argv: &[String],
        workdir: impl Into<PathBuf>,
        output: OutputMode,
    ) -> Result<Self> {
        let (program, args) = argv.split_first().ok_or_else(|| anyhow!("empty command"))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            workdir: workdir.into(),
            output,
            timeout: None,
            output_limit_bytes: DEFAULT_OUTPUT_LIMIT_BYTES,
        })
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_output_limit(mut self, bytes: usize) -> Self {
        self.output_limit_bytes = bytes;
        self
    }

    /// `npm run build` style rendering for narration.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub const DEFAULT_OUTPUT_LIMIT_BYTES: usize = 1_000_000;

/// What a finished command left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captured {
    /// `None` when the child was killed by a signal.
    pub code: Option<i32>,
    /// Empty unless the command used [`OutputMode::Capture`].
    pub stdout: String,
    pub stderr: String,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
    pub timed_out: bool,
}

impl Captured {
    pub fn stdout_truncated_notice(&self, label: &str) -> String {
        if self.stdout_truncated > 0 {
            format!(
                "\n[{label} stdout truncated {} bytes]\n",
                self.stdout_truncated
            )
        } else {
            String::new()
        }
    }

    pub fn stderr_truncated_notice(&self, label: &str) -> String {
        if self.stderr_truncated > 0 {
            format!(
                "\n[{label} stderr truncated {} bytes]\n",
                self.stderr_truncated
            )
        } else {
            String::new()
        }
    }

    /// First non-empty stdout line, trimmed (how `--version` answers are read).
    pub fn first_stdout_line(&self) -> Option<&str> {
        self.stdout.lines().map(str::trim).find(|l| !l.is_empty())
    }
}

/// Result of one external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Exit status zero.
    Succeeded(Captured),
    /// Non-zero exit, signal, or timeout.
    Failed(Captured),
    /// Operator pressed Ctrl+C while the command was running.
    Interrupted,
    /// The program could not be started at all (not installed, not executable).
    Unavailable { reason: String },
}

/// Seam between orchestration and the operating system.
pub trait CommandRunner {
    fn run(&self, spec: &CommandSpec) -> Result<StepOutcome>;

    /// Called once, right before the long-running foreground command.
    fn prepare_foreground(&self) -> Result<()> {
        Ok(())
    }
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    interrupted: Option<Arc<AtomicBool>>,
}

impl SystemRunner {
    /// Report `Interrupted` for any command that ends while `flag` is raised.
    pub fn with_interrupt_flag(flag: Arc<AtomicBool>) -> Self {
        Self {
            interrupted: Some(flag),
        }
    }

    fn was_interrupted(&self, status: &ExitStatus) -> bool {
        let flagged = self
            .interrupted
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst));
        flagged || killed_by_sigint(status) || status.code() == Some(SIGINT_EXIT_CODE)
    }
}

impl CommandRunner for SystemRunner {
    fn prepare_foreground(&self) -> Result<()> {
        match &self.interrupted {
            Some(flag) => install_interrupt_handler(flag),
            None => Ok(()),
        }
    }

    #[instrument(skip_all, fields(command = %spec.display(), workdir = %spec.workdir.display()))]
    fn run(&self, spec: &CommandSpec) -> Result<StepOutcome> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args).current_dir(&spec.workdir);

        debug!(output = ?spec.output, "spawning child process");
        let (status, captured) = match &spec.output {
            OutputMode::Capture => {
                cmd.stdin(Stdio::null())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped());
                let child = match spawn(&mut cmd) {
                    Ok(child) => child,
                    Err(outcome) => return Ok(outcome),
                };
                run_captured(child, spec.timeout, spec.output_limit_bytes)?
            }
            OutputMode::Inherit => {
                cmd.stdin(Stdio::inherit())
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit());
                let child = match spawn(&mut cmd) {
                    Ok(child) => child,
                    Err(outcome) => return Ok(outcome),
                };
                let (status, timed_out) = wait_with_timeout(child, spec.timeout)?;
                (
                    status,
                    Captured {
                        timed_out,
                        ..Captured::default()
                    },
                )
            }
            OutputMode::Stream { tee } => {
                cmd.stdin(Stdio::inherit())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::inherit());
                let child = match spawn(&mut cmd) {
                    Ok(child) => child,
                    Err(outcome) => return Ok(outcome),
                };
                let flag = self.interrupted.as_deref();
                let status = run_streamed(child, tee.as_deref(), flag)?;
                (status, Captured::default())
            }
        };

        let captured = Captured {
            code: status.code(),
            ..captured
        };
        debug!(exit_code = ?captured.code, timed_out = captured.timed_out, "command finished");

        if !captured.timed_out && self.was_interrupted(&status) {
            return Ok(StepOutcome::Interrupted);
        }
        if status.success() {
            Ok(StepOutcome::Succeeded(captured))
        } else {
            Ok(StepOutcome::Failed(captured))
        }
    }
}

/// Spawn, mapping "cannot start" errors to `Unavailable` instead of failing hard.
fn spawn(cmd: &mut Command) -> std::result::Result<Child, StepOutcome> {
    cmd.spawn().map_err(|e| {
        error!(err = %e, "failed to spawn command");
        StepOutcome::Unavailable {
            reason: e.to_string(),
        }
    })
}

fn wait_with_timeout(mut child: Child, timeout: Option<Duration>) -> Result<(ExitStatus, bool)> {
    let Some(timeout) = timeout else {
        let status = child.wait().context("wait for command")?;
        return Ok((status, false));
    };
    match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => Ok((status, false)),
        None => {
            warn!(
                timeout_secs = timeout.as_secs(),
                "command timed out, killing"
            );
            child.kill().context("kill command")?;
            let status = child.wait().context("wait command after kill")?;
            Ok((status, true))
        }
    }
}

/// Capture stdout/stderr without risking pipe deadlocks.
///
/// Output is read concurrently while the child runs. `limit` bounds the amount
/// kept per stream; bytes beyond it are drained and counted.
fn run_captured(
    mut child: Child,
    timeout: Option<Duration>,
    limit: usize,
) -> Result<(ExitStatus, Captured)> {
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let stdout_handle = thread::spawn(move || read_stream_limited(stdout, limit));
    let stderr_handle = thread::spawn(move || read_stream_limited(stderr, limit));

    let (status, timed_out) = wait_with_timeout(child, timeout)?;

    let (stdout, stdout_truncated) = join_output(stdout_handle).context("join stdout")?;
    let (stderr, stderr_truncated) = join_output(stderr_handle).context("join stderr")?;

    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "output truncated");
    }

    Ok((
        status,
        Captured {
            code: status.code(),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            stdout_truncated,
            stderr_truncated,
            timed_out,
        },
    ))
}

/// Forward the child's stdout to ours as it arrives, copying into `tee`.
fn run_streamed(
    mut child: Child,
    tee: Option<&std::path::Path>,
    interrupted: Option<&AtomicBool>,
) -> Result<ExitStatus> {
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;

    let tee_file = match tee {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create log dir {}", parent.display()))?;
            }
            let file = File::create(path)
                .with_context(|| format!("create log file {}", path.display()))?;
            Some(BufWriter::new(file))
        }
        None => None,
    };

    let forward_handle = thread::spawn(move || forward_lines(stdout, tee_file));
    let status = wait_for_foreground(&mut child, interrupted)?;
    match forward_handle.join() {
        Ok(result) => result.context("forward stdout")?,
        Err(_) => return Err(anyhow!("stdout forwarder thread panicked")),
    }
    Ok(status)
}

/// Wait for the foreground child while watching the interrupt flag.
///
/// A Ctrl+C from the terminal reaches the child directly. A SIGINT sent to
/// the launcher alone does not, so once the flag has been up for
/// `FORWARD_AFTER` the signal is passed on, and a child still running
/// `INTERRUPT_GRACE` later is killed.
fn wait_for_foreground(child: &mut Child, interrupted: Option<&AtomicBool>) -> Result<ExitStatus> {
    let Some(flag) = interrupted else {
        return child.wait().context("wait for command");
    };

    let mut raised_at: Option<Instant> = None;
    let mut forwarded = false;
    loop {
        if let Some(status) = child
            .wait_timeout(INTERRUPT_POLL)
            .context("wait for command")?
        {
            return Ok(status);
        }
        if !flag.load(Ordering::SeqCst) {
            continue;
        }
        let waited = raised_at.get_or_insert_with(Instant::now).elapsed();
        if !forwarded && waited >= FORWARD_AFTER {
            debug!(pid = child.id(), "passing interrupt on to child");
            forward_interrupt(child)?;
            forwarded = true;
        } else if forwarded && waited >= FORWARD_AFTER + INTERRUPT_GRACE {
            warn!(
                grace_secs = INTERRUPT_GRACE.as_secs(),
                "child ignored interrupt, killing"
            );
            child.kill().context("kill command")?;
            return child.wait().context("wait command after kill");
        }
    }
}

#[cfg(unix)]
fn forward_interrupt(child: &mut Child) -> Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let pid = i32::try_from(child.id()).context("child pid out of range")?;
    match kill(Pid::from_raw(pid), Signal::SIGINT) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(err) => Err(err).context("send SIGINT to child"),
    }
}

#[cfg(not(unix))]
fn forward_interrupt(child: &mut Child) -> Result<()> {
    child.kill().context("kill command")
}

fn forward_lines<R: Read>(reader: R, mut tee: Option<BufWriter<File>>) -> Result<()> {
    let mut buf_reader = BufReader::new(reader);
    let stdout = std::io::stdout();
    loop {
        let mut line = Vec::new();
        let n = buf_reader
            .read_until(b'\n', &mut line)
            .context("read line")?;
        if n == 0 {
            break;
        }

        {
            let mut out = stdout.lock();
            out.write_all(&line).context("write stdout")?;
            out.flush().context("flush stdout")?;
        }

        if let Some(writer) = tee.as_mut() {
            if let Err(e) = writer.write_all(&line) {
                warn!(err = %e, "failed to write to log file");
            } else if let Err(e) = writer.flush() {
                warn!(err = %e, "failed to flush log file");
            }
        }
    }
    Ok(())
}

fn join_output(handle: thread::JoinHandle<Result<(Vec<u8>, usize)>>) -> Result<(Vec<u8>, usize)> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output reader thread panicked")),
    }
}

fn read_stream_limited<R: Read>(mut reader: R, limit: usize) -> Result<(Vec<u8>, usize)> {
    let mut buf = Vec::new();
    let mut truncated = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        let remaining = limit.saturating_sub(buf.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            buf.extend_from_slice(&chunk[..keep]);
            truncated += n.saturating_sub(keep);
        } else {
            truncated += n;
        }
    }

    Ok((buf, truncated))
}

/// Route Ctrl+C into `flag` instead of terminating the launcher.
///
/// The child shares the terminal's process group and still receives the
/// signal. Only the first call installs a handler.
pub fn install_interrupt_handler(flag: &Arc<AtomicBool>) -> Result<()> {
    static INSTALLED: AtomicBool = AtomicBool::new(false);
    if INSTALLED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }
    let flag = Arc::clone(flag);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .context("install Ctrl+C handler")?;
    debug!("Ctrl+C handler installed");
    Ok(())
}

#[cfg(unix)]
fn killed_by_sigint(status: &ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;
    status.signal() == Some(2)
}

#[cfg(not(unix))]
fn killed_by_sigint(_status: &ExitStatus) -> bool {
    false
}
