//! CLI tests for the `launcher` binary.
//!
//! Spawns the binary in scratch directories and checks the exit codes. Tool
//! commands are pointed at `sh` through `launcher.toml` so no Node.js
//! installation is needed.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use launcher::exit_codes;

fn launcher(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_launcher"))
        .current_dir(dir)
        .args(args)
        .arg("--no-color")
        .env_remove("RUST_LOG")
        .output()
        .expect("run launcher")
}

#[test]
fn missing_runtime_exits_with_missing_dependency() {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::write(
        temp.path().join("launcher.toml"),
        "[tools]\nruntime = [\"definitely-not-a-real-runtime-7f3a\", \"--version\"]\n",
    )
    .expect("settings");

    let output = launcher(temp.path(), &["check"]);
    assert_eq!(output.status.code(), Some(exit_codes::MISSING_DEPENDENCY));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("definitely-not-a-real-runtime-7f3a"));
}

#[test]
fn invalid_settings_exit_internal() {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::write(temp.path().join("launcher.toml"), "[tools]\nrun = []\n").expect("settings");

    let output = launcher(temp.path(), &["check"]);
    assert_eq!(output.status.code(), Some(exit_codes::INTERNAL));
}

#[test]
fn env_subcommand_creates_configuration() {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::write(
        temp.path().join("env.example"),
        "NODE_ENV=development\nWEBHOOK_URL=x\nBOT_TOKEN=your_bot_token_here\n",
    )
    .expect("template");

    let output = launcher(temp.path(), &["env"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let env = fs::read_to_string(temp.path().join(".env")).expect("env");
    assert!(env.contains("NODE_ENV=production"));
    assert!(!env.contains("WEBHOOK_URL"));
}

#[cfg(unix)]
mod with_shell {
    use super::*;

    const SETTINGS: &str = r#"
[tools]
runtime = ["sh", "-c", "echo v20.11.0"]
package_manager = ["sh", "-c", "echo 10.2.4"]
install = ["sh", "-c", "touch install-ran"]
build = ["sh", "-c", "echo compiling; echo 'error TS2304' >&2; exit 2"]
run = ["sh", "-c", "echo bot started"]
"#;

    fn project(dir: &Path, env: &str) {
        let bot = dir.join("bot");
        fs::create_dir_all(&bot).expect("mkdir bot");
        fs::write(dir.join("launcher.toml"), SETTINGS).expect("settings");
        fs::write(bot.join("package.json"), r#"{"scripts":{"dev":"node ."}}"#).expect("manifest");
        fs::write(bot.join(".env"), env).expect("env");
    }

    #[test]
    fn wrong_directory_exits_with_its_code() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("launcher.toml"), SETTINGS).expect("settings");

        let output = launcher(temp.path(), &["check"]);
        assert_eq!(output.status.code(), Some(exit_codes::WRONG_DIRECTORY));
        assert!(!temp.path().join("install-ran").exists());
    }

    #[test]
    fn placeholder_secret_exits_before_install() {
        let temp = tempfile::tempdir().expect("tempdir");
        project(temp.path(), "BOT_TOKEN=your_bot_token_here\nWEBHOOK_URL=x\n");

        let output = launcher(temp.path(), &[]);
        assert_eq!(output.status.code(), Some(exit_codes::SECRET_NOT_CONFIGURED));
        assert!(!temp.path().join("bot/install-ran").exists());
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("https://t.me/BotFather"));

        let env = fs::read_to_string(temp.path().join("bot/.env")).expect("env");
        assert!(!env.contains("WEBHOOK_URL="));
    }

    #[test]
    fn build_failure_relays_output() {
        let temp = tempfile::tempdir().expect("tempdir");
        project(temp.path(), "BOT_TOKEN=123:abc\n");

        let output = launcher(temp.path(), &["start"]);
        assert_eq!(output.status.code(), Some(exit_codes::BUILD_FAILED));
        assert!(temp.path().join("bot/install-ran").exists());
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("compiling"));
        assert!(stderr.contains("error TS2304"));
    }

    #[test]
    fn explicit_project_dir_skips_navigation() {
        let temp = tempfile::tempdir().expect("tempdir");
        project(temp.path(), "BOT_TOKEN=123:abc\n");

        let output = launcher(temp.path(), &["check", "--project-dir", "bot"]);
        assert_eq!(output.status.code(), Some(exit_codes::OK));
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("10.2.4"));
    }
}

#[cfg(unix)]
mod interrupts {
    use std::io::{BufRead, BufReader, Read};
    use std::os::unix::process::CommandExt;
    use std::process::{Child, ChildStdout, Stdio};
    use std::time::Duration;

    use nix::sys::signal::{Signal, kill, killpg};
    use nix::unistd::Pid;
    use wait_timeout::ChildExt;

    use super::*;

    const SETTINGS: &str = r#"
[tools]
runtime = ["sh", "-c", "echo v20.11.0"]
package_manager = ["sh", "-c", "echo 10.2.4"]
build = ["sh", "-c", "echo built"]
run = ["sh", "-c", "echo bot started; exec sleep 30"]
"#;

    /// Start the launcher in its own process group and wait until the bot
    /// prints its first line.
    fn start_bot(dir: &Path) -> (Child, BufReader<ChildStdout>) {
        let bot = dir.join("bot");
        fs::create_dir_all(bot.join("node_modules")).expect("mkdir bot");
        fs::write(dir.join("launcher.toml"), SETTINGS).expect("settings");
        fs::write(bot.join("package.json"), "{}").expect("manifest");
        fs::write(bot.join(".env"), "BOT_TOKEN=123:abc\n").expect("env");

        let mut child = Command::new(env!("CARGO_BIN_EXE_launcher"))
            .current_dir(dir)
            .arg("--no-color")
            .env_remove("RUST_LOG")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .process_group(0)
            .spawn()
            .expect("spawn launcher");
        let mut stdout = BufReader::new(child.stdout.take().expect("stdout"));
        let mut line = String::new();
        loop {
            line.clear();
            let n = stdout.read_line(&mut line).expect("read stdout");
            assert!(n > 0, "launcher exited before the bot started");
            if line.contains("bot started") {
                break;
            }
        }
        (child, stdout)
    }

    fn pid(child: &Child) -> Pid {
        Pid::from_raw(i32::try_from(child.id()).expect("pid"))
    }

    fn exit_code(child: &mut Child) -> Option<i32> {
        match child.wait_timeout(Duration::from_secs(20)).expect("wait") {
            Some(status) => status.code(),
            None => {
                let _ = killpg(pid(child), Signal::SIGKILL);
                panic!("launcher still running 20s after SIGINT");
            }
        }
    }

    #[test]
    fn sigint_to_launcher_alone_stops_the_bot() {
        let temp = tempfile::tempdir().expect("tempdir");
        let (mut child, mut stdout) = start_bot(temp.path());

        kill(pid(&child), Signal::SIGINT).expect("send SIGINT");
        assert_eq!(exit_code(&mut child), Some(exit_codes::OK));

        let mut rest = String::new();
        stdout.read_to_string(&mut rest).expect("read rest");
        assert!(rest.contains("bot stopped"));
    }

    #[test]
    fn sigint_to_process_group_stops_the_bot() {
        let temp = tempfile::tempdir().expect("tempdir");
        let (mut child, mut stdout) = start_bot(temp.path());

        killpg(pid(&child), Signal::SIGINT).expect("send SIGINT to group");
        assert_eq!(exit_code(&mut child), Some(exit_codes::OK));

        let mut rest = String::new();
        stdout.read_to_string(&mut rest).expect("read rest");
        assert!(rest.contains("bot stopped"));
    }
}
