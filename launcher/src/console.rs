//! Operator narration: what the launcher is doing and what to fix.
//!
//! Colour is a property of the [`Console`] value handed to each step, never
//! process-wide state. Failures and remedies go to stderr, everything else to
//! stdout.

use colored::{ColoredString, Colorize};

const RULE_WIDTH: usize = 60;

#[derive(Debug, Clone, Copy)]
pub struct Console {
    color: bool,
}

impl Console {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    /// Colour unless disabled by settings, `--no-color`, or `NO_COLOR`.
    pub fn from_settings(config_color: bool, no_color_flag: bool) -> Self {
        let env_no_color = std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
        Self::new(config_color && !no_color_flag && !env_no_color)
    }

    fn paint(&self, text: &str, style: impl Fn(&str) -> ColoredString) -> String {
        if self.color {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }

    pub fn banner(&self) {
        let lines = [
            "╔══════════════════════════════════════════════════════════╗",
            "║                 HACHAPURI MARIKO BOT LAUNCHER            ║",
            "║      (the mini app is hosted separately on Netlify)      ║",
            "╚══════════════════════════════════════════════════════════╝",
        ];
        for line in lines {
            println!("{}", self.paint(line, |s| s.purple().bold()));
        }
        self.info("This launcher starts only the Telegram bot.");
        println!();
    }

    /// A step is starting.
    pub fn step(&self, msg: &str) {
        println!("{}", self.paint(&format!("==> {msg}"), |s| s.cyan().bold()));
    }

    pub fn ok(&self, msg: &str) {
        println!("{} {msg}", self.paint("✓", |s| s.green().bold()));
    }

    pub fn info(&self, msg: &str) {
        println!("{}", self.paint(msg, |s| s.blue()));
    }

    /// Label/value pair such as `node: v20.11.0`.
    pub fn detail(&self, label: &str, value: &str) {
        println!("    {} {value}", self.paint(&format!("{label}:"), |s| s.dimmed()));
    }

    pub fn warn(&self, msg: &str) {
        println!("{} {msg}", self.paint("!", |s| s.yellow().bold()));
    }

    pub fn fail(&self, msg: &str) {
        eprintln!("{} {msg}", self.paint("✗", |s| s.red().bold()));
    }

    /// How to fix the failure just reported.
    pub fn hint(&self, msg: &str) {
        eprintln!("  {}", self.paint(&format!("hint: {msg}"), |s| s.yellow()));
    }

    /// Raw child output, relayed verbatim under a label.
    pub fn relay(&self, label: &str, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        eprintln!("{}", self.paint(label, |s| s.bold()));
        eprint!("{text}");
        if !text.ends_with('\n') {
            eprintln!();
        }
    }

    pub fn rule(&self) {
        println!("{}", self.paint(&"─".repeat(RULE_WIDTH), |s| s.dimmed()));
    }
}
