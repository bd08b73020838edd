//! Launcher settings stored in an optional `launcher.toml`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::materialize::{EnvRules, Substitution};

/// Default settings file name, looked up in the invocation directory.
pub const CONFIG_FILE_NAME: &str = "launcher.toml";

/// Launcher settings (TOML).
///
/// Every field has a default, so an absent file or a file with only the
/// overrides someone cares about both work. Defaults launch a Node.js bot
/// living in `bot/` with npm.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LauncherConfig {
    pub project: ProjectConfig,
    pub tools: ToolsConfig,
    pub env: EnvConfig,
    pub limits: LimitsConfig,
    pub run: RunConfig,
    pub console: ConsoleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProjectConfig {
    /// Subdirectory to step into when invoked from the repository root.
    pub subdir: String,
    /// Manifest whose presence marks the project directory.
    pub manifest: String,
    /// Dependency cache; install is skipped when it exists.
    pub dependency_dir: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            subdir: "bot".to_string(),
            manifest: "package.json".to_string(),
            dependency_dir: "node_modules".to_string(),
        }
    }
}

/// Commands as argv arrays (e.g. `["npm", "run", "build"]`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ToolsConfig {
    pub runtime: Vec<String>,
    pub package_manager: Vec<String>,
    pub install: Vec<String>,
    pub build: Vec<String>,
    pub run: Vec<String>,
    /// Manifest script shown to the operator before `run` starts.
    pub run_script: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            runtime: argv(&["node", "--version"]),
            package_manager: argv(&["npm", "--version"]),
            install: argv(&["npm", "install"]),
            build: argv(&["npm", "run", "build"]),
            run: argv(&["npm", "run", "dev"]),
            run_script: "dev".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EnvConfig {
    /// Configuration file handed to the bot.
    pub file: String,
    /// Template the configuration file is created from.
    pub template: String,
    pub exposure_keys: Vec<String>,
    pub substitutions: Vec<Substitution>,
    pub secret_key: String,
    pub secret_placeholder: String,
}

impl Default for EnvConfig {
    fn default() -> Self {
        let rules = EnvRules::default();
        Self {
            file: ".env".to_string(),
            template: "env.example".to_string(),
            exposure_keys: rules.exposure_keys,
            substitutions: rules.substitutions,
            secret_key: rules.secret_key,
            secret_placeholder: rules.secret_placeholder,
        }
    }
}

impl EnvConfig {
    pub fn rules(&self) -> EnvRules {
        EnvRules {
            exposure_keys: self.exposure_keys.clone(),
            substitutions: self.substitutions.clone(),
            secret_key: self.secret_key.clone(),
            secret_placeholder: self.secret_placeholder.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LimitsConfig {
    /// Keep at most this many bytes of captured stdout/stderr per stream.
    pub output_limit_bytes: usize,
    /// Unset means wait for `install` as long as it takes.
    pub install_timeout_secs: Option<u64>,
    /// Unset means wait for `build` as long as it takes.
    pub build_timeout_secs: Option<u64>,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            output_limit_bytes: 1_000_000,
            install_timeout_secs: None,
            build_timeout_secs: None,
        }
    }
}

impl LimitsConfig {
    pub fn install_timeout(&self) -> Option<Duration> {
        self.install_timeout_secs.map(Duration::from_secs)
    }

    pub fn build_timeout(&self) -> Option<Duration> {
        self.build_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RunConfig {
    /// Copy the bot's stdout into this file (relative to the project dir).
    pub log_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConsoleConfig {
    pub color: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self { color: true }
    }
}

impl LauncherConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("project.subdir", &self.project.subdir),
            ("project.manifest", &self.project.manifest),
            ("project.dependency_dir", &self.project.dependency_dir),
            ("env.file", &self.env.file),
            ("env.template", &self.env.template),
            ("env.secret_key", &self.env.secret_key),
        ] {
            if value.trim().is_empty() {
                return Err(anyhow!("{name} must not be empty"));
            }
        }
        for (name, command) in [
            ("tools.runtime", &self.tools.runtime),
            ("tools.package_manager", &self.tools.package_manager),
            ("tools.install", &self.tools.install),
            ("tools.build", &self.tools.build),
            ("tools.run", &self.tools.run),
        ] {
            if command.is_empty() || command[0].trim().is_empty() {
                return Err(anyhow!("{name} must be a non-empty array"));
            }
        }
        if self.limits.output_limit_bytes == 0 {
            return Err(anyhow!("limits.output_limit_bytes must be > 0"));
        }
        if self.limits.install_timeout_secs == Some(0) {
            return Err(anyhow!("limits.install_timeout_secs must be > 0 when set"));
        }
        if self.limits.build_timeout_secs == Some(0) {
            return Err(anyhow!("limits.build_timeout_secs must be > 0 when set"));
        }
        Ok(())
    }
}

/// Load settings from a TOML file.
///
/// If the file is missing, returns `LauncherConfig::default()`.
pub fn load_config(path: &Path) -> Result<LauncherConfig> {
    if !path.exists() {
        let cfg = LauncherConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: LauncherConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid {}", path.display()))?;
    Ok(cfg)
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}
