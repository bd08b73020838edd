//! Test helpers: a throwaway bot project and a command runner that replays
//! scripted outcomes instead of spawning processes.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tempfile::TempDir;

use crate::console::Console;
use crate::context::{LaunchContext, Resolution};
use crate::io::config::LauncherConfig;
use crate::io::process::{CommandRunner, CommandSpec, StepOutcome};

/// Project directory in a temp dir, with default launcher settings.
pub struct TestProject {
    dir: TempDir,
    config: LauncherConfig,
}

impl TestProject {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create temp project")?;
        Ok(Self {
            dir,
            config: LauncherConfig::default(),
        })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn config_mut(&mut self) -> &mut LauncherConfig {
        &mut self.config
    }

    /// Context rooted at the project, colour off.
    pub fn context(&self) -> LaunchContext {
        LaunchContext::new(
            self.root().to_path_buf(),
            Resolution::Here,
            self.config.clone(),
            Console::new(false),
        )
    }

    pub fn write_manifest(&self, contents: &str) -> Result<()> {
        self.write(&self.config.project.manifest, contents)
    }

    pub fn write_template(&self, contents: &str) -> Result<()> {
        self.write(&self.config.env.template, contents)
    }

    pub fn write_env(&self, contents: &str) -> Result<()> {
        self.write(&self.config.env.file, contents)
    }

    pub fn read_env(&self) -> Result<String> {
        let path = self.root().join(&self.config.env.file);
        fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))
    }

    pub fn create_dependency_dir(&self) -> Result<()> {
        let path = self.root().join(&self.config.project.dependency_dir);
        fs::create_dir_all(&path).with_context(|| format!("create {}", path.display()))
    }

    fn write(&self, relative: &str, contents: &str) -> Result<()> {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))
    }
}

/// Replays queued outcomes in order and records every command it was given.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    outcomes: RefCell<VecDeque<StepOutcome>>,
    calls: RefCell<Vec<CommandSpec>>,
    prepared: Cell<bool>,
}

impl ScriptedRunner {
    pub fn new(outcomes: Vec<StepOutcome>) -> Self {
        Self {
            outcomes: RefCell::new(outcomes.into()),
            calls: RefCell::new(Vec::new()),
            prepared: Cell::new(false),
        }
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.borrow().clone()
    }

    /// Whether the run step asked for interrupt handling.
    pub fn foreground_prepared(&self) -> bool {
        self.prepared.get()
    }

    /// Number of queued outcomes not consumed yet.
    pub fn remaining(&self) -> usize {
        self.outcomes.borrow().len()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, spec: &CommandSpec) -> Result<StepOutcome> {
        self.calls.borrow_mut().push(spec.clone());
        self.outcomes
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("no scripted outcome left for `{}`", spec.display()))
    }

    fn prepare_foreground(&self) -> Result<()> {
        self.prepared.set(true);
        Ok(())
    }
}
