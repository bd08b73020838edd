//! Where the launch happens and with which settings.
//!
//! The launcher never changes its own working directory. Every step gets the
//! resolved project directory from [`LaunchContext`] and passes it to child
//! processes explicitly.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::console::Console;
use crate::io::config::LauncherConfig;
use crate::io::env_store::EnvPaths;

/// How the project directory was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The invocation directory already is the project.
    Here,
    /// Stepped into the conventional subdirectory.
    Subdir,
    /// Given with `--project-dir`.
    Explicit,
}

#[derive(Debug, Clone)]
pub struct LaunchContext {
    pub project_dir: PathBuf,
    pub resolution: Resolution,
    pub config: LauncherConfig,
    pub console: Console,
}

impl LaunchContext {
    pub fn new(
        project_dir: PathBuf,
        resolution: Resolution,
        config: LauncherConfig,
        console: Console,
    ) -> Self {
        Self {
            project_dir,
            resolution,
            config,
            console,
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.project_dir.join(&self.config.project.manifest)
    }

    pub fn dependency_dir(&self) -> PathBuf {
        self.project_dir.join(&self.config.project.dependency_dir)
    }

    pub fn env_paths(&self) -> EnvPaths {
        EnvPaths::new(
            &self.project_dir,
            &self.config.env.file,
            &self.config.env.template,
        )
    }

    /// `run.log_file`, resolved against the project directory.
    pub fn run_log_path(&self) -> Option<PathBuf> {
        self.config
            .run
            .log_file
            .as_deref()
            .map(|file| self.project_dir.join(file))
    }
}

/// Pick the project directory starting from `cwd`.
///
/// When `cwd` is not itself named like the conventional subdirectory and
/// contains one, the launcher steps into it (one attempt, no deeper search).
/// Whether the manifest is really there is checked later by preflight.
pub fn resolve_project_dir(
    cwd: &Path,
    explicit: Option<&Path>,
    config: &LauncherConfig,
) -> (PathBuf, Resolution) {
    let subdir = &config.project.subdir;

    match explicit {
        Some(path) if path.is_absolute() => (path.to_path_buf(), Resolution::Explicit),
        Some(path) => (cwd.join(path), Resolution::Explicit),
        None => {
            let candidate = cwd.join(subdir);
            let already_inside = cwd.file_name().is_some_and(|name| name == subdir.as_str());
            if !already_inside && candidate.is_dir() {
                info!(dir = %candidate.display(), "stepping into project subdirectory");
                (candidate, Resolution::Subdir)
            } else {
                debug!(dir = %cwd.display(), "using invocation directory");
                (cwd.to_path_buf(), Resolution::Here)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(path, "{}").expect("write");
    }

    #[test]
    fn uses_cwd_when_manifest_present() {
        let temp = tempfile::tempdir().expect("tempdir");
        touch(&temp.path().join("package.json"));

        let (dir, how) = resolve_project_dir(temp.path(), None, &LauncherConfig::default());
        assert_eq!(dir, temp.path());
        assert_eq!(how, Resolution::Here);
    }

    #[test]
    fn steps_into_subdir_even_if_root_has_manifest() {
        let temp = tempfile::tempdir().expect("tempdir");
        touch(&temp.path().join("package.json"));
        touch(&temp.path().join("bot/package.json"));

        let (dir, how) = resolve_project_dir(temp.path(), None, &LauncherConfig::default());
        assert_eq!(dir, temp.path().join("bot"));
        assert_eq!(how, Resolution::Subdir);
    }

    #[test]
    fn does_not_descend_twice() {
        let temp = tempfile::tempdir().expect("tempdir");
        let bot = temp.path().join("bot");
        touch(&bot.join("package.json"));
        fs::create_dir_all(bot.join("bot")).expect("mkdir nested");

        let (dir, how) = resolve_project_dir(&bot, None, &LauncherConfig::default());
        assert_eq!(dir, bot);
        assert_eq!(how, Resolution::Here);
    }

    #[test]
    fn stays_put_without_subdir() {
        let temp = tempfile::tempdir().expect("tempdir");

        let (dir, how) = resolve_project_dir(temp.path(), None, &LauncherConfig::default());
        assert_eq!(dir, temp.path());
        assert_eq!(how, Resolution::Here);
    }

    #[test]
    fn explicit_dir_is_relative_to_cwd() {
        let temp = tempfile::tempdir().expect("tempdir");
        touch(&temp.path().join("apps/telegram/package.json"));

        let (dir, how) = resolve_project_dir(
            temp.path(),
            Some(Path::new("apps/telegram")),
            &LauncherConfig::default(),
        );
        assert_eq!(dir, temp.path().join("apps/telegram"));
        assert_eq!(how, Resolution::Explicit);
    }
}
