//! Create or repair the bot's configuration file on disk.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, instrument};

use crate::core::materialize::{
    EnvRules, SecretStatus, enforce_polling, from_template, secret_status,
};

/// Where the configuration file and its template live.
#[derive(Debug, Clone)]
pub struct EnvPaths {
    pub env_path: PathBuf,
    pub template_path: PathBuf,
}

impl EnvPaths {
    pub fn new(project_dir: &Path, file: &str, template: &str) -> Self {
        Self {
            env_path: project_dir.join(file),
            template_path: project_dir.join(template),
        }
    }
}

/// What `ensure_env_file` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvOutcome {
    /// Created from the template.
    Created,
    /// Existing file had exposure keys; they were removed.
    Repaired { removed: usize },
    /// Existing file already satisfied the polling-mode rules.
    Unchanged,
    /// Neither the file nor the template exist; nothing written.
    NoSource,
}

/// Guarantee the configuration file exists (when a template allows it) and
/// holds no exposure keys.
#[instrument(skip_all, fields(env = %paths.env_path.display()))]
pub fn ensure_env_file(paths: &EnvPaths, rules: &EnvRules) -> Result<EnvOutcome> {
    if paths.env_path.exists() {
        let existing = read(&paths.env_path)?;
        let Some(repaired) = enforce_polling(&existing, rules) else {
            debug!("configuration already in polling mode");
            return Ok(EnvOutcome::Unchanged);
        };
        let removed = repaired.removed;
        write_atomic(&paths.env_path, &repaired.contents)?;
        info!(removed, "removed exposure keys from configuration");
        return Ok(EnvOutcome::Repaired { removed });
    }

    if !paths.template_path.exists() {
        debug!(template = %paths.template_path.display(), "no configuration and no template");
        return Ok(EnvOutcome::NoSource);
    }

    let template = read(&paths.template_path)?;
    let contents = from_template(&template, rules);
    write_atomic(&paths.env_path, &contents)?;
    info!(template = %paths.template_path.display(), "created configuration from template");
    Ok(EnvOutcome::Created)
}

/// Secret state of the configuration file, or `None` if there is no file.
pub fn check_secret(paths: &EnvPaths, rules: &EnvRules) -> Result<Option<SecretStatus>> {
    if !paths.env_path.exists() {
        return Ok(None);
    }
    let contents = read(&paths.env_path)?;
    Ok(Some(secret_status(&contents, rules)))
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}

/// Atomically write (temp file + rename).
///
/// An existing file keeps its permissions, and a symlink keeps pointing at
/// the same file: the rename lands on the link's target.
fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let target = if path.exists() {
        fs::canonicalize(path).with_context(|| format!("resolve {}", path.display()))?
    } else {
        path.to_path_buf()
    };
    let permissions = fs::metadata(&target).ok().map(|meta| meta.permissions());

    let tmp_path = target.with_extension("launcher.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp file {}", tmp_path.display()))?;
    if let Some(permissions) = permissions {
        fs::set_permissions(&tmp_path, permissions)
            .with_context(|| format!("set permissions on {}", tmp_path.display()))?;
    }
    fs::rename(&tmp_path, &target).with_context(|| format!("replace {}", target.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::materialize::POLLING_MARKER;

    fn paths(root: &Path) -> EnvPaths {
        EnvPaths::new(root, ".env", "env.example")
    }

    #[test]
    fn creates_from_template() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = paths(temp.path());
        fs::write(
            &paths.template_path,
            "WEBAPP_URL=https://your-domain.com\nNODE_ENV=development\nWEBHOOK_URL=x\nBOT_TOKEN=your_bot_token_here",
        )
        .expect("write template");

        let outcome = ensure_env_file(&paths, &EnvRules::default()).expect("ensure");
        assert_eq!(outcome, EnvOutcome::Created);

        let env = fs::read_to_string(&paths.env_path).expect("read env");
        assert!(env.contains("WEBAPP_URL=https://hachapurimariko.netlify.app"));
        assert!(env.contains("NODE_ENV=production"));
        assert!(!env.contains("WEBHOOK_URL="));
        assert_eq!(
            check_secret(&paths, &EnvRules::default()).expect("secret"),
            Some(SecretStatus::Placeholder)
        );
    }

    #[test]
    fn repairs_existing_file_once() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = paths(temp.path());
        fs::write(&paths.env_path, "BOT_TOKEN=1:abc\nWEBHOOK_URL=https://x\n").expect("write env");

        let rules = EnvRules::default();
        assert_eq!(
            ensure_env_file(&paths, &rules).expect("first"),
            EnvOutcome::Repaired { removed: 1 }
        );
        let after_first = fs::read_to_string(&paths.env_path).expect("read");
        assert!(after_first.contains(POLLING_MARKER));

        assert_eq!(ensure_env_file(&paths, &rules).expect("second"), EnvOutcome::Unchanged);
        let after_second = fs::read_to_string(&paths.env_path).expect("read");
        assert_eq!(after_first, after_second);
        assert!(!paths.env_path.with_extension("launcher.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn repair_keeps_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().expect("tempdir");
        let paths = paths(temp.path());
        fs::write(&paths.env_path, "BOT_TOKEN=1:abc\nWEBHOOK_URL=x\n").expect("write env");
        fs::set_permissions(&paths.env_path, fs::Permissions::from_mode(0o600)).expect("chmod");

        let outcome = ensure_env_file(&paths, &EnvRules::default()).expect("ensure");
        assert_eq!(outcome, EnvOutcome::Repaired { removed: 1 });
        let mode = fs::metadata(&paths.env_path).expect("stat").permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn repair_writes_through_symlink() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = paths(temp.path());
        let real = temp.path().join("secrets.env");
        fs::write(&real, "BOT_TOKEN=1:abc\nWEBHOOK_SECRET=s\n").expect("write env");
        std::os::unix::fs::symlink(&real, &paths.env_path).expect("symlink");

        ensure_env_file(&paths, &EnvRules::default()).expect("ensure");
        let link = fs::symlink_metadata(&paths.env_path).expect("lstat");
        assert!(link.file_type().is_symlink());
        let contents = fs::read_to_string(&real).expect("read target");
        assert!(!contents.contains("WEBHOOK_SECRET"));
    }

    #[test]
    fn existing_file_wins_over_template() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = paths(temp.path());
        fs::write(&paths.env_path, "BOT_TOKEN=1:abc\n").expect("write env");
        fs::write(&paths.template_path, "BOT_TOKEN=your_bot_token_here\n").expect("write template");

        assert_eq!(
            ensure_env_file(&paths, &EnvRules::default()).expect("ensure"),
            EnvOutcome::Unchanged
        );
        assert_eq!(
            fs::read_to_string(&paths.env_path).expect("read"),
            "BOT_TOKEN=1:abc\n"
        );
    }

    #[test]
    fn nothing_to_do_without_sources() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = paths(temp.path());

        let outcome = ensure_env_file(&paths, &EnvRules::default()).expect("ensure");
        assert_eq!(outcome, EnvOutcome::NoSource);
        assert!(!paths.env_path.exists());
        assert_eq!(check_secret(&paths, &EnvRules::default()).expect("secret"), None);
    }
}
