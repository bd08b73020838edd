//! Preflight checks: required executables answer, manifest is where expected.

use std::fs;

use anyhow::Context;
use tracing::{debug, instrument, warn};

use crate::context::LaunchContext;
use crate::core::manifest::Manifest;
use crate::error::LaunchError;
use crate::io::process::{CommandRunner, CommandSpec, OutputMode, StepOutcome};

/// A checked executable and the version it reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolVersion {
    pub tool: String,
    pub version: String,
}

/// Check the runtime and the package manager, in that order.
#[instrument(skip_all)]
pub fn check_tools<R: CommandRunner>(
    ctx: &LaunchContext,
    runner: &R,
) -> Result<Vec<ToolVersion>, LaunchError> {
    let tools = &ctx.config.tools;
    let mut versions = Vec::new();
    for argv in [&tools.runtime, &tools.package_manager] {
        let version = query_version(ctx, runner, argv)?;
        ctx.console.detail(&version.tool, &version.version);
        versions.push(version);
    }
    Ok(versions)
}

fn query_version<R: CommandRunner>(
    ctx: &LaunchContext,
    runner: &R,
    argv: &[String],
) -> Result<ToolVersion, LaunchError> {
    let spec = CommandSpec::from_argv(argv, &ctx.project_dir, OutputMode::Capture)?
        .with_output_limit(ctx.config.limits.output_limit_bytes);
    let tool = spec.program.clone();

    match runner.run(&spec)? {
        StepOutcome::Succeeded(captured) => {
            let version = captured
                .first_stdout_line()
                .unwrap_or("unknown version")
                .to_string();
            debug!(tool = %tool, version = %version, "tool available");
            Ok(ToolVersion { tool, version })
        }
        StepOutcome::Failed(captured) => {
            warn!(tool = %tool, code = ?captured.code, "version check failed");
            let reason = match captured.code {
                Some(code) => format!("`{}` exited with code {code}", spec.display()),
                None => format!("`{}` was terminated", spec.display()),
            };
            Err(LaunchError::MissingDependency { tool, reason })
        }
        StepOutcome::Unavailable { reason } => {
            warn!(tool = %tool, reason = %reason, "tool not found");
            Err(LaunchError::MissingDependency { tool, reason })
        }
        StepOutcome::Interrupted => Err(LaunchError::MissingDependency {
            tool,
            reason: "version check interrupted".to_string(),
        }),
    }
}

/// Load the manifest from the project directory.
///
/// Its absence means the launcher is in the wrong place.
pub fn check_manifest(ctx: &LaunchContext) -> Result<Manifest, LaunchError> {
    let path = ctx.manifest_path();
    if !path.is_file() {
        return Err(LaunchError::WrongDirectory {
            dir: ctx.project_dir.clone(),
            manifest: ctx.config.project.manifest.clone(),
            subdir: ctx.config.project.subdir.clone(),
        });
    }
    let raw = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let manifest =
        Manifest::parse(&raw).with_context(|| format!("invalid manifest {}", path.display()))?;
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::process::Captured;
    use crate::test_support::{ScriptedRunner, TestProject};

    fn version_output(line: &str) -> StepOutcome {
        StepOutcome::Succeeded(Captured {
            code: Some(0),
            stdout: format!("{line}\n"),
            ..Captured::default()
        })
    }

    #[test]
    fn reports_both_versions() {
        let project = TestProject::new().expect("project");
        let runner = ScriptedRunner::new(vec![version_output("v20.11.0"), version_output("10.2.4")]);

        let versions = check_tools(&project.context(), &runner).expect("tools");
        assert_eq!(
            versions,
            vec![
                ToolVersion {
                    tool: "node".into(),
                    version: "v20.11.0".into()
                },
                ToolVersion {
                    tool: "npm".into(),
                    version: "10.2.4".into()
                },
            ]
        );
        let calls = runner.calls();
        assert_eq!(calls[0].display(), "node --version");
        assert_eq!(calls[1].display(), "npm --version");
        assert!(calls.iter().all(|c| c.output == OutputMode::Capture));
    }

    #[test]
    fn missing_runtime_stops_before_package_manager() {
        let project = TestProject::new().expect("project");
        let runner = ScriptedRunner::new(vec![StepOutcome::Unavailable {
            reason: "No such file or directory".into(),
        }]);

        let err = check_tools(&project.context(), &runner).unwrap_err();
        assert!(matches!(err, LaunchError::MissingDependency { ref tool, .. } if tool == "node"));
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn nonzero_version_check_is_missing_dependency() {
        let project = TestProject::new().expect("project");
        let runner = ScriptedRunner::new(vec![
            version_output("v20.11.0"),
            StepOutcome::Failed(Captured {
                code: Some(127),
                ..Captured::default()
            }),
        ]);

        let err = check_tools(&project.context(), &runner).unwrap_err();
        match err {
            LaunchError::MissingDependency { tool, reason } => {
                assert_eq!(tool, "npm");
                assert!(reason.contains("127"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn manifest_is_parsed() {
        let project = TestProject::new().expect("project");
        project
            .write_manifest(r#"{"scripts":{"dev":"node dist/main.js"}}"#)
            .expect("manifest");

        let manifest = check_manifest(&project.context()).expect("manifest");
        assert_eq!(manifest.script("dev"), Some("node dist/main.js"));
    }

    #[test]
    fn absent_manifest_is_wrong_directory() {
        let project = TestProject::new().expect("project");
        let err = check_manifest(&project.context()).unwrap_err();
        assert!(matches!(err, LaunchError::WrongDirectory { .. }));
    }

    #[test]
    fn broken_manifest_is_internal() {
        let project = TestProject::new().expect("project");
        project.write_manifest("{ nope").expect("manifest");
        let err = check_manifest(&project.context()).unwrap_err();
        assert!(matches!(err, LaunchError::Internal(_)));
    }
}
