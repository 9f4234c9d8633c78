//! Package publishing and local tool installation.
//!
//! Publishing is guarded by a gate rather than a precondition: when the
//! branch, build configuration or working tree is wrong the step is skipped
//! with warnings, never attempted and never an error.

use crate::boundary::GateWarning;
use crate::domain::{Branch, BranchKind};
use crate::error::{ReleaseError, ReleaseStep, Result};
use crate::git::RepositoryHandle;
use crate::runner::{run_checked, try_run, CommandRunner, ToolCommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Reasons publishing would be skipped; empty when it may proceed
pub fn gate_warnings(
    branch: &Branch,
    configuration: &str,
    release_configuration: &str,
    working_tree_clean: bool,
) -> Vec<GateWarning> {
    let mut warnings = Vec::new();

    if !matches!(branch.kind, BranchKind::Master | BranchKind::Develop) {
        warnings.push(GateWarning::BranchNotPublishable {
            branch: branch.name.clone(),
        });
    }
    if !configuration.eq_ignore_ascii_case(release_configuration) {
        warnings.push(GateWarning::ConfigurationNotRelease {
            configuration: configuration.to_string(),
            expected: release_configuration.to_string(),
        });
    }
    if !working_tree_clean {
        warnings.push(GateWarning::WorkingTreeDirty);
    }

    warnings
}

/// True when packages may be published
pub fn can_publish(
    branch: &Branch,
    configuration: &str,
    release_configuration: &str,
    working_tree_clean: bool,
) -> bool {
    gate_warnings(
        branch,
        configuration,
        release_configuration,
        working_tree_clean,
    )
    .is_empty()
}

/// Package files with `extension` in `output_dir`, symbol packages excluded
pub fn find_packages(output_dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let escaped = glob::Pattern::escape(&output_dir.to_string_lossy());
    let pattern = format!("{}/*.{}", escaped, extension);
    let symbols = format!(".symbols.{}", extension);

    let entries = glob::glob(&pattern)
        .map_err(|e| ReleaseError::config(format!("invalid package pattern '{}': {}", pattern, e)))?;

    let mut packages = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| ReleaseError::Io(e.into()))?;
        let is_symbols = path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().ends_with(&symbols));
        if !is_symbols {
            packages.push(path);
        }
    }
    packages.sort();
    Ok(packages)
}

/// Everything `publish` needs besides the repository
#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub configuration: String,
    pub release_configuration: String,
    pub output_dir: PathBuf,
    pub package_extension: String,
    pub source: String,
    pub api_key: Option<String>,
    pub tool: String,
}

/// Result of a publish invocation
#[derive(Debug, Clone, PartialEq)]
pub enum PublishOutcome {
    Skipped(Vec<GateWarning>),
    Pushed(Vec<PathBuf>),
}

/// Push every package in the output directory, if the gate allows it
pub fn publish<R: CommandRunner>(
    repo: &RepositoryHandle<R>,
    request: &PublishRequest,
) -> Result<PublishOutcome> {
    let branch = repo.current_branch()?;
    let clean = repo.is_clean()?;

    let warnings = gate_warnings(
        &branch,
        &request.configuration,
        &request.release_configuration,
        clean,
    );
    if !warnings.is_empty() {
        info!(branch = %branch.name, configuration = %request.configuration, "publish skipped");
        return Ok(PublishOutcome::Skipped(warnings));
    }

    let api_key = request
        .api_key
        .as_deref()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| ReleaseError::config("an API key is required to publish packages"))?;

    let packages = find_packages(&request.output_dir, &request.package_extension)?;
    if packages.is_empty() {
        return Err(ReleaseError::config(format!(
            "no *.{} packages found in {}",
            request.package_extension,
            request.output_dir.display()
        )));
    }

    for package in &packages {
        info!(package = %package.display(), source = %request.source, "pushing package");
        let command = ToolCommand::new(&request.tool)
            .args(["nuget", "push"])
            .arg(package.to_string_lossy())
            .args(["--source", request.source.as_str(), "--api-key", api_key]);

        run_checked(repo.runner(), &command)
            .map_err(|e| redact(e, api_key).in_step(ReleaseStep::PushPackage))?;
    }

    Ok(PublishOutcome::Pushed(packages))
}

fn redact(error: ReleaseError, secret: &str) -> ReleaseError {
    match error {
        ReleaseError::ExternalToolFailure {
            command,
            exit_code,
            output,
        } => ReleaseError::ExternalToolFailure {
            command: command.replace(secret, "***"),
            exit_code,
            output: output
                .into_iter()
                .map(|line| line.replace(secret, "***"))
                .collect(),
        },
        other => other,
    }
}

/// Reinstall `product` as a global tool from the local output directory.
///
/// The uninstall is best-effort: it fails whenever the tool was not
/// installed yet.
pub fn install_tool<R: CommandRunner>(
    runner: &R,
    tool: &str,
    product: &str,
    output_dir: &Path,
    version: &str,
) -> Result<()> {
    let uninstall = ToolCommand::new(tool).args(["tool", "uninstall", "-g", product]);
    if !try_run(runner, &uninstall)? {
        warn!(product, "uninstall failed; continuing with install");
    }

    let install = ToolCommand::new(tool)
        .args(["tool", "install", "-g", product, "--add-source"])
        .arg(output_dir.to_string_lossy())
        .args(["--version", version]);
    run_checked(runner, &install)
        .map(drop)
        .map_err(|e| e.in_step(ReleaseStep::Install))
}
