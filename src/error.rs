use std::fmt;

use thiserror::Error;

/// Exit code for a run that stopped before mutating anything.
pub const EXIT_ABORTED: i32 = 2;

/// Exit code for a run where an external tool failed mid-mutation.
pub const EXIT_FAILED: i32 = 1;

/// Workflow sub-steps that touch the repository or the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseStep {
    FinalizeChangelog,
    CommitChangelog,
    CreateReleaseBranch,
    CheckoutMaster,
    MergeIntoMaster,
    Tag,
    CheckoutDevelop,
    MergeIntoDevelop,
    DeleteBranch,
    Push,
    PushPackage,
    Install,
}

impl fmt::Display for ReleaseStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReleaseStep::FinalizeChangelog => "finalize changelog",
            ReleaseStep::CommitChangelog => "commit changelog",
            ReleaseStep::CreateReleaseBranch => "create release branch",
            ReleaseStep::CheckoutMaster => "checkout master",
            ReleaseStep::MergeIntoMaster => "merge into master",
            ReleaseStep::Tag => "tag",
            ReleaseStep::CheckoutDevelop => "checkout develop",
            ReleaseStep::MergeIntoDevelop => "merge into develop",
            ReleaseStep::DeleteBranch => "delete branch",
            ReleaseStep::Push => "push",
            ReleaseStep::PushPackage => "push package",
            ReleaseStep::Install => "install",
        };
        f.write_str(name)
    }
}

/// Unified error type for release operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("External tool failed: `{command}` exited with code {exit_code}{}", format_output(.output))]
    ExternalToolFailure {
        command: String,
        exit_code: i32,
        output: Vec<String>,
    },

    #[error("Step '{step}' failed")]
    Step {
        step: ReleaseStep,
        #[source]
        source: Box<ReleaseError>,
    },

    #[error("Version resolution error: {0}")]
    VersionResolution(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Changelog error: {0}")]
    Changelog(String),

    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_output(output: &[String]) -> String {
    if output.is_empty() {
        String::new()
    } else {
        format!("\n{}", output.join("\n"))
    }
}

/// Convenience type alias for Results in gitflow-release
pub type Result<T> = std::result::Result<T, ReleaseError>;

impl ReleaseError {
    /// Create a precondition failure naming the predicate that did not hold
    pub fn precondition(msg: impl Into<String>) -> Self {
        ReleaseError::PreconditionFailed(msg.into())
    }

    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        ReleaseError::Configuration(msg.into())
    }

    /// Create a version resolution error with context
    pub fn version(msg: impl Into<String>) -> Self {
        ReleaseError::VersionResolution(msg.into())
    }

    /// Create a changelog error with context
    pub fn changelog(msg: impl Into<String>) -> Self {
        ReleaseError::Changelog(msg.into())
    }

    /// Attach the workflow step this error happened in
    pub fn in_step(self, step: ReleaseStep) -> Self {
        ReleaseError::Step {
            step,
            source: Box::new(self),
        }
    }

    /// The step a failure is scoped to, if any
    pub fn step(&self) -> Option<ReleaseStep> {
        match self {
            ReleaseError::Step { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// The innermost error, with step scoping peeled off
    pub fn root(&self) -> &ReleaseError {
        match self {
            ReleaseError::Step { source, .. } => source.root(),
            other => other,
        }
    }

    /// True when the run stopped before any mutation (safe to retry unchanged)
    pub fn is_aborted(&self) -> bool {
        matches!(
            self.root(),
            ReleaseError::PreconditionFailed(_)
                | ReleaseError::Configuration(_)
                | ReleaseError::VersionResolution(_)
        )
    }

    /// True when only the final push failed; local state is fully finished
    pub fn is_recoverable(&self) -> bool {
        self.step() == Some(ReleaseStep::Push)
            && matches!(self.root(), ReleaseError::ExternalToolFailure { .. })
    }

    /// Process exit code distinguishing Aborted from Failed
    pub fn exit_code(&self) -> i32 {
        if self.is_aborted() {
            EXIT_ABORTED
        } else {
            EXIT_FAILED
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool_failure() -> ReleaseError {
        ReleaseError::ExternalToolFailure {
            command: "git push origin master develop 1.2.3".to_string(),
            exit_code: 128,
            output: vec!["fatal: could not read from remote".to_string()],
        }
    }

    #[test]
    fn test_error_display() {
        let err = ReleaseError::config("release version is required");
        assert_eq!(
            err.to_string(),
            "Configuration error: release version is required"
        );
    }

    #[test]
    fn test_tool_failure_display_includes_command_and_output() {
        let msg = tool_failure().to_string();
        assert!(msg.contains("`git push origin master develop 1.2.3`"));
        assert!(msg.contains("code 128"));
        assert!(msg.contains("could not read from remote"));
    }

    #[test]
    fn test_tool_failure_without_output() {
        let err = ReleaseError::ExternalToolFailure {
            command: "git tag 1.0.0".to_string(),
            exit_code: 1,
            output: Vec::new(),
        };
        assert!(err.to_string().ends_with("exited with code 1"));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(ReleaseError::precondition("x").exit_code(), EXIT_ABORTED);
        assert_eq!(ReleaseError::config("x").exit_code(), EXIT_ABORTED);
        assert_eq!(ReleaseError::version("x").exit_code(), EXIT_ABORTED);
        assert_eq!(tool_failure().exit_code(), EXIT_FAILED);
        assert_eq!(ReleaseError::changelog("x").exit_code(), EXIT_FAILED);
    }

    #[test]
    fn test_step_scoping() {
        let err = tool_failure().in_step(ReleaseStep::MergeIntoMaster);
        assert_eq!(err.step(), Some(ReleaseStep::MergeIntoMaster));
        assert!(matches!(err.root(), ReleaseError::ExternalToolFailure { .. }));
        assert!(err.to_string().starts_with("Step 'merge into master' failed"));
        assert_eq!(err.exit_code(), EXIT_FAILED);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_only_push_failures_are_recoverable() {
        assert!(tool_failure().in_step(ReleaseStep::Push).is_recoverable());
        assert!(!tool_failure().is_recoverable());
        assert!(!ReleaseError::precondition("x")
            .in_step(ReleaseStep::Push)
            .is_recoverable());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ReleaseError = io_err.into();
        assert!(err.to_string().contains("I/O error"));
        assert_eq!(err.exit_code(), EXIT_FAILED);
    }
}
