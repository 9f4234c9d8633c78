use std::fmt;

/// Non-fatal conditions reported to the user instead of failing the run.
#[derive(Debug, Clone, PartialEq)]
pub enum GateWarning {
    /// Packages are only published from master or develop
    BranchNotPublishable { branch: String },
    /// Packages are only published from the release build configuration
    ConfigurationNotRelease {
        configuration: String,
        expected: String,
    },
    /// Uncommitted changes would not be reflected in the published version
    WorkingTreeDirty,
    /// Local release is finished but the remote was not updated
    PushPending { remote: String, refs: Vec<String> },
}

impl fmt::Display for GateWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateWarning::BranchNotPublishable { branch } => {
                let shown = if branch.is_empty() { "(none)" } else { branch };
                write!(
                    f,
                    "Branch '{}' is not master or develop; skipping publish",
                    shown
                )
            }
            GateWarning::ConfigurationNotRelease {
                configuration,
                expected,
            } => write!(
                f,
                "Configuration '{}' is not '{}'; skipping publish",
                configuration, expected
            ),
            GateWarning::WorkingTreeDirty => {
                write!(f, "Working copy has uncommitted changes; skipping publish")
            }
            GateWarning::PushPending { remote, refs } => write!(
                f,
                "Release finished locally but not pushed to '{}' ({})",
                remote,
                refs.join(" ")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_warning_display() {
        let warning = GateWarning::BranchNotPublishable {
            branch: "feature/x".to_string(),
        };
        assert!(warning.to_string().contains("'feature/x'"));
    }

    #[test]
    fn test_empty_branch_display() {
        let warning = GateWarning::BranchNotPublishable {
            branch: String::new(),
        };
        assert!(warning.to_string().contains("(none)"));
    }

    #[test]
    fn test_push_pending_lists_refs() {
        let warning = GateWarning::PushPending {
            remote: "origin".to_string(),
            refs: vec!["master".into(), "develop".into(), "1.2.3".into()],
        };
        assert_eq!(
            warning.to_string(),
            "Release finished locally but not pushed to 'origin' (master develop 1.2.3)"
        );
    }
}
