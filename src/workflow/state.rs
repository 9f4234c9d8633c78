use std::fmt;

/// States of one release workflow invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    ChangelogFinalizing,
    ChangelogCommitted,
    ReleaseBranchCreating,
    ReleaseFinishing,
    Merged,
    Tagged,
    Pushed,
    /// A precondition did not hold; nothing was mutated
    Aborted,
    /// An external tool failed mid-mutation; repository left as the tool left it
    Failed,
}

impl WorkflowState {
    pub fn is_failure(&self) -> bool {
        matches!(self, WorkflowState::Aborted | WorkflowState::Failed)
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkflowState::Idle => "idle",
            WorkflowState::ChangelogFinalizing => "changelog-finalizing",
            WorkflowState::ChangelogCommitted => "changelog-committed",
            WorkflowState::ReleaseBranchCreating => "release-branch-creating",
            WorkflowState::ReleaseFinishing => "release-finishing",
            WorkflowState::Merged => "merged",
            WorkflowState::Tagged => "tagged",
            WorkflowState::Pushed => "pushed",
            WorkflowState::Aborted => "aborted",
            WorkflowState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Workflow targets a driver can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Changelog,
    Release,
}

impl Target {
    /// Targets that must complete before this one
    pub fn prerequisites(&self) -> &'static [Target] {
        match self {
            Target::Changelog => &[],
            Target::Release => &[Target::Changelog],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Target::Changelog => "changelog",
            Target::Release => "release",
        }
    }
}

/// Linear order in which to run `target` and its prerequisites.
///
/// Each target appears once, after all of its prerequisites. Targets listed in
/// `skip` are treated as already completed.
pub fn execution_plan(target: Target, skip: &[Target]) -> Vec<Target> {
    fn visit(target: Target, skip: &[Target], plan: &mut Vec<Target>) {
        if skip.contains(&target) || plan.contains(&target) {
            return;
        }
        for prerequisite in target.prerequisites() {
            visit(*prerequisite, skip, plan);
        }
        plan.push(target);
    }

    let mut plan = Vec::new();
    visit(target, skip, &mut plan);
    plan
}
