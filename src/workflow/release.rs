use crate::changelog::ChangelogGateway;
use crate::domain::{Branch, ReleaseVersion};
use crate::error::{ReleaseError, ReleaseStep, Result};
use crate::git::{RepositoryHandle, RepositoryMetadata};
use crate::runner::CommandRunner;
use crate::workflow::state::{execution_plan, Target, WorkflowState};
use std::path::PathBuf;
use tracing::{info, warn};

/// Inputs of one workflow invocation
#[derive(Debug, Clone)]
pub struct ReleaseSettings {
    pub version: ReleaseVersion,
    pub changelog: PathBuf,
    pub remote: String,
    /// Hosting metadata for changelog compare links, when known
    pub repository: Option<RepositoryMetadata>,
    /// Evaluate preconditions and record planned mutations without running them
    pub dry_run: bool,
}

/// Terminal success of the release target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// A new release branch was created from develop
    Started { branch: String },
    /// A release or hotfix branch was merged, tagged, deleted and pushed
    Finished { source_branch: String, tag: String },
}

/// GitFlow release state machine.
///
/// Queries the repository fresh wherever the answer may have changed, never
/// rolls back, and records every state it passes through.
pub struct ReleaseWorkflow<'a, R: CommandRunner, G: ChangelogGateway> {
    repo: &'a RepositoryHandle<R>,
    changelog: &'a G,
    settings: ReleaseSettings,
    trace: Vec<WorkflowState>,
    planned: Vec<String>,
}

impl<'a, R: CommandRunner, G: ChangelogGateway> ReleaseWorkflow<'a, R, G> {
    pub fn new(repo: &'a RepositoryHandle<R>, changelog: &'a G, settings: ReleaseSettings) -> Self {
        ReleaseWorkflow {
            repo,
            changelog,
            settings,
            trace: vec![WorkflowState::Idle],
            planned: Vec::new(),
        }
    }

    /// Current state
    pub fn state(&self) -> WorkflowState {
        self.trace
            .last()
            .copied()
            .unwrap_or(WorkflowState::Idle)
    }

    /// Every state entered so far, starting with `Idle`
    pub fn trace(&self) -> &[WorkflowState] {
        &self.trace
    }

    /// Mutations skipped because of dry-run, in order
    pub fn planned(&self) -> &[String] {
        &self.planned
    }

    /// Finalize and commit the changelog
    pub fn run_changelog(&mut self) -> Result<()> {
        self.run(Target::Changelog, &[]).map(drop)
    }

    /// Run the release target, finalizing the changelog first unless
    /// `changelog_committed` says that already happened.
    pub fn run_release(&mut self, changelog_committed: bool) -> Result<ReleaseOutcome> {
        let skip: &[Target] = if changelog_committed {
            &[Target::Changelog]
        } else {
            &[]
        };

        match self.run(Target::Release, skip)? {
            Some(outcome) => Ok(outcome),
            None => Err(ReleaseError::config("release target did not run")),
        }
    }

    fn run(&mut self, target: Target, skip: &[Target]) -> Result<Option<ReleaseOutcome>> {
        let plan = execution_plan(target, skip);
        info!(plan = ?plan.iter().map(Target::name).collect::<Vec<_>>(), "running targets");

        let release_follows = plan.contains(&Target::Release);
        let mut outcome = None;
        for target in plan {
            let result = match target {
                Target::Changelog => self.changelog_target(release_follows).map(|()| None),
                Target::Release => self.release_target().map(Some),
            };

            match result {
                Ok(Some(done)) => outcome = Some(done),
                Ok(None) => {}
                Err(e) => {
                    let terminal = if e.is_aborted() {
                        WorkflowState::Aborted
                    } else {
                        WorkflowState::Failed
                    };
                    warn!(workflow_target = target.name(), state = %terminal, error = %e, "workflow stopped");
                    self.enter(terminal);
                    return Err(e);
                }
            }
        }

        Ok(outcome)
    }

    fn enter(&mut self, state: WorkflowState) {
        info!(from = %self.state(), to = %state, "transition");
        self.trace.push(state);
    }

    fn mutate<F>(&mut self, step: ReleaseStep, description: String, action: F) -> Result<()>
    where
        F: FnOnce() -> Result<()>,
    {
        if self.settings.dry_run {
            info!(step = %step, "dry run: {}", description);
            self.planned.push(description);
            return Ok(());
        }
        action().map_err(|e| e.in_step(step))
    }

    /// With `release_follows`, the release target's clean-tree requirement is
    /// checked up front so a dirty tree aborts before the changelog commit.
    fn changelog_target(&mut self, release_follows: bool) -> Result<()> {
        let repo = self.repo;
        let changelog = self.changelog;
        let conventions = repo.conventions();

        let branch = repo.current_branch()?;
        if !branch.is_release_or_hotfix() {
            return Err(ReleaseError::precondition(format!(
                "branch must be {}/* or {}/* (current: '{}')",
                conventions.release_prefix, conventions.hotfix_prefix, branch.name
            )));
        }

        let path = self.settings.changelog.clone();
        if !repo.staged_changes_within(&[path.as_path()])? {
            return Err(ReleaseError::precondition(format!(
                "changes other than {} are already staged",
                path.display()
            )));
        }

        if release_follows && !repo.is_clean_except(&[path.as_path()])? {
            return Err(ReleaseError::precondition(format!(
                "working copy not clean (only {} may be modified)",
                path.display()
            )));
        }

        self.enter(WorkflowState::ChangelogFinalizing);

        let version = self.settings.version;
        let path_text = path.to_string_lossy().to_string();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path_text.clone());
        let message = format!("Finalize {} for {}", file_name, version);
        let metadata = self.settings.repository.clone();

        self.mutate(
            ReleaseStep::FinalizeChangelog,
            format!("finalize {} as {}", path_text, version),
            || changelog.finalize(&path, &version, metadata.as_ref()),
        )?;
        self.mutate(
            ReleaseStep::CommitChangelog,
            format!("git add {}", path_text),
            || repo.add(&path_text),
        )?;
        self.mutate(
            ReleaseStep::CommitChangelog,
            format!("git commit -m \"{}\"", message),
            || repo.commit(&message),
        )?;

        self.enter(WorkflowState::ChangelogCommitted);
        Ok(())
    }

    fn release_target(&mut self) -> Result<ReleaseOutcome> {
        if self.state() == WorkflowState::Idle {
            // changelog committed by an earlier invocation
            self.enter(WorkflowState::ChangelogCommitted);
        }

        // Re-query: the changelog commit just changed the working tree.
        if !self.repo.is_clean()? {
            return Err(ReleaseError::precondition("working copy not clean"));
        }

        let branch = self.repo.current_branch()?;
        if self.repo.conventions().is_finishable(&branch) {
            self.finish(branch)
        } else {
            self.start()
        }
    }

    fn start(&mut self) -> Result<ReleaseOutcome> {
        self.enter(WorkflowState::ReleaseBranchCreating);

        let repo = self.repo;
        let conventions = repo.conventions();
        let name = conventions.release_branch_for(&self.settings.version.to_string());
        let develop = conventions.develop.clone();

        self.mutate(
            ReleaseStep::CreateReleaseBranch,
            format!("git checkout -b {} {}", name, develop),
            || repo.create_branch(&name, &develop),
        )?;

        self.enter(WorkflowState::Idle);
        info!(branch = %name, "release branch started");
        Ok(ReleaseOutcome::Started { branch: name })
    }

    fn finish(&mut self, source: Branch) -> Result<ReleaseOutcome> {
        self.enter(WorkflowState::ReleaseFinishing);

        let repo = self.repo;
        let master = repo.conventions().master.clone();
        let develop = repo.conventions().develop.clone();
        let remote = self.settings.remote.clone();
        let tag = self.settings.version.to_string();
        let source = source.name;

        // master is merged and tagged strictly before develop moves
        self.mutate(
            ReleaseStep::CheckoutMaster,
            format!("git checkout {}", master),
            || repo.checkout(&master),
        )?;
        self.mutate(
            ReleaseStep::MergeIntoMaster,
            format!("git merge --no-ff --no-edit {}", source),
            || repo.merge_no_ff(&source),
        )?;
        self.mutate(ReleaseStep::Tag, format!("git tag {}", tag), || {
            repo.tag(&tag)
        })?;
        self.mutate(
            ReleaseStep::CheckoutDevelop,
            format!("git checkout {}", develop),
            || repo.checkout(&develop),
        )?;
        self.mutate(
            ReleaseStep::MergeIntoDevelop,
            format!("git merge --no-ff --no-edit {}", source),
            || repo.merge_no_ff(&source),
        )?;

        self.enter(WorkflowState::Merged);
        self.enter(WorkflowState::Tagged);

        self.mutate(
            ReleaseStep::DeleteBranch,
            format!("git branch -D {}", source),
            || repo.delete_branch(&source),
        )?;
        self.mutate(
            ReleaseStep::Push,
            format!("git push {} {} {} {}", remote, master, develop, tag),
            || repo.push(&remote, &[master.as_str(), develop.as_str(), tag.as_str()]),
        )?;

        self.enter(WorkflowState::Pushed);
        info!(source = %source, tag = %tag, "release finished");
        Ok(ReleaseOutcome::Finished {
            source_branch: source,
            tag,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BranchConventions;
    use crate::runner::{CommandOutput, MockRunner};
    use std::cell::RefCell;
    use std::path::Path;

    #[derive(Default)]
    struct RecordingChangelog {
        finalized: RefCell<Vec<String>>,
    }

    impl ChangelogGateway for RecordingChangelog {
        fn release_notes(&self, _path: &Path) -> Result<Vec<String>> {
            Ok(vec!["- note".to_string()])
        }

        fn finalize(
            &self,
            _path: &Path,
            version: &ReleaseVersion,
            _repository: Option<&RepositoryMetadata>,
        ) -> Result<()> {
            self.finalized.borrow_mut().push(version.to_string());
            Ok(())
        }
    }

    fn settings() -> ReleaseSettings {
        ReleaseSettings {
            version: ReleaseVersion::new(1, 2, 3),
            changelog: PathBuf::from("CHANGELOG.md"),
            remote: "origin".to_string(),
            repository: None,
            dry_run: false,
        }
    }

    fn on_branch(name: &str) -> MockRunner {
        MockRunner::new().on(
            ["rev-parse", "--abbrev-ref", "HEAD"],
            CommandOutput::success([name]),
        )
    }

    #[test]
    fn test_changelog_commits_with_fixed_message() {
        let repo = RepositoryHandle::new(on_branch("release/1.2.3"), BranchConventions::default());
        let changelog = RecordingChangelog::default();
        let mut workflow = ReleaseWorkflow::new(&repo, &changelog, settings());

        workflow.run_changelog().unwrap();

        assert_eq!(changelog.finalized.borrow().as_slice(), ["1.2.3"]);
        let calls = repo.runner().call_lines();
        assert!(calls.contains(&"git add CHANGELOG.md".to_string()));
        assert!(calls.contains(&"git commit -m \"Finalize CHANGELOG.md for 1.2.3\"".to_string()));
        assert_eq!(
            workflow.trace(),
            [
                WorkflowState::Idle,
                WorkflowState::ChangelogFinalizing,
                WorkflowState::ChangelogCommitted
            ]
        );
    }

    #[test]
    fn test_changelog_uses_file_name_in_message() {
        let repo = RepositoryHandle::new(on_branch("hotfix/1.2.3"), BranchConventions::default());
        let changelog = RecordingChangelog::default();
        let mut config = settings();
        config.changelog = PathBuf::from("docs/CHANGES.md");
        let mut workflow = ReleaseWorkflow::new(&repo, &changelog, config);

        workflow.run_changelog().unwrap();
        assert!(repo
            .runner()
            .call_lines()
            .contains(&"git commit -m \"Finalize CHANGES.md for 1.2.3\"".to_string()));
    }

    #[test]
    fn test_changelog_requires_release_or_hotfix_branch() {
        let repo = RepositoryHandle::new(on_branch("develop"), BranchConventions::default());
        let changelog = RecordingChangelog::default();
        let mut workflow = ReleaseWorkflow::new(&repo, &changelog, settings());

        let err = workflow.run_changelog().unwrap_err();
        assert!(matches!(err, ReleaseError::PreconditionFailed(_)));
        assert!(err.to_string().contains("release/* or hotfix/*"));
        assert_eq!(workflow.state(), WorkflowState::Aborted);
        assert!(changelog.finalized.borrow().is_empty());
    }

    #[test]
    fn test_changelog_refuses_unrelated_staged_files() {
        let runner = on_branch("release/1.2.3").on(
            ["diff", "--cached", "--name-only"],
            CommandOutput::success(["CHANGELOG.md", "src/lib.rs"]),
        );
        let repo = RepositoryHandle::new(runner, BranchConventions::default());
        let changelog = RecordingChangelog::default();
        let mut workflow = ReleaseWorkflow::new(&repo, &changelog, settings());

        let err = workflow.run_changelog().unwrap_err();
        assert!(err.to_string().contains("already staged"));
        assert_eq!(repo.runner().count(&["commit"]), 0);
    }

    #[test]
    fn test_commit_failure_is_failed_state() {
        let runner = on_branch("release/1.2.3")
            .on(["commit"], CommandOutput::failure(1, ["nothing to commit"]));
        let repo = RepositoryHandle::new(runner, BranchConventions::default());
        let changelog = RecordingChangelog::default();
        let mut workflow = ReleaseWorkflow::new(&repo, &changelog, settings());

        let err = workflow.run_changelog().unwrap_err();
        assert_eq!(err.step(), Some(ReleaseStep::CommitChangelog));
        assert_eq!(workflow.state(), WorkflowState::Failed);
    }

    #[test]
    fn test_dry_run_plans_without_mutating() {
        let repo = RepositoryHandle::new(on_branch("release/1.2.3"), BranchConventions::default());
        let changelog = RecordingChangelog::default();
        let mut config = settings();
        config.dry_run = true;
        let mut workflow = ReleaseWorkflow::new(&repo, &changelog, config);

        let outcome = workflow.run_release(false).unwrap();
        assert_eq!(
            outcome,
            ReleaseOutcome::Finished {
                source_branch: "release/1.2.3".to_string(),
                tag: "1.2.3".to_string()
            }
        );
        assert!(changelog.finalized.borrow().is_empty());
        for mutating in ["add", "commit", "checkout", "merge", "tag", "branch", "push"] {
            assert_eq!(repo.runner().count(&[mutating]), 0, "{mutating} ran in dry run");
        }
        assert_eq!(workflow.planned().len(), 10);
        assert_eq!(workflow.planned()[9], "git push origin master develop 1.2.3");
    }
}
