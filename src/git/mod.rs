//! Repository access through the git command line
//!
//! [RepositoryHandle] is passed explicitly into every workflow step. It never
//! caches: each query runs git again, so callers decide where freshness
//! matters (for example re-checking cleanliness right after a commit).
//!
//! Mutations are limited to the small, fixed vocabulary the release workflow
//! needs: add, commit, checkout, branch creation/deletion, merge, tag, push.

pub mod metadata;

pub use metadata::RepositoryMetadata;

use crate::domain::{Branch, BranchConventions};
use crate::error::{ReleaseError, Result};
use crate::runner::{run_checked, CommandRunner, ToolCommand};
use std::path::Path;
use tracing::{debug, info};

/// Snapshot of the repository taken at one point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryStatus {
    pub branch: Branch,
    /// No modified, staged or untracked files
    pub clean: bool,
    /// Every staged path is in the allowlist passed to [RepositoryHandle::status]
    pub staged_within_allowlist: bool,
    /// Clean apart from paths in the allowlist
    pub clean_within_allowlist: bool,
}

/// Handle on the checked-out repository, backed by a [CommandRunner]
pub struct RepositoryHandle<R: CommandRunner> {
    runner: R,
    conventions: BranchConventions,
}

impl<R: CommandRunner> RepositoryHandle<R> {
    pub fn new(runner: R, conventions: BranchConventions) -> Self {
        RepositoryHandle {
            runner,
            conventions,
        }
    }

    pub fn conventions(&self) -> &BranchConventions {
        &self.conventions
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn git<const N: usize>(&self, args: [&str; N]) -> Result<Vec<String>> {
        run_checked(&self.runner, &ToolCommand::git(args))
    }

    /// Current branch, classified
    pub fn current_branch(&self) -> Result<Branch> {
        let lines = self.git(["rev-parse", "--abbrev-ref", "HEAD"])?;
        let name = match lines.as_slice() {
            [name] => name.trim(),
            _ => {
                return Err(ReleaseError::config(format!(
                    "cannot determine current branch: expected one line from git, got {}",
                    lines.len()
                )))
            }
        };
        let branch = self.conventions.classify(name);
        debug!(branch = %branch.name, kind = ?branch.kind, "current branch");
        Ok(branch)
    }

    /// True when `git status` reports nothing at all
    pub fn is_clean(&self) -> Result<bool> {
        let lines = self.git(["status", "--porcelain"])?;
        Ok(lines.iter().all(|line| line.trim().is_empty()))
    }

    /// Paths currently staged in the index
    pub fn staged_paths(&self) -> Result<Vec<String>> {
        let lines = self.git(["diff", "--cached", "--name-only"])?;
        Ok(lines
            .into_iter()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect())
    }

    /// True when nothing outside `allowlist` is staged.
    ///
    /// Git reports paths relative to the repository root, so an entry matches
    /// when either path ends with the other.
    pub fn staged_changes_within(&self, allowlist: &[&Path]) -> Result<bool> {
        Ok(self
            .staged_paths()?
            .iter()
            .all(|staged| is_allowed(staged, allowlist)))
    }

    /// Paths `git status` reports as modified, staged or untracked
    pub fn changed_paths(&self) -> Result<Vec<String>> {
        let lines = self.git(["status", "--porcelain"])?;
        Ok(lines.iter().filter_map(|line| porcelain_path(line)).collect())
    }

    /// True when every change in the working copy is to a path in `allowlist`
    pub fn is_clean_except(&self, allowlist: &[&Path]) -> Result<bool> {
        Ok(self
            .changed_paths()?
            .iter()
            .all(|changed| is_allowed(changed, allowlist)))
    }

    /// Abbreviated id of HEAD.
    ///
    /// Git must answer with exactly one line; anything else means this is not a
    /// repository or the output is ambiguous.
    pub fn short_commit_id(&self) -> Result<String> {
        let output = self
            .runner
            .run(&ToolCommand::git(["rev-parse", "--short", "HEAD"]))?;

        match output.lines.as_slice() {
            [id] if output.is_success() && !id.trim().is_empty() => Ok(id.trim().to_string()),
            lines => Err(ReleaseError::version(format!(
                "expected exactly one commit id from `git rev-parse --short HEAD` (exit code {}), got {} line(s)",
                output.exit_code,
                lines.len()
            ))),
        }
    }

    /// Fresh snapshot of branch and working tree state
    pub fn status(&self, allowlist: &[&Path]) -> Result<RepositoryStatus> {
        Ok(RepositoryStatus {
            branch: self.current_branch()?,
            clean: self.is_clean()?,
            staged_within_allowlist: self.staged_changes_within(allowlist)?,
            clean_within_allowlist: self.is_clean_except(allowlist)?,
        })
    }

    pub fn add(&self, path: &str) -> Result<()> {
        info!(path, "git add");
        self.git(["add", path]).map(drop)
    }

    pub fn commit(&self, message: &str) -> Result<()> {
        info!(message, "git commit");
        self.git(["commit", "-m", message]).map(drop)
    }

    pub fn checkout(&self, branch: &str) -> Result<()> {
        info!(branch, "git checkout");
        self.git(["checkout", branch]).map(drop)
    }

    /// Create `name` from `start_point` and switch to it
    pub fn create_branch(&self, name: &str, start_point: &str) -> Result<()> {
        info!(branch = name, from = start_point, "git checkout -b");
        self.git(["checkout", "-b", name, start_point]).map(drop)
    }

    /// Merge with a merge commit and the default message
    pub fn merge_no_ff(&self, branch: &str) -> Result<()> {
        info!(branch, "git merge --no-ff");
        self.git(["merge", "--no-ff", "--no-edit", branch]).map(drop)
    }

    /// Create a lightweight tag on HEAD
    pub fn tag(&self, name: &str) -> Result<()> {
        info!(tag = name, "git tag");
        self.git(["tag", name]).map(drop)
    }

    /// Force-delete a local branch
    pub fn delete_branch(&self, name: &str) -> Result<()> {
        info!(branch = name, "git branch -D");
        self.git(["branch", "-D", name]).map(drop)
    }

    /// Push several refs to `remote` in one invocation
    pub fn push(&self, remote: &str, refs: &[&str]) -> Result<()> {
        info!(remote, refs = ?refs, "git push");
        let command = ToolCommand::git(["push", remote]).args(refs.iter().copied());
        run_checked(&self.runner, &command).map(drop)
    }
}

fn is_allowed(path: &str, allowlist: &[&Path]) -> bool {
    let path = Path::new(path);
    allowlist
        .iter()
        .any(|allowed| path.ends_with(allowed) || allowed.ends_with(path))
}

/// Path of one `git status --porcelain` line; renames yield the new path
fn porcelain_path(line: &str) -> Option<String> {
    let (_, path) = line.trim_start().split_once(char::is_whitespace)?;
    let path = path.trim();
    let path = path.rsplit_once(" -> ").map_or(path, |(_, to)| to);
    let path = path.trim_matches('"');
    (!path.is_empty()).then(|| path.to_string())
}
