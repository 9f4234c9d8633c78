//! Package version resolution.
//!
//! The package version depends only on the release base version, the current
//! branch and the CI context:
//!
//! | branch | CI build `n` | local |
//! |---|---|---|
//! | master | `X.Y.Z.n` | `X.Y.Z-local` |
//! | develop | `X.Y.Z-devn` | `X.Y.Z-dev-local` |
//! | other `a/b` | `X.Y.Z-a-bn` | `X.Y.Z-a-b-local` |
//!
//! The informational version appends the short commit id.

use crate::ci::CiContext;
use crate::domain::{Branch, BranchKind, ReleaseVersion};
use crate::error::{ReleaseError, Result};
use crate::git::RepositoryHandle;
use crate::runner::CommandRunner;
use tracing::debug;

/// Resolved versions for one build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    pub release: ReleaseVersion,
    pub nuget: String,
    pub informational: String,
}

/// Package version for `base` built from `branch`
pub fn nuget_version(base: &ReleaseVersion, branch: &Branch, ci: &CiContext) -> String {
    match (branch.kind, ci) {
        (BranchKind::Master, CiContext::Ci { build_number }) => {
            format!("{}.{}", base, build_number)
        }
        (BranchKind::Master, CiContext::Local) => format!("{}-local", base),
        (_, CiContext::Ci { build_number }) => {
            format!("{}-{}{}", base, branch.qualifier(), build_number)
        }
        (_, CiContext::Local) => format!("{}-{}-local", base, branch.qualifier()),
    }
}

/// Informational version: the package version plus the source commit
pub fn informational_version(nuget_version: &str, short_commit_id: &str) -> String {
    format!("{}.{}", nuget_version, short_commit_id)
}

/// Resolve both versions for a known commit id
pub fn resolve_with_commit(
    base: &ReleaseVersion,
    branch: &Branch,
    ci: &CiContext,
    short_commit_id: &str,
) -> VersionInfo {
    let nuget = nuget_version(base, branch, ci);
    let informational = informational_version(&nuget, short_commit_id);
    VersionInfo {
        release: *base,
        nuget,
        informational,
    }
}

/// Resolve versions for the current checkout.
///
/// Queries git for the short commit id; fails with
/// [crate::error::ReleaseError::VersionResolution] unless git answers with
/// exactly one line.
pub fn resolve<R: CommandRunner>(
    base: &ReleaseVersion,
    branch: &Branch,
    ci: &CiContext,
    repo: &RepositoryHandle<R>,
) -> Result<VersionInfo> {
    let commit = repo.short_commit_id()?;
    let info = resolve_with_commit(base, branch, ci, &commit);
    debug!(nuget = %info.nuget, informational = %info.informational, "resolved versions");
    Ok(info)
}

/// Resolve versions for whatever is checked out.
///
/// The commit id is queried before the branch, and any failure to read either
/// from git is a [ReleaseError::VersionResolution].
pub fn resolve_current<R: CommandRunner>(
    base: &ReleaseVersion,
    ci: &CiContext,
    repo: &RepositoryHandle<R>,
) -> Result<VersionInfo> {
    let commit = repo.short_commit_id()?;
    let branch = repo
        .current_branch()
        .map_err(|e| ReleaseError::version(format!("cannot determine current branch: {}", e)))?;
    let info = resolve_with_commit(base, &branch, ci, &commit);
    debug!(branch = %branch.name, nuget = %info.nuget, "resolved versions for checkout");
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BranchConventions;
    use crate::error::ReleaseError;
    use crate::runner::{CommandOutput, MockRunner};

    fn base() -> ReleaseVersion {
        ReleaseVersion::new(1, 2, 3)
    }

    fn branch(name: &str) -> Branch {
        BranchConventions::default().classify(name)
    }

    #[test]
    fn test_master_ci() {
        assert_eq!(
            nuget_version(&base(), &branch("master"), &CiContext::ci("45")),
            "1.2.3.45"
        );
    }

    #[test]
    fn test_master_local() {
        assert_eq!(
            nuget_version(&base(), &branch("master"), &CiContext::Local),
            "1.2.3-local"
        );
    }

    #[test]
    fn test_develop_ci() {
        assert_eq!(
            nuget_version(&base(), &branch("develop"), &CiContext::ci("7")),
            "1.2.3-dev7"
        );
    }

    #[test]
    fn test_develop_local() {
        assert_eq!(
            nuget_version(&base(), &branch("develop"), &CiContext::Local),
            "1.2.3-dev-local"
        );
    }

    #[test]
    fn test_feature_branch_local() {
        assert_eq!(
            nuget_version(&base(), &branch("feature/foo"), &CiContext::Local),
            "1.2.3-feature-foo-local"
        );
    }

    #[test]
    fn test_release_branch_ci() {
        assert_eq!(
            nuget_version(&base(), &branch("release/1.2.3"), &CiContext::ci("12")),
            "1.2.3-release-1.2.312"
        );
    }

    #[test]
    fn test_master_is_case_insensitive() {
        assert_eq!(
            nuget_version(&base(), &branch("Master"), &CiContext::ci("3")),
            "1.2.3.3"
        );
    }

    #[test]
    fn test_empty_branch_name() {
        assert_eq!(
            nuget_version(&base(), &branch(""), &CiContext::Local),
            "1.2.3--local"
        );
    }

    #[test]
    fn test_deterministic() {
        let inputs = [
            ("master", CiContext::ci("1")),
            ("develop", CiContext::Local),
            ("feature/a/b", CiContext::ci("99")),
        ];
        for (name, ci) in inputs {
            let first = resolve_with_commit(&base(), &branch(name), &ci, "abc1234");
            let second = resolve_with_commit(&base(), &branch(name), &ci, "abc1234");
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_informational_version() {
        let info = resolve_with_commit(&base(), &branch("master"), &CiContext::ci("45"), "abc1234");
        assert_eq!(info.nuget, "1.2.3.45");
        assert_eq!(info.informational, "1.2.3.45.abc1234");
        assert_eq!(info.release, base());
    }

    #[test]
    fn test_resolve_queries_commit_id() {
        let runner = MockRunner::new().on(["rev-parse", "--short"], CommandOutput::success(["f00ba47"]));
        let repo = RepositoryHandle::new(runner, BranchConventions::default());
        let info = resolve(&base(), &branch("develop"), &CiContext::ci("7"), &repo).unwrap();
        assert_eq!(info.informational, "1.2.3-dev7.f00ba47");
    }

    #[test]
    fn test_resolve_fails_without_single_commit_line() {
        let runner = MockRunner::new().on(
            ["rev-parse", "--short"],
            CommandOutput::success(["f00ba47", "extra"]),
        );
        let repo = RepositoryHandle::new(runner, BranchConventions::default());
        let err = resolve(&base(), &branch("develop"), &CiContext::Local, &repo).unwrap_err();
        assert!(matches!(err, ReleaseError::VersionResolution(_)));
    }
}
