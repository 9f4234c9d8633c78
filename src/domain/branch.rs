/// GitFlow role of a branch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchKind {
    Master,
    Develop,
    ReleaseCandidate,
    Hotfix,
    Other,
}

/// A branch name together with its classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub name: String,
    pub kind: BranchKind,
}

impl Branch {
    /// True for release/* and hotfix/* branches
    pub fn is_release_or_hotfix(&self) -> bool {
        matches!(self.kind, BranchKind::ReleaseCandidate | BranchKind::Hotfix)
    }

    /// Version qualifier for this branch: `dev` on develop, otherwise the
    /// branch name with path separators flattened to dashes.
    pub fn qualifier(&self) -> String {
        match self.kind {
            BranchKind::Develop => "dev".to_string(),
            _ => self.name.replace('/', "-"),
        }
    }
}

/// Branch naming conventions used to classify branch names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchConventions {
    pub master: String,
    pub develop: String,
    pub release_prefix: String,
    pub hotfix_prefix: String,
}

impl Default for BranchConventions {
    fn default() -> Self {
        BranchConventions {
            master: "master".to_string(),
            develop: "develop".to_string(),
            release_prefix: "release".to_string(),
            hotfix_prefix: "hotfix".to_string(),
        }
    }
}

impl BranchConventions {
    /// Classify a branch name.
    ///
    /// Master and develop match exactly, ignoring case. Release and hotfix
    /// branches match `{prefix}/` ordinally. Checked in that order, so the
    /// result is total and unique.
    pub fn classify(&self, name: &str) -> Branch {
        let kind = if name.eq_ignore_ascii_case(&self.master) {
            BranchKind::Master
        } else if name.eq_ignore_ascii_case(&self.develop) {
            BranchKind::Develop
        } else if has_prefix(name, &self.release_prefix) {
            BranchKind::ReleaseCandidate
        } else if has_prefix(name, &self.hotfix_prefix) {
            BranchKind::Hotfix
        } else {
            BranchKind::Other
        };

        Branch {
            name: name.to_string(),
            kind,
        }
    }

    /// Whether running a release on `branch` finishes it instead of starting
    /// a new release branch.
    ///
    /// Unlike [BranchConventions::classify], the release prefix matches
    /// ignoring ASCII case here, so `Release/1.2.3` is finished too.
    pub fn is_finishable(&self, branch: &Branch) -> bool {
        branch.is_release_or_hotfix()
            || (branch.kind == BranchKind::Other
                && has_prefix_ignore_case(&branch.name, &self.release_prefix))
    }

    /// Name of the branch a new release is started on
    pub fn release_branch_for(&self, version: &str) -> String {
        format!("{}/{}", self.release_prefix, version)
    }
}

fn has_prefix(name: &str, prefix: &str) -> bool {
    !prefix.is_empty()
        && name
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

fn has_prefix_ignore_case(name: &str, prefix: &str) -> bool {
    !prefix.is_empty()
        && name
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
        && name[prefix.len()..].starts_with('/')
}
