use crate::error::{ReleaseError, Result};
use git2::Repository as Git2Repo;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static REMOTE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?:https?|ssh|git)://(?:[^@/]+@)?(?P<host>[^/:]+)(?::\d+)?/|[^@]+@(?P<scp_host>[^:]+):)(?P<owner>[^/]+(?:/[^/]+)*)/(?P<name>[^/]+?)(?:\.git)?/?$",
    )
    .expect("remote URL pattern is valid")
});

/// Hosting information for a repository, derived from a remote URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryMetadata {
    pub host: String,
    pub owner: String,
    pub name: String,
}

impl RepositoryMetadata {
    /// Discover the repository containing `path` and read `remote`'s URL.
    ///
    /// # Returns
    /// * `Ok(Some(_))` - The remote exists and its URL could be parsed
    /// * `Ok(None)` - No such remote, or the URL is not a recognised form
    /// * `Err` - `path` is not inside a git repository
    pub fn discover<P: AsRef<Path>>(path: P, remote: &str) -> Result<Option<Self>> {
        let repo = Git2Repo::discover(path)?;

        let remote = match repo.find_remote(remote) {
            Ok(remote) => remote,
            Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(ReleaseError::Git(e)),
        };

        Ok(remote.url().and_then(Self::from_url))
    }

    /// Parse https, ssh and scp-style remote URLs
    pub fn from_url(url: &str) -> Option<Self> {
        let caps = REMOTE_URL.captures(url.trim())?;
        let host = caps
            .name("host")
            .or_else(|| caps.name("scp_host"))?
            .as_str()
            .to_string();

        Some(RepositoryMetadata {
            host,
            owner: caps.name("owner")?.as_str().to_string(),
            name: caps.name("name")?.as_str().to_string(),
        })
    }

    /// Browsable base URL of the repository
    pub fn web_url(&self) -> String {
        format!("https://{}/{}/{}", self.host, self.owner, self.name)
    }

    /// URL comparing two refs
    pub fn compare_url(&self, base: &str, head: &str) -> String {
        format!("{}/compare/{}...{}", self.web_url(), base, head)
    }

    /// URL of the tree at a ref
    pub fn tree_url(&self, reference: &str) -> String {
        format!("{}/tree/{}", self.web_url(), reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_https_url() {
        let meta = RepositoryMetadata::from_url("https://github.com/acme/dotapi.git").unwrap();
        assert_eq!(meta.host, "github.com");
        assert_eq!(meta.owner, "acme");
        assert_eq!(meta.name, "dotapi");
    }

    #[test]
    fn test_scp_url() {
        let meta = RepositoryMetadata::from_url("git@github.com:acme/dotapi.git").unwrap();
        assert_eq!(meta.host, "github.com");
        assert_eq!(meta.owner, "acme");
        assert_eq!(meta.name, "dotapi");
    }

    #[test]
    fn test_ssh_url_with_port_and_nested_group() {
        let meta =
            RepositoryMetadata::from_url("ssh://git@gitlab.example.com:2222/group/sub/tool.git")
                .unwrap();
        assert_eq!(meta.host, "gitlab.example.com");
        assert_eq!(meta.owner, "group/sub");
        assert_eq!(meta.name, "tool");
    }

    #[test]
    fn test_unrecognised_url() {
        assert!(RepositoryMetadata::from_url("/srv/git/dotapi").is_none());
        assert!(RepositoryMetadata::from_url("").is_none());
    }

    #[test]
    fn test_urls() {
        let meta = RepositoryMetadata::from_url("https://github.com/acme/dotapi").unwrap();
        assert_eq!(
            meta.compare_url("1.0.0", "1.1.0"),
            "https://github.com/acme/dotapi/compare/1.0.0...1.1.0"
        );
        assert_eq!(meta.tree_url("1.0.0"), "https://github.com/acme/dotapi/tree/1.0.0");
    }

    #[test]
    fn test_discover_outside_repository() {
        let dir = tempfile::tempdir().unwrap();
        // tempdir may itself live under a checkout; only assert it does not panic
        let _ = RepositoryMetadata::discover(dir.path(), "origin");
    }

    #[test]
    fn test_discover_missing_remote() {
        let dir = tempfile::tempdir().unwrap();
        git2::Repository::init(dir.path()).unwrap();
        assert_eq!(RepositoryMetadata::discover(dir.path(), "origin").unwrap(), None);
    }

    #[test]
    fn test_discover_reads_remote_url() {
        let dir = tempfile::tempdir().unwrap();
        let repo = git2::Repository::init(dir.path()).unwrap();
        repo.remote("origin", "https://github.com/acme/dotapi.git")
            .unwrap();

        let meta = RepositoryMetadata::discover(dir.path(), "origin")
            .unwrap()
            .unwrap();
        assert_eq!(meta.owner, "acme");
    }
}
