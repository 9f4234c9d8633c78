//! CI environment detection.
//!
//! A run counts as a CI run only when a build number can be found; a CI flag
//! without a number resolves versions as a local build.

/// Build-number variables, checked in order
const BUILD_NUMBER_VARS: &[&str] = &[
    "BUILD_BUILDNUMBER",     // Azure Pipelines / TFS
    "APPVEYOR_BUILD_NUMBER", // AppVeyor
    "TRAVIS_BUILD_NUMBER",   // Travis CI
    "GITHUB_RUN_NUMBER",     // GitHub Actions
    "CI_PIPELINE_IID",       // GitLab CI
    "BUILDKITE_BUILD_NUMBER",
    "CIRCLE_BUILD_NUM",
    "BUILD_NUMBER", // Jenkins, TeamCity
];

/// Whether versions are being resolved on a CI server or a developer machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CiContext {
    Local,
    Ci { build_number: String },
}

impl CiContext {
    /// CI context with the given build number
    pub fn ci(build_number: impl Into<String>) -> Self {
        CiContext::Ci {
            build_number: build_number.into(),
        }
    }

    /// Detect from the process environment
    pub fn from_env() -> Self {
        Self::detect(|name| std::env::var(name).ok())
    }

    /// Detect using an arbitrary variable lookup
    pub fn detect<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        BUILD_NUMBER_VARS
            .iter()
            .filter_map(|name| lookup(name))
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty())
            .map_or(CiContext::Local, |build_number| CiContext::Ci { build_number })
    }

    pub fn is_ci(&self) -> bool {
        matches!(self, CiContext::Ci { .. })
    }

    pub fn build_number(&self) -> Option<&str> {
        match self {
            CiContext::Ci { build_number } => Some(build_number),
            CiContext::Local => None,
        }
    }
}
