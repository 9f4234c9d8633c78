use crate::error::{ReleaseError, Result};
use std::fmt;

/// Base version of the release being prepared (major.minor.patch)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReleaseVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl ReleaseVersion {
    /// Create a new version
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        ReleaseVersion {
            major,
            minor,
            patch,
        }
    }

    /// Parse a plain `X.Y.Z` version.
    ///
    /// Pre-release and build metadata are rejected: they are derived from the
    /// branch at resolution time, never supplied up front.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ReleaseError::config("release version must not be empty"));
        }

        let parsed = semver::Version::parse(trimmed).map_err(|e| {
            ReleaseError::config(format!(
                "invalid release version '{}': {} - expected X.Y.Z",
                trimmed, e
            ))
        })?;

        if !parsed.pre.is_empty() || !parsed.build.is_empty() {
            return Err(ReleaseError::config(format!(
                "release version '{}' must be plain X.Y.Z",
                trimmed
            )));
        }

        Ok(ReleaseVersion::new(parsed.major, parsed.minor, parsed.patch))
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl std::str::FromStr for ReleaseVersion {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self> {
        ReleaseVersion::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_version() {
        let v = ReleaseVersion::parse("1.2.3").unwrap();
        assert_eq!(v, ReleaseVersion::new(1, 2, 3));
        assert_eq!(v.to_string(), "1.2.3");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert_eq!(
            ReleaseVersion::parse(" 0.10.0\n").unwrap(),
            ReleaseVersion::new(0, 10, 0)
        );
    }

    #[test]
    fn test_rejects_empty() {
        let err = ReleaseVersion::parse("").unwrap_err();
        assert!(matches!(err, ReleaseError::Configuration(_)));
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(ReleaseVersion::parse("1.2").is_err());
        assert!(ReleaseVersion::parse("v1.2.3").is_err());
        assert!(ReleaseVersion::parse("1.2.x").is_err());
    }

    #[test]
    fn test_rejects_prerelease_and_build() {
        assert!(ReleaseVersion::parse("1.2.3-beta").is_err());
        assert!(ReleaseVersion::parse("1.2.3+45").is_err());
    }

    #[test]
    fn test_from_str() {
        let v: ReleaseVersion = "2.0.1".parse().unwrap();
        assert_eq!(v.major, 2);
        assert_eq!(v.patch, 1);
    }
}
