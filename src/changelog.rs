//! Keep-a-Changelog style changelog handling.
//!
//! The pending section is headed `## [Unreleased]` (or `## [vNext]`).
//! Finalising relabels it with the release version and date, opens a fresh
//! empty pending section above it and rewrites the compare links.

use crate::domain::ReleaseVersion;
use crate::error::{ReleaseError, Result};
use crate::git::RepositoryMetadata;
use chrono::NaiveDate;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, info};

static PENDING_HEADER: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(?i)^##\s*\[?\s*(unreleased|vnext)\s*\]?\s*$"));
static SECTION_HEADER: LazyLock<Regex> = LazyLock::new(|| pattern(r"^##\s"));
static VERSION_HEADER: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"^##\s*\[?v?(\d+\.\d+\.\d+)\]?"));
static LINK_DEFINITION: LazyLock<Regex> = LazyLock::new(|| pattern(r"^\[[^\]]+\]:\s*\S"));
static PENDING_LINK: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(?i)^\[(unreleased|vnext)\]:"));

fn pattern(source: &str) -> Regex {
    Regex::new(source).expect("changelog patterns are valid")
}

/// Changelog operations the release workflow depends on
pub trait ChangelogGateway {
    /// Notes of the pending section, in file order
    fn release_notes(&self, path: &Path) -> Result<Vec<String>>;

    /// Turn the pending section into the section for `version`
    fn finalize(
        &self,
        path: &Path,
        version: &ReleaseVersion,
        repository: Option<&RepositoryMetadata>,
    ) -> Result<()>;
}

/// File-backed changelog in Keep a Changelog format
#[derive(Debug, Clone)]
pub struct KeepAChangelog {
    date: NaiveDate,
}

impl KeepAChangelog {
    /// Stamp finalised sections with today's local date
    pub fn today() -> Self {
        KeepAChangelog {
            date: chrono::Local::now().date_naive(),
        }
    }

    /// Stamp finalised sections with a fixed date
    pub fn with_date(date: NaiveDate) -> Self {
        KeepAChangelog { date }
    }
}

impl ChangelogGateway for KeepAChangelog {
    fn release_notes(&self, path: &Path) -> Result<Vec<String>> {
        let content = read(path)?;
        extract_pending_notes(&content)
    }

    fn finalize(
        &self,
        path: &Path,
        version: &ReleaseVersion,
        repository: Option<&RepositoryMetadata>,
    ) -> Result<()> {
        let content = read(path)?;
        let updated = finalize_content(&content, version, self.date, repository)?;
        fs::write(path, updated).map_err(|e| {
            ReleaseError::changelog(format!("cannot write {}: {}", path.display(), e))
        })?;
        info!(path = %path.display(), version = %version, "finalized changelog");
        Ok(())
    }
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|e| ReleaseError::changelog(format!("cannot read {}: {}", path.display(), e)))
}

fn find_pending(lines: &[&str]) -> Result<usize> {
    lines
        .iter()
        .position(|line| PENDING_HEADER.is_match(line.trim_end()))
        .ok_or_else(|| {
            ReleaseError::changelog("no '## [Unreleased]' or '## [vNext]' section found")
        })
}

/// Non-blank lines of the pending section
pub fn extract_pending_notes(content: &str) -> Result<Vec<String>> {
    let lines: Vec<&str> = content.lines().collect();
    let start = find_pending(&lines)?;

    Ok(lines[start + 1..]
        .iter()
        .take_while(|line| !SECTION_HEADER.is_match(line))
        .map(|line| line.trim())
        .filter(|line| !line.is_empty() && !LINK_DEFINITION.is_match(line))
        .map(|line| line.to_string())
        .collect())
}

/// Finalise the pending section of `content` as `version`
pub fn finalize_content(
    content: &str,
    version: &ReleaseVersion,
    date: NaiveDate,
    repository: Option<&RepositoryMetadata>,
) -> Result<String> {
    let version_text = version.to_string();
    let lines: Vec<&str> = content.lines().collect();
    let pending = find_pending(&lines)?;

    let existing: Vec<&str> = lines
        .iter()
        .filter_map(|line| VERSION_HEADER.captures(line))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect();
    if existing.contains(&version_text.as_str()) {
        return Err(ReleaseError::changelog(format!(
            "a section for {} already exists",
            version_text
        )));
    }
    let previous = lines[pending + 1..]
        .iter()
        .filter_map(|line| VERSION_HEADER.captures(line))
        .find_map(|caps| caps.get(1).map(|m| m.as_str().to_string()));
    debug!(previous = ?previous, "previous changelog version");

    let mut out: Vec<String> = Vec::with_capacity(lines.len() + 4);
    for (index, line) in lines.iter().enumerate() {
        if index == pending {
            out.push("## [Unreleased]".to_string());
            out.push(String::new());
            out.push(format!("## [{}] / {}", version_text, date.format("%Y-%m-%d")));
        } else if repository.is_some() && PENDING_LINK.is_match(line) {
            continue;
        } else {
            out.push(line.to_string());
        }
    }

    if let Some(repo) = repository {
        let links = vec![
            format!("[Unreleased]: {}", repo.compare_url(&version_text, "HEAD")),
            match &previous {
                Some(prev) => format!(
                    "[{}]: {}",
                    version_text,
                    repo.compare_url(prev, &version_text)
                ),
                None => format!("[{}]: {}", version_text, repo.tree_url(&version_text)),
            },
        ];

        match out.iter().position(|line| LINK_DEFINITION.is_match(line)) {
            Some(first_link) => {
                for (offset, line) in links.into_iter().enumerate() {
                    out.insert(first_link + offset, line);
                }
            }
            None => {
                while out.last().is_some_and(|line| line.trim().is_empty()) {
                    out.pop();
                }
                out.push(String::new());
                out.extend(links);
            }
        }
    }

    let mut result = out.join("\n");
    result.push('\n');
    Ok(result)
}
