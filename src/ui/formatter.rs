//! Pure formatting functions for UI output.
//!
//! `format_*` functions build the text; `display_*` functions print it.

use console::style;

use crate::boundary::GateWarning;
use crate::version::VersionInfo;
use crate::workflow::{ReleaseOutcome, WorkflowState};

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

/// Display a non-fatal warning to the user.
pub fn display_boundary_warning(warning: &GateWarning) {
    eprintln!("{} {}", style("⚠ WARNING:").yellow(), warning);
}

/// Version summary plus the pending release notes.
pub fn format_version_info(info: &VersionInfo, notes: &[String]) -> String {
    let mut out = String::new();
    out.push_str(&format!("Release Version:       {}\n", style(info.release).bold()));
    out.push_str(&format!("NuGet Version:         {}\n", style(&info.nuget).bold()));
    out.push_str(&format!(
        "Informational Version: {}\n",
        style(&info.informational).bold()
    ));

    if notes.is_empty() {
        out.push_str("Release Notes:         (none)\n");
    } else {
        out.push_str("Release Notes:\n");
        for note in notes {
            out.push_str(&format!("  {}\n", note));
        }
    }
    out
}

pub fn display_version_info(info: &VersionInfo, notes: &[String]) {
    print!("{}", format_version_info(info, notes));
}

/// One-line rendering of the states a workflow passed through.
pub fn format_trace(trace: &[WorkflowState]) -> String {
    trace
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" → ")
}

/// Commands a dry run would have executed.
pub fn display_planned(planned: &[String]) {
    println!("\n{}", style("Dry run, nothing was changed. Planned steps:").bold());
    for (i, step) in planned.iter().enumerate() {
        println!("  {}. {}", i + 1, style(step).cyan());
    }
}

pub fn format_outcome(outcome: &ReleaseOutcome) -> String {
    match outcome {
        ReleaseOutcome::Started { branch } => format!(
            "Started release branch {}; run the release again from it to finish",
            branch
        ),
        ReleaseOutcome::Finished { source_branch, tag } => {
            format!("Finished {} and published tag {}", source_branch, tag)
        }
    }
}

/// Display manual push instruction after a failed push.
///
/// Only the push needs repeating; merges, tag and branch deletion are done.
pub fn display_manual_push_instruction(remote: &str, refs: &[String]) {
    println!(
        "\n{} To finish publishing, run:\n  {}",
        style("→").yellow(),
        style(format!("git push {} {}", remote, refs.join(" "))).cyan()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ReleaseVersion;

    #[test]
    fn test_display_functions_do_not_panic() {
        display_error("test error");
        display_success("test success");
        display_status("test status");
        display_boundary_warning(&GateWarning::WorkingTreeDirty);
    }

    #[test]
    fn test_format_version_info() {
        let info = VersionInfo {
            release: ReleaseVersion::new(1, 2, 3),
            nuget: "1.2.3-dev7".to_string(),
            informational: "1.2.3-dev7.abc1234".to_string(),
        };
        let text = format_version_info(&info, &["- Added x".to_string()]);
        assert!(text.contains("1.2.3-dev7.abc1234"));
        assert!(text.contains("  - Added x"));

        let empty = format_version_info(&info, &[]);
        assert!(empty.contains("(none)"));
    }

    #[test]
    fn test_format_trace() {
        let trace = [
            WorkflowState::Idle,
            WorkflowState::ChangelogCommitted,
            WorkflowState::Aborted,
        ];
        assert_eq!(format_trace(&trace), "idle → changelog-committed → aborted");
    }

    #[test]
    fn test_format_outcome() {
        let started = ReleaseOutcome::Started {
            branch: "release/1.2.3".to_string(),
        };
        assert!(format_outcome(&started).contains("release/1.2.3"));

        let finished = ReleaseOutcome::Finished {
            source_branch: "hotfix/1.2.4".to_string(),
            tag: "1.2.4".to_string(),
        };
        assert_eq!(
            format_outcome(&finished),
            "Finished hotfix/1.2.4 and published tag 1.2.4"
        );
    }
}
