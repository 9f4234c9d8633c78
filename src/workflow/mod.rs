//! GitFlow release workflow
//!
//! Two targets drive the repository through a release:
//!
//! - `changelog`: on a release/* or hotfix/* branch, finalize the changelog's
//!   pending section and commit it
//! - `release`: depends on `changelog`; on a clean tree either starts a new
//!   release branch from develop, or finishes the current release/hotfix
//!   branch (merge to master, tag, merge to develop, delete, push)
//!
//! Failures are never rolled back. A precondition failure leaves the
//! repository untouched ([WorkflowState::Aborted]); a tool failure leaves it
//! exactly where the tool stopped ([WorkflowState::Failed]).

pub mod release;
pub mod state;

pub use release::{ReleaseOutcome, ReleaseSettings, ReleaseWorkflow};
pub use state::{execution_plan, Target, WorkflowState};
