//! Domain logic - pure business rules independent of git operations

pub mod branch;
pub mod version;

pub use branch::{Branch, BranchConventions, BranchKind};
pub use version::ReleaseVersion;
