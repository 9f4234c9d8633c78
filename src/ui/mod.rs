//! User interface module.
//!
//! All terminal output for the CLI goes through here; diagnostics go through
//! `tracing` instead.

pub mod formatter;

// Re-export formatter functions for convenience
pub use formatter::{
    display_boundary_warning, display_error, display_manual_push_instruction, display_planned,
    display_status, display_success, display_version_info, format_outcome, format_trace,
    format_version_info,
};
