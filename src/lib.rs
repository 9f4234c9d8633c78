pub mod boundary;
pub mod changelog;
pub mod ci;
pub mod config;
pub mod domain;
pub mod error;
pub mod git;
pub mod logging;
pub mod publish;
pub mod runner;
pub mod ui;
pub mod version;
pub mod workflow;

pub use error::{ReleaseError, Result};
