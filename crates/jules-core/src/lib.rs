//! # jules-core
//!
//! Core types for the Jules review-loop automator.
//!
//! The automator delegates coding work to a remote Jules session, waits for it
//! to open a pull request, and then feeds automated review comments back into
//! the same session. This crate holds the pieces every layer shares:
//!
//! - Session snapshots and their state machine vocabulary
//! - Review comments and the tri-state triage [`Verdict`]
//! - The unified [`JulesError`] type
//! - Repository-level configuration

pub mod config;
mod error;
pub mod fail_open;
mod types;

pub use config::AutomatorConfig;
pub use error::{JulesError, Result};
pub use types::*;
