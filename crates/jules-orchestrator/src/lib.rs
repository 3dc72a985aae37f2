//! # jules-orchestrator
//!
//! Drives a Jules session through the review feedback loop.
//!
//! This crate provides:
//! - [`SessionPoller`]: wait until a session opens a PR or stops
//! - [`ProcessedLedger`]: durable record of review comments already acted on
//! - [`ReviewLoop`]: fetch → filter → judge → act → persist
//!
//! Everything runs sequentially on the caller's task. The ledger is passed in
//! explicitly; there is no global state.

mod ledger;
mod polling;
mod prompt;
mod review_loop;

#[cfg(test)]
mod testing;

pub use ledger::{ActiveSession, LedgerState, ProcessedLedger};
pub use polling::{PollOutcome, PollStop, SessionPoller, DEFAULT_POLL_INTERVAL};
pub use prompt::{build_fix_message, LINE_PLACEHOLDER};
pub use review_loop::{ReviewLoop, ReviewOutcome};
