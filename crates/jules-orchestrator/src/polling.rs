//! Session polling
//!
//! Blocks the calling task until the session either emits a pull request or
//! reaches a terminal state. There is no iteration cap; stopping early is the
//! caller's business (kill the process).

use jules_agent::SessionApi;
use jules_core::{Result, Session};
use std::time::Duration;
use tracing::info;

/// Delay between polls when none is configured
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Why polling stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStop {
    /// An output carries a pull request (state may still be non-terminal)
    PullRequestReady,
    /// COMPLETED, FAILED or CANCELLED without a pull request
    Terminal,
}

/// Final snapshot and the reason polling ended
#[derive(Debug, Clone)]
pub struct PollOutcome {
    pub session: Session,
    pub stop: PollStop,
    /// Number of snapshots fetched
    pub polls: usize,
}

/// Owns the wait loop for one session
pub struct SessionPoller<'a, S: SessionApi + ?Sized> {
    api: &'a S,
    interval: Duration,
}

impl<'a, S: SessionApi + ?Sized> SessionPoller<'a, S> {
    pub fn new(api: &'a S) -> Self {
        Self {
            api,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Poll until a PR appears or the session stops
    pub async fn poll(&self, session_id: &str) -> Result<PollOutcome> {
        let mut polls = 0;
        loop {
            let session = self.api.get_session(session_id).await?;
            polls += 1;

            // A PR wins over whatever the state says
            if session.has_pull_request() {
                info!("Session {} completed with PR.", session_id);
                return Ok(PollOutcome {
                    session,
                    stop: PollStop::PullRequestReady,
                    polls,
                });
            }

            if session.state.is_terminal() {
                info!("Session {} finished in state {}", session_id, session.state);
                return Ok(PollOutcome {
                    session,
                    stop: PollStop::Terminal,
                    polls,
                });
            }

            info!(
                "Session {} status: {}... sleeping {}s",
                session_id,
                session.state,
                self.interval.as_secs()
            );
            tokio::time::sleep(self.interval).await;
        }
    }
}
