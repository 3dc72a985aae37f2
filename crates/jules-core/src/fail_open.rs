//! Advisory steps that must not abort a review run
//!
//! The triage model is optional infrastructure: when Ollama is down, slow or
//! answers garbage, the run records `Verdict::JudgeUnavailable` and the
//! comments stay eligible for the next run. This helper turns such a failure
//! into `None` after logging it.
//!
//! Session calls, comment fetches and ledger writes never go through here.

use std::future::Future;
use tracing::warn;

use crate::Result;

/// Await `step`, logging and discarding its error
///
/// ```no_run
/// use jules_core::fail_open::fail_open;
/// use jules_core::{Result, Verdict};
///
/// async fn ask_model() -> Result<String> {
///     Ok("YES".to_string())
/// }
///
/// async fn triage() -> Verdict {
///     match fail_open("triage_judge", ask_model()).await {
///         Some(answer) if answer.contains("YES") => Verdict::NeedsFix,
///         Some(_) => Verdict::NoIssues,
///         None => Verdict::JudgeUnavailable,
///     }
/// }
/// ```
pub async fn fail_open<T, Fut>(step: &str, fut: Fut) -> Option<T>
where
    Fut: Future<Output = Result<T>>,
{
    fut.await
        .map_err(|e| warn!("{} unavailable, continuing without it: {}", step, e))
        .ok()
}
