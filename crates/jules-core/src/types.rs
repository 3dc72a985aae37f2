//! Core type definitions for sessions, review comments and triage

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Automation mode requested for every new session
pub const AUTOMATION_MODE_AUTO_CREATE_PR: &str = "AUTO_CREATE_PR";

/// Session state as reported by the remote service
///
/// Only the terminal set carries meaning locally; anything the service adds
/// later is kept verbatim in [`SessionState::Unrecognized`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SessionState {
    #[default]
    Unspecified,
    Queued,
    Planning,
    AwaitingPlanApproval,
    AwaitingUserFeedback,
    InProgress,
    Paused,
    Completed,
    Failed,
    Cancelled,
    Unrecognized(String),
}

impl SessionState {
    /// Wire name of the state
    pub fn as_str(&self) -> &str {
        match self {
            Self::Unspecified => "STATE_UNSPECIFIED",
            Self::Queued => "QUEUED",
            Self::Planning => "PLANNING",
            Self::AwaitingPlanApproval => "AWAITING_PLAN_APPROVAL",
            Self::AwaitingUserFeedback => "AWAITING_USER_FEEDBACK",
            Self::InProgress => "IN_PROGRESS",
            Self::Paused => "PAUSED",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
            Self::Unrecognized(raw) => raw,
        }
    }

    /// No further autonomous progress is expected after these states
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl From<String> for SessionState {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "STATE_UNSPECIFIED" | "" => Self::Unspecified,
            "QUEUED" => Self::Queued,
            "PLANNING" => Self::Planning,
            "AWAITING_PLAN_APPROVAL" => Self::AwaitingPlanApproval,
            "AWAITING_USER_FEEDBACK" => Self::AwaitingUserFeedback,
            "IN_PROGRESS" => Self::InProgress,
            "PAUSED" => Self::Paused,
            "COMPLETED" => Self::Completed,
            "FAILED" => Self::Failed,
            "CANCELLED" => Self::Cancelled,
            _ => Self::Unrecognized(raw),
        }
    }
}

impl From<SessionState> for String {
    fn from(state: SessionState) -> Self {
        state.as_str().to_string()
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Branch to start the agent from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GithubRepoContext {
    #[serde(default)]
    pub starting_branch: String,
}

/// Repository the session works against
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceContext {
    /// Source locator, e.g. `sources/github/owner/repo`
    #[serde(default)]
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_repo_context: Option<GithubRepoContext>,
}

/// Pull request emitted by a session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One result object in a session's outputs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<PullRequestRef>,
    /// Output kinds other than pull requests, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Snapshot of a remote session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Opaque identifier assigned by the service
    #[serde(default)]
    pub id: String,
    /// Resource name, `sessions/{id}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_context: Option<SourceContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automation_mode: Option<String>,
    #[serde(default)]
    pub state: SessionState,
    #[serde(default)]
    pub outputs: Vec<SessionOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
    /// Fields not modelled above, round-tripped unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Session {
    /// First pull request found in the outputs, in output order
    pub fn pull_request(&self) -> Option<&PullRequestRef> {
        self.outputs.iter().find_map(|o| o.pull_request.as_ref())
    }

    /// Whether any output carries a pull request, regardless of state
    pub fn has_pull_request(&self) -> bool {
        self.pull_request().is_some()
    }
}

/// One entry of a session's interaction log
///
/// Activity payloads vary by kind; everything beyond the common header is
/// kept verbatim in `details`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub originator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// A code review comment left on a pull request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewComment {
    /// Globally unique within the source-control system
    pub id: u64,
    /// Login of the comment author
    pub author: String,
    pub path: String,
    pub line: Option<u32>,
    pub body: String,
}

/// Outcome of triaging a batch of review comments
///
/// `JudgeUnavailable` is deliberately separate from `NoIssues`: a failed
/// inference call must never mark comments as handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    NeedsFix,
    NoIssues,
    JudgeUnavailable,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NeedsFix => write!(f, "needs_fix"),
            Self::NoIssues => write!(f, "no_issues"),
            Self::JudgeUnavailable => write!(f, "judge_unavailable"),
        }
    }
}
