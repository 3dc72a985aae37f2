//! Wire formats for the Jules, GitHub and Ollama endpoints

use jules_core::{Activity, GithubRepoContext, ReviewComment, Session, SourceContext};
use serde::{Deserialize, Serialize};

/// Parameters for a new Jules session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    pub prompt: String,
    /// Source locator, e.g. `sources/github/owner/repo`
    pub source: String,
    pub branch: String,
    pub title: String,
}

impl NewSession {
    /// Session on `main` with the default title
    pub fn new(prompt: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            source: source.into(),
            branch: "main".to_string(),
            title: "Automated Task".to_string(),
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

/// `POST /sessions` body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateSessionRequest<'a> {
    pub prompt: &'a str,
    pub source_context: SourceContext,
    pub automation_mode: &'static str,
    pub title: &'a str,
}

impl<'a> CreateSessionRequest<'a> {
    pub fn new(session: &'a NewSession) -> Self {
        Self {
            prompt: &session.prompt,
            source_context: SourceContext {
                source: session.source.clone(),
                github_repo_context: Some(GithubRepoContext {
                    starting_branch: session.branch.clone(),
                }),
            },
            automation_mode: jules_core::AUTOMATION_MODE_AUTO_CREATE_PR,
            title: &session.title,
        }
    }
}

/// `POST /sessions/{id}:sendMessage` body
#[derive(Debug, Clone, Serialize)]
pub(crate) struct SendMessageRequest<'a> {
    pub prompt: &'a str,
}

/// `GET /sessions` response
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ListSessionsResponse {
    #[serde(default)]
    pub sessions: Vec<Session>,
}

/// `GET /sessions/{id}/activities` response
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ListActivitiesResponse {
    #[serde(default)]
    pub activities: Vec<Activity>,
}

/// GitHub user reference on a review comment
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawUser {
    #[serde(default)]
    pub login: String,
}

/// GitHub pull request review comment
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawReviewComment {
    pub id: u64,
    #[serde(default)]
    pub user: Option<RawUser>,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub line: Option<u32>,
    #[serde(default)]
    pub original_line: Option<u32>,
    #[serde(default)]
    pub body: String,
}

impl From<RawReviewComment> for ReviewComment {
    fn from(raw: RawReviewComment) -> Self {
        Self {
            id: raw.id,
            author: raw.user.map(|u| u.login).unwrap_or_default(),
            path: raw.path,
            // Outdated comments lose `line` but keep `original_line`
            line: raw.line.or(raw.original_line),
            body: raw.body,
        }
    }
}

/// Ollama `/api/generate` request
#[derive(Debug, Clone, Serialize)]
pub(crate) struct GenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub stream: bool,
}

/// Ollama `/api/generate` response (non-streaming)
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GenerateResponse {
    #[serde(default)]
    pub response: String,
}
