//! # jules-agent
//!
//! HTTP adapters for the three remote parties the automator talks to:
//!
//! - Jules session API ([`SessionApi`], [`SessionClient`])
//! - GitHub pull request review comments ([`ReviewSource`], [`GitHubReviews`])
//! - A local Ollama model used as triage judge ([`Judge`], [`OllamaJudge`])
//!
//! Each adapter sits behind a trait so the orchestrator can be exercised
//! against in-memory fakes.

mod auth;
mod client;
mod github;
mod ollama;
mod types;

pub use auth::{github_token, jules_api_key, GITHUB_TOKEN_ENV, JULES_API_KEY_ENV};
pub use client::{SessionApi, SessionClient, HINT_REPO_NOT_CONNECTED, HINT_UNAUTHENTICATED};
pub use github::{GitHubReviews, ReviewSource};
pub use ollama::{build_triage_prompt, classify_response, Judge, OllamaJudge};
pub use types::NewSession;
