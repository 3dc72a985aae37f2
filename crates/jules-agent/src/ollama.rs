//! Triage judge backed by a local Ollama model
//!
//! The model sees every comment in the batch at once and is asked for a plain
//! YES/NO. Any failure to get an answer is reported as
//! [`Verdict::JudgeUnavailable`], never as `NoIssues`.

use crate::client::{ensure_success, transport};
use crate::types::{GenerateRequest, GenerateResponse};
use async_trait::async_trait;
use jules_core::fail_open::fail_open;
use jules_core::{JulesError, Result, ReviewComment, Verdict};
use std::time::Duration;
use tracing::{debug, info};

const SERVICE: &str = "Ollama";

/// Classifies a batch of review comments
#[async_trait]
pub trait Judge: Send + Sync {
    /// Never fails: an unreachable model yields `JudgeUnavailable`
    async fn assess(&self, comments: &[ReviewComment]) -> Verdict;
}

/// [`Judge`] calling Ollama's `/api/generate`
#[derive(Debug, Clone)]
pub struct OllamaJudge {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaJudge {
    /// Create a judge with a bounded request timeout
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| JulesError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let response = self
            .http
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| transport(SERVICE, e))?;

        let response = ensure_success(SERVICE, response).await?;
        let generated: GenerateResponse =
            response.json().await.map_err(|e| transport(SERVICE, e))?;
        Ok(generated.response)
    }
}

/// Build the single triage prompt for a batch
pub fn build_triage_prompt(comments: &[ReviewComment]) -> String {
    let mut prompt = String::from(
        "Assess the following code review comments for security vulnerabilities or critical logic errors:\n\n",
    );
    for comment in comments {
        prompt.push_str(&format!("- {}: {}\n", comment.author, comment.body));
    }
    prompt.push_str("\nRespond with 'YES' if any core issues need fixing, otherwise 'NO'.");
    prompt
}

/// Reduce the model's free text to a verdict
///
/// Any occurrence of `YES` (case-insensitive) counts as affirmative. There is
/// no negation handling, so text like "yesterday" also matches.
pub fn classify_response(text: &str) -> Verdict {
    if text.trim().to_uppercase().contains("YES") {
        Verdict::NeedsFix
    } else {
        Verdict::NoIssues
    }
}

#[async_trait]
impl Judge for OllamaJudge {
    async fn assess(&self, comments: &[ReviewComment]) -> Verdict {
        if comments.is_empty() {
            return Verdict::NoIssues;
        }

        info!(
            "Assessing {} comments with Ollama ({})...",
            comments.len(),
            self.model
        );
        let prompt = build_triage_prompt(comments);

        match fail_open("ollama_assessment", self.generate(&prompt)).await {
            Some(text) => {
                debug!("Ollama answered: {}", text.trim());
                classify_response(&text)
            }
            None => Verdict::JudgeUnavailable,
        }
    }
}
