//! GitHub pull request review comments

use crate::client::{ensure_success, transport};
use crate::types::RawReviewComment;
use async_trait::async_trait;
use jules_core::config::DEFAULT_GITHUB_API_URL;
use jules_core::{Result, ReviewComment};
use tracing::{debug, info};

const SERVICE: &str = "GitHub API";
const PER_PAGE: usize = 100;

/// Source of review comments for a pull request
///
/// Returns comments verbatim; author and ledger filtering belong to the caller.
#[async_trait]
pub trait ReviewSource: Send + Sync {
    async fn fetch_comments(&self, pr_number: u64) -> Result<Vec<ReviewComment>>;
}

/// Review comments read through the GitHub REST API
#[derive(Debug, Clone)]
pub struct GitHubReviews {
    http: reqwest::Client,
    api_url: String,
    token: String,
    owner: String,
    repo: String,
}

impl GitHubReviews {
    pub fn new(
        token: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: DEFAULT_GITHUB_API_URL.to_string(),
            token: token.into(),
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// Point the adapter at a different API root (GitHub Enterprise, tests)
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn fetch_page(&self, pr_number: u64, page: usize) -> Result<Vec<RawReviewComment>> {
        let url = format!(
            "{}/repos/{}/{}/pulls/{}/comments",
            self.api_url, self.owner, self.repo, pr_number
        );
        debug!("GET {} (page {})", url, page);

        let response = self
            .http
            .get(&url)
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", "application/vnd.github.v3+json")
            .header("User-Agent", "jules-automator")
            .query(&[("per_page", PER_PAGE), ("page", page)])
            .send()
            .await
            .map_err(|e| transport(SERVICE, e))?;

        let response = ensure_success(SERVICE, response).await?;
        response.json().await.map_err(|e| transport(SERVICE, e))
    }
}

#[async_trait]
impl ReviewSource for GitHubReviews {
    async fn fetch_comments(&self, pr_number: u64) -> Result<Vec<ReviewComment>> {
        info!("Fetching comments for PR #{}...", pr_number);

        let mut comments = Vec::new();
        let mut page = 1;
        loop {
            let batch = self.fetch_page(pr_number, page).await?;
            let full_page = batch.len() >= PER_PAGE;
            comments.extend(batch.into_iter().map(ReviewComment::from));
            if !full_page {
                break;
            }
            page += 1;
        }

        debug!("PR #{} has {} review comments", pr_number, comments.len());
        Ok(comments)
    }
}
