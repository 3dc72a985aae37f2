//! Tool definitions and their handlers

use jules_agent::{
    GitHubReviews, NewSession, OllamaJudge, SessionApi, SessionClient, GITHUB_TOKEN_ENV,
};
use jules_core::{AutomatorConfig, JulesError};
use jules_orchestrator::{ActiveSession, ProcessedLedger, ReviewLoop, ReviewOutcome};
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, ServerCapabilities, ServerInfo};
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

const DEFAULT_TITLE: &str = "Automated Task";
const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreateSessionArgs {
    /// The prompt for the session
    pub prompt: String,
    /// Jules source such as sources/github/{owner}/{repo}; defaults to the configured source
    #[serde(default)]
    pub source_id: Option<String>,
    /// Starting branch; defaults to the configured default branch
    #[serde(default)]
    pub branch: Option<String>,
    /// Title of the session
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ListSessionsArgs {
    /// Number of sessions to retrieve (default 10)
    #[serde(default)]
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SessionIdArgs {
    /// The id of the session
    pub session_id: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SendMessageArgs {
    /// The id of the session
    pub session_id: String,
    /// The message content
    pub prompt: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ProcessReviewsArgs {
    /// Pull request number
    pub pr_number: u64,
    /// The id of the session that owns the pull request
    pub session_id: String,
}

/// MCP server state: one session client plus the repository config
#[derive(Clone)]
pub struct JulesTools {
    sessions: SessionClient,
    config: AutomatorConfig,
    github_token: Option<String>,
    // Tool calls may overlap; the ledger has a single writer
    ledger_lock: Arc<Mutex<()>>,
    tool_router: ToolRouter<Self>,
}

impl JulesTools {
    pub fn new(sessions: SessionClient, config: AutomatorConfig) -> Self {
        Self {
            sessions,
            config,
            github_token: None,
            ledger_lock: Arc::new(Mutex::new(())),
            tool_router: Self::tool_router(),
        }
    }

    /// Enable `jules_process_reviews`
    pub fn with_github_token(mut self, token: impl Into<String>) -> Self {
        self.github_token = Some(token.into());
        self
    }

    /// Names of every registered tool, sorted
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect();
        names.sort();
        names
    }

    /// Create a session and record it in the ledger
    pub async fn create_session(&self, args: CreateSessionArgs) -> jules_core::Result<String> {
        let source = match args.source_id.filter(|s| !s.trim().is_empty()) {
            Some(source) => source,
            None => self.config.source_id()?,
        };
        let branch = args
            .branch
            .unwrap_or_else(|| self.config.default_branch.clone());
        let title = args.title.unwrap_or_else(|| DEFAULT_TITLE.to_string());

        let request = NewSession::new(args.prompt, source.clone())
            .with_branch(branch)
            .with_title(title.clone());
        let session_id = self.sessions.create_session(&request).await?;

        let _guard = self.ledger_lock.lock().await;
        let mut ledger = ProcessedLedger::load(&self.config.ledger_path).await;
        ledger
            .track_session(&session_id, ActiveSession::new(title, source))
            .await?;
        Ok(session_id)
    }

    pub async fn list_sessions(&self, args: ListSessionsArgs) -> jules_core::Result<String> {
        let page_size = args.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        to_json(&self.sessions.list_sessions(page_size).await?)
    }

    pub async fn get_status(&self, args: SessionIdArgs) -> jules_core::Result<String> {
        to_json(&self.sessions.get_session(&args.session_id).await?)
    }

    pub async fn send_message(&self, args: SendMessageArgs) -> jules_core::Result<String> {
        to_json(
            &self
                .sessions
                .send_message(&args.session_id, &args.prompt)
                .await?,
        )
    }

    pub async fn get_activities(&self, args: SessionIdArgs) -> jules_core::Result<String> {
        to_json(&self.sessions.list_activities(&args.session_id).await?)
    }

    /// Run the review loop once and describe what it did
    pub async fn process_reviews(&self, args: ProcessReviewsArgs) -> jules_core::Result<String> {
        let token = self.github_token.clone().ok_or_else(|| {
            JulesError::Configuration(format!(
                "No GitHub token found. Set {} to process reviews",
                GITHUB_TOKEN_ENV
            ))
        })?;
        let (owner, repo) = self.config.repository()?;

        let reviews =
            GitHubReviews::new(token, owner, repo).with_api_url(&self.config.github_api_url);
        let judge = OllamaJudge::new(
            &self.config.ollama_url,
            &self.config.ollama_model,
            self.config.judge_timeout(),
        )?;
        let review = ReviewLoop::new(self.sessions.clone(), reviews, judge)
            .with_reviewers(&self.config.reviewer_logins);

        let _guard = self.ledger_lock.lock().await;
        let mut ledger = ProcessedLedger::load(&self.config.ledger_path).await;
        let outcome = review
            .process_reviews(&mut ledger, args.pr_number, &args.session_id)
            .await?;

        let mut report = outcome.summary();
        if let ReviewOutcome::FixRequested { response, .. } = &outcome {
            report.push_str(&format!("\nJules response: {}", response));
        }
        Ok(report)
    }
}

fn to_json<T: Serialize>(value: &T) -> jules_core::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn into_tool_result(tool: &str, result: jules_core::Result<String>) -> CallToolResult {
    match result {
        Ok(text) => CallToolResult::success(vec![Content::text(text)]),
        Err(e) => {
            warn!("{} failed: {}", tool, e);
            CallToolResult::error(vec![Content::text(e.to_string())])
        }
    }
}

#[tool_router]
impl JulesTools {
    #[tool(description = "Creates a new Jules session and returns its id")]
    async fn jules_create_session(
        &self,
        Parameters(args): Parameters<CreateSessionArgs>,
    ) -> Result<CallToolResult, McpError> {
        info!("jules_create_session");
        let result = self.create_session(args).await;
        Ok(into_tool_result("jules_create_session", result))
    }

    #[tool(description = "Retrieves a list of recent sessions")]
    async fn jules_list_sessions(
        &self,
        Parameters(args): Parameters<ListSessionsArgs>,
    ) -> Result<CallToolResult, McpError> {
        let result = self.list_sessions(args).await;
        Ok(into_tool_result("jules_list_sessions", result))
    }

    #[tool(description = "Returns the current state and outputs of a session")]
    async fn jules_get_status(
        &self,
        Parameters(args): Parameters<SessionIdArgs>,
    ) -> Result<CallToolResult, McpError> {
        let result = self.get_status(args).await;
        Ok(into_tool_result("jules_get_status", result))
    }

    #[tool(description = "Sends a follow-up prompt to an active session")]
    async fn jules_send_message(
        &self,
        Parameters(args): Parameters<SendMessageArgs>,
    ) -> Result<CallToolResult, McpError> {
        info!("jules_send_message to {}", args.session_id);
        let result = self.send_message(args).await;
        Ok(into_tool_result("jules_send_message", result))
    }

    #[tool(description = "Retrieves the interaction log of a session")]
    async fn jules_get_activities(
        &self,
        Parameters(args): Parameters<SessionIdArgs>,
    ) -> Result<CallToolResult, McpError> {
        let result = self.get_activities(args).await;
        Ok(into_tool_result("jules_get_activities", result))
    }

    #[tool(
        description = "Fetches bot review comments on a PR, triages them with the local model \
                       and sends one fix request to the session when needed"
    )]
    async fn jules_process_reviews(
        &self,
        Parameters(args): Parameters<ProcessReviewsArgs>,
    ) -> Result<CallToolResult, McpError> {
        info!(
            "jules_process_reviews for PR #{} / session {}",
            args.pr_number, args.session_id
        );
        let result = self.process_reviews(args).await;
        Ok(into_tool_result("jules_process_reviews", result))
    }
}

#[tool_handler]
impl ServerHandler for JulesTools {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Create and drive Jules coding sessions, then triage bot review comments \
                 on their pull requests and send fixes back."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
