//! Jules CLI - delegate work to Jules and feed PR reviews back
//!
//! Usage:
//!   jules init                                  Write .jules/config.toml
//!   jules create --prompt <text|file>           Create a session
//!   jules message --session-id <id> --prompt P  Send a follow-up message
//!   jules loop --prompt <text|file>             Create a session and wait for its PR
//!   jules status --session-id <id>              Show a session snapshot
//!   jules list                                  List recent sessions
//!   jules activities --session-id <id>          Show a session's activity log
//!   jules review --pr <n> --session-id <id>     Triage bot review comments

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use jules_agent::{
    github_token, jules_api_key, GitHubReviews, NewSession, OllamaJudge, SessionApi,
    SessionClient,
};
use jules_core::AutomatorConfig;
use jules_orchestrator::{
    ActiveSession, PollOutcome, PollStop, ProcessedLedger, ReviewLoop, ReviewOutcome,
    SessionPoller,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "jules")]
#[command(author, version, about = "Drive Jules sessions and feed PR review comments back")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Config file (defaults to .jules/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default .jules/config.toml
    Init {
        /// Repository path (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Create a new session
    Create {
        #[command(flatten)]
        session: SessionArgs,
    },

    /// Send a follow-up message to an existing session
    Message {
        #[arg(long)]
        session_id: String,

        /// Message text or path to a file containing it
        #[arg(short, long)]
        prompt: String,
    },

    /// Create a session and wait until it opens a PR or stops
    Loop {
        #[command(flatten)]
        session: SessionArgs,

        /// Seconds between polls (defaults to poll_interval_secs)
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Show the current state and outputs of a session
    Status {
        #[arg(long)]
        session_id: String,
    },

    /// List recent sessions
    List {
        #[arg(long, default_value = "10")]
        page_size: u32,
    },

    /// Show the activity log of a session
    Activities {
        #[arg(long)]
        session_id: String,
    },

    /// Triage bot review comments on a PR and send fixes to the session
    Review {
        /// Pull request number
        #[arg(long)]
        pr: u64,

        /// Session that owns the PR
        #[arg(long)]
        session_id: String,

        /// Wait for the session after sending a fix request
        #[arg(long)]
        poll: bool,

        /// Seconds between polls (defaults to poll_interval_secs)
        #[arg(long)]
        interval: Option<u64>,
    },
}

#[derive(clap::Args)]
struct SessionArgs {
    /// Prompt text or path to a prompt file
    #[arg(short, long)]
    prompt: String,

    /// Session title
    #[arg(long, default_value = "Automated Task")]
    title: String,

    /// Starting branch (defaults to default_branch)
    #[arg(long)]
    branch: Option<String>,

    /// Jules source (defaults to SOURCE_ID or sources/github/{owner}/{repo})
    #[arg(long)]
    source: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if let Commands::Init { path } = &cli.command {
        return cmd_init(path);
    }

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Create { session } => cmd_create(&config, session).await,
        Commands::Message { session_id, prompt } => {
            cmd_message(&config, &session_id, &prompt).await
        }
        Commands::Loop { session, interval } => cmd_loop(&config, session, interval).await,
        Commands::Status { session_id } => cmd_status(&config, &session_id).await,
        Commands::List { page_size } => cmd_list(&config, page_size).await,
        Commands::Activities { session_id } => cmd_activities(&config, &session_id).await,
        Commands::Review {
            pr,
            session_id,
            poll,
            interval,
        } => cmd_review(&config, pr, &session_id, poll, interval).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<AutomatorConfig> {
    let config = match path {
        Some(path) => AutomatorConfig::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => AutomatorConfig::load_or_default(Path::new("."))
            .context("Failed to load .jules/config.toml")?,
    };
    Ok(config.with_env_overrides())
}

/// Use the file's contents when `arg` names an existing file
fn resolve_prompt(arg: &str) -> Result<String> {
    let path = Path::new(arg);
    if path.is_file() {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read prompt file {}", path.display()))
    } else {
        Ok(arg.to_string())
    }
}

fn session_client(config: &AutomatorConfig) -> Result<SessionClient> {
    let api_key = jules_api_key()?;
    Ok(SessionClient::new(api_key).with_base_url(&config.jules_api_url))
}

fn poll_interval(config: &AutomatorConfig, override_secs: Option<u64>) -> Duration {
    override_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.poll_interval())
}

fn cmd_init(path: &Path) -> Result<()> {
    let config_path = AutomatorConfig::write_default(path)?;
    println!("Wrote {}", config_path.display());
    println!(
        "Set JULES_API_KEY and GITHUB_TOKEN in the environment before running other commands."
    );
    Ok(())
}

/// Create the session and remember it in the ledger
async fn start_session(
    config: &AutomatorConfig,
    client: &SessionClient,
    args: SessionArgs,
) -> Result<String> {
    let prompt = resolve_prompt(&args.prompt)?;
    let source = match args.source {
        Some(source) => source,
        None => config.source_id()?,
    };
    let branch = args.branch.unwrap_or_else(|| config.default_branch.clone());

    let request = NewSession::new(prompt, source.clone())
        .with_branch(branch)
        .with_title(args.title.clone());
    let session_id = client.create_session(&request).await?;

    let mut ledger = ProcessedLedger::load(&config.ledger_path).await;
    ledger
        .track_session(&session_id, ActiveSession::new(args.title, source))
        .await
        .context("Failed to record session in ledger")?;

    Ok(session_id)
}

async fn cmd_create(config: &AutomatorConfig, args: SessionArgs) -> Result<()> {
    let client = session_client(config)?;
    let session_id = start_session(config, &client, args).await?;
    println!("Created Jules session: {}", session_id);
    Ok(())
}

async fn cmd_message(config: &AutomatorConfig, session_id: &str, prompt: &str) -> Result<()> {
    let client = session_client(config)?;
    let prompt = resolve_prompt(prompt)?;

    let response = client.send_message(session_id, &prompt).await?;
    println!("Message sent to {}", session_id);
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

async fn cmd_loop(
    config: &AutomatorConfig,
    args: SessionArgs,
    interval: Option<u64>,
) -> Result<()> {
    let client = session_client(config)?;
    let session_id = start_session(config, &client, args).await?;
    println!("Created Jules session: {}", session_id);

    let outcome = SessionPoller::new(&client)
        .with_interval(poll_interval(config, interval))
        .poll(&session_id)
        .await?;

    let mut ledger = ProcessedLedger::load(&config.ledger_path).await;
    record_poll_outcome(&mut ledger, &session_id, &outcome).await?;
    report_poll_outcome(&session_id, &outcome);
    Ok(())
}

async fn record_poll_outcome(
    ledger: &mut ProcessedLedger,
    session_id: &str,
    outcome: &PollOutcome,
) -> Result<()> {
    if let Some(url) = outcome
        .session
        .pull_request()
        .and_then(|pr| pr.url.as_deref())
    {
        ledger.record_pull_request(session_id, url).await?;
    }
    if outcome.session.state.is_terminal() {
        ledger.mark_session_processed(session_id).await?;
    }
    Ok(())
}

fn report_poll_outcome(session_id: &str, outcome: &PollOutcome) {
    match outcome.stop {
        PollStop::PullRequestReady => {
            let url = outcome
                .session
                .pull_request()
                .and_then(|pr| pr.url.as_deref())
                .unwrap_or("(no url)");
            println!("Session {} opened a PR: {}", session_id, url);
            println!(
                "Run 'jules review --pr <number> --session-id {}' once reviews land.",
                session_id
            );
        }
        PollStop::Terminal => {
            println!(
                "Session {} finished in state {} without a PR.",
                session_id, outcome.session.state
            );
        }
    }
}

async fn cmd_status(config: &AutomatorConfig, session_id: &str) -> Result<()> {
    let client = session_client(config)?;
    let session = client.get_session(session_id).await?;
    println!("{}", serde_json::to_string_pretty(&session)?);
    Ok(())
}

async fn cmd_list(config: &AutomatorConfig, page_size: u32) -> Result<()> {
    let client = session_client(config)?;
    let sessions = client.list_sessions(page_size).await?;

    if sessions.is_empty() {
        println!("No sessions found");
        return Ok(());
    }

    for s in sessions {
        println!(
            "ID: {} | Title: {} | State: {}",
            s.id,
            s.title.as_deref().unwrap_or("-"),
            s.state
        );
    }
    Ok(())
}

async fn cmd_activities(config: &AutomatorConfig, session_id: &str) -> Result<()> {
    let client = session_client(config)?;
    let activities = client.list_activities(session_id).await?;
    println!("{}", serde_json::to_string_pretty(&activities)?);
    Ok(())
}

async fn cmd_review(
    config: &AutomatorConfig,
    pr: u64,
    session_id: &str,
    poll: bool,
    interval: Option<u64>,
) -> Result<()> {
    // Resolve every credential before the first request
    let (owner, repo) = config.repository()?;
    let token = github_token()?;
    let client = session_client(config)?;

    let judge = OllamaJudge::new(&config.ollama_url, &config.ollama_model, config.judge_timeout())?;
    let reviews = GitHubReviews::new(token, owner, repo).with_api_url(&config.github_api_url);
    let review =
        ReviewLoop::new(client, reviews, judge).with_reviewers(&config.reviewer_logins);

    let mut ledger = ProcessedLedger::load(&config.ledger_path).await;
    info!(
        "Reviewing PR #{} for session {} ({} comments already processed)",
        pr,
        session_id,
        ledger.processed_comments().len()
    );

    let outcome = review
        .process_reviews(&mut ledger, pr, session_id)
        .await
        .with_context(|| format!("Review run for PR #{} failed", pr))?;

    println!("{}", outcome.summary());
    if let ReviewOutcome::FixRequested { response, .. } = &outcome {
        println!("Jules response: {}", response);

        if poll {
            println!("Now polling session for completion...");
            let polled = SessionPoller::new(review.sessions())
                .with_interval(poll_interval(config, interval))
                .poll(session_id)
                .await?;
            record_poll_outcome(&mut ledger, session_id, &polled).await?;
            report_poll_outcome(session_id, &polled);
        }
    }

    Ok(())
}
