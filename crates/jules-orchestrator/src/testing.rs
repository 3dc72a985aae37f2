//! In-memory fakes for the adapter traits

use async_trait::async_trait;
use jules_agent::{Judge, NewSession, ReviewSource, SessionApi};
use jules_core::{
    Activity, JulesError, PullRequestRef, Result, ReviewComment, Session, SessionOutput,
    SessionState, Verdict,
};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub fn session_snapshot(state: &str, pr_url: Option<&str>) -> Session {
    Session {
        id: "abc".to_string(),
        state: SessionState::from(state.to_string()),
        outputs: pr_url
            .map(|url| {
                vec![SessionOutput {
                    pull_request: Some(PullRequestRef {
                        url: Some(url.to_string()),
                        ..Default::default()
                    }),
                    ..Default::default()
                }]
            })
            .unwrap_or_default(),
        ..Default::default()
    }
}

pub fn review_comment(
    id: u64,
    author: &str,
    path: &str,
    line: Option<u32>,
    body: &str,
) -> ReviewComment {
    ReviewComment {
        id,
        author: author.to_string(),
        path: path.to_string(),
        line,
        body: body.to_string(),
    }
}

/// Session gateway that replays snapshots and records messages
#[derive(Default)]
pub struct MockSessions {
    snapshots: Mutex<VecDeque<Session>>,
    get_error: Mutex<Option<JulesError>>,
    send_error: Mutex<Option<JulesError>>,
    sent: Mutex<Vec<(String, String)>>,
    get_calls: AtomicUsize,
}

impl MockSessions {
    /// Snapshots are returned in order; the last one repeats
    pub fn with_snapshots(snapshots: Vec<Session>) -> Self {
        Self {
            snapshots: Mutex::new(snapshots.into()),
            ..Default::default()
        }
    }

    pub fn failing_get(error: JulesError) -> Self {
        Self {
            get_error: Mutex::new(Some(error)),
            ..Default::default()
        }
    }

    pub fn failing_send(error: JulesError) -> Self {
        Self {
            send_error: Mutex::new(Some(error)),
            ..Default::default()
        }
    }

    pub fn sent_messages(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionApi for MockSessions {
    async fn create_session(&self, _session: &NewSession) -> Result<String> {
        Ok("mock-session".to_string())
    }

    async fn get_session(&self, _session_id: &str) -> Result<Session> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.get_error.lock().unwrap().take() {
            return Err(error);
        }

        let mut snapshots = self.snapshots.lock().unwrap();
        let next = if snapshots.len() > 1 {
            snapshots.pop_front()
        } else {
            snapshots.front().cloned()
        };
        next.ok_or_else(|| JulesError::Other("no snapshot configured".to_string()))
    }

    async fn list_sessions(&self, _page_size: u32) -> Result<Vec<Session>> {
        Ok(Vec::new())
    }

    async fn send_message(&self, session_id: &str, prompt: &str) -> Result<Value> {
        if let Some(error) = self.send_error.lock().unwrap().take() {
            return Err(error);
        }
        self.sent
            .lock()
            .unwrap()
            .push((session_id.to_string(), prompt.to_string()));
        Ok(json!({}))
    }

    async fn list_activities(&self, _session_id: &str) -> Result<Vec<Activity>> {
        Ok(Vec::new())
    }
}

/// Review source returning a fixed comment list
pub struct StaticReviews {
    comments: Vec<ReviewComment>,
    error: Mutex<Option<JulesError>>,
}

impl StaticReviews {
    pub fn new(comments: Vec<ReviewComment>) -> Self {
        Self {
            comments,
            error: Mutex::new(None),
        }
    }

    pub fn failing(error: JulesError) -> Self {
        Self {
            comments: Vec::new(),
            error: Mutex::new(Some(error)),
        }
    }
}

#[async_trait]
impl ReviewSource for StaticReviews {
    async fn fetch_comments(&self, _pr_number: u64) -> Result<Vec<ReviewComment>> {
        if let Some(error) = self.error.lock().unwrap().take() {
            return Err(error);
        }
        Ok(self.comments.clone())
    }
}

/// Judge that always returns the same verdict and counts calls
pub struct FixedJudge {
    verdict: Verdict,
    calls: AtomicUsize,
}

impl FixedJudge {
    pub fn new(verdict: Verdict) -> Self {
        Self {
            verdict,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Judge for FixedJudge {
    async fn assess(&self, _comments: &[ReviewComment]) -> Verdict {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.verdict
    }
}
