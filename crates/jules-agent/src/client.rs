//! Jules session API client
//!
//! Every call is a single request: no retries, no local state. Failed
//! responses surface as `JulesError::RemoteService` with the raw status and
//! body so the caller sees exactly what the service said.

use crate::types::{
    CreateSessionRequest, ListActivitiesResponse, ListSessionsResponse, NewSession,
    SendMessageRequest,
};
use async_trait::async_trait;
use jules_core::config::DEFAULT_JULES_API_URL;
use jules_core::{Activity, JulesError, Result, Session};
use serde_json::Value;
use tracing::{debug, error, info};

const SERVICE: &str = "Jules API";
const API_KEY_HEADER: &str = "X-Goog-Api-Key";

/// Attached to a 404 from session creation
pub const HINT_REPO_NOT_CONNECTED: &str = "404 'Entity not found' usually means the repository is not connected to Jules. \
     Visit https://jules.google.com to make sure the repo is tracked and open in your dashboard.";

/// Attached to a 401 from session creation
pub const HINT_UNAUTHENTICATED: &str =
    "401 'Unauthenticated' means the API key is invalid or lacks permissions.";

/// Operations against the remote session service
#[async_trait]
pub trait SessionApi: Send + Sync {
    /// Create a session and return its identifier
    async fn create_session(&self, session: &NewSession) -> Result<String>;

    /// Fetch a snapshot of a session
    async fn get_session(&self, session_id: &str) -> Result<Session>;

    /// Most recent sessions, at most `page_size`
    async fn list_sessions(&self, page_size: u32) -> Result<Vec<Session>>;

    /// Send a follow-up instruction to a live session
    async fn send_message(&self, session_id: &str, prompt: &str) -> Result<Value>;

    /// Ordered interaction log of a session
    async fn list_activities(&self, session_id: &str) -> Result<Vec<Activity>>;
}

/// reqwest-backed [`SessionApi`]
#[derive(Debug, Clone)]
pub struct SessionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SessionClient {
    /// Create a client against the public Jules API
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_JULES_API_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    /// Point the client at a different API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Map a reqwest failure that produced no usable response
pub(crate) fn transport(service: &str, e: reqwest::Error) -> JulesError {
    JulesError::Transport(format!("{} request failed: {}", service, e))
}

/// Pass successful responses through; turn the rest into `RemoteService`
pub(crate) async fn ensure_success(
    service: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown".to_string());
    error!("{} error {}: {}", service, status, body);
    Err(JulesError::remote(service, status.as_u16(), body))
}

/// Diagnostic for failed session creation; other calls get none
fn creation_hint(status: u16) -> Option<&'static str> {
    match status {
        404 => Some(HINT_REPO_NOT_CONNECTED),
        401 => Some(HINT_UNAUTHENTICATED),
        _ => None,
    }
}

#[async_trait]
impl SessionApi for SessionClient {
    async fn create_session(&self, session: &NewSession) -> Result<String> {
        if session.prompt.trim().is_empty() {
            return Err(JulesError::Other(
                "Cannot create a session with an empty prompt".to_string(),
            ));
        }

        let url = self.url("/sessions");
        info!("Making POST request to {}...", url);

        let response = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&CreateSessionRequest::new(session))
            .send()
            .await
            .map_err(|e| transport(SERVICE, e))?;

        let response = ensure_success(SERVICE, response).await.map_err(|e| {
            match e.status().and_then(creation_hint) {
                Some(hint) => e.with_hint(hint),
                None => e,
            }
        })?;

        let created: Session = response.json().await.map_err(|e| transport(SERVICE, e))?;
        if created.id.is_empty() {
            return Err(JulesError::Other(
                "Jules API accepted the session but returned no id".to_string(),
            ));
        }

        info!("Created Jules session: {}", created.id);
        Ok(created.id)
    }

    async fn get_session(&self, session_id: &str) -> Result<Session> {
        let response = self
            .http
            .get(self.url(&format!("/sessions/{}", session_id)))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| transport(SERVICE, e))?;

        let response = ensure_success(SERVICE, response).await?;
        response.json().await.map_err(|e| transport(SERVICE, e))
    }

    async fn list_sessions(&self, page_size: u32) -> Result<Vec<Session>> {
        let response = self
            .http
            .get(self.url("/sessions"))
            .header(API_KEY_HEADER, &self.api_key)
            .query(&[("pageSize", page_size)])
            .send()
            .await
            .map_err(|e| transport(SERVICE, e))?;

        let response = ensure_success(SERVICE, response).await?;
        let mut listed: ListSessionsResponse =
            response.json().await.map_err(|e| transport(SERVICE, e))?;

        listed.sessions.truncate(page_size as usize);
        debug!("Listed {} sessions", listed.sessions.len());
        Ok(listed.sessions)
    }

    async fn send_message(&self, session_id: &str, prompt: &str) -> Result<Value> {
        debug!(
            "Sending {} char message to session {}",
            prompt.len(),
            session_id
        );

        let response = self
            .http
            .post(self.url(&format!("/sessions/{}:sendMessage", session_id)))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&SendMessageRequest { prompt })
            .send()
            .await
            .map_err(|e| transport(SERVICE, e))?;

        let response = ensure_success(SERVICE, response).await?;
        let text = response.text().await.map_err(|e| transport(SERVICE, e))?;
        if text.trim().is_empty() {
            return Ok(Value::Object(Default::default()));
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn list_activities(&self, session_id: &str) -> Result<Vec<Activity>> {
        let response = self
            .http
            .get(self.url(&format!("/sessions/{}/activities", session_id)))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| transport(SERVICE, e))?;

        let response = ensure_success(SERVICE, response).await?;
        let listed: ListActivitiesResponse =
            response.json().await.map_err(|e| transport(SERVICE, e))?;
        Ok(listed.activities)
    }
}
