//! Unified error types for the automator

use thiserror::Error;

/// Unified error type for all automator operations
#[derive(Error, Debug)]
pub enum JulesError {
    /// A remote service answered with a non-success status
    #[error("{service} returned HTTP {status}: {body}{}", render_hint(.hint))]
    RemoteService {
        service: String,
        status: u16,
        body: String,
        hint: Option<String>,
    },

    /// The request never produced a usable response (connect, timeout, decode)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Missing credentials or an unusable configuration file
    #[error("Configuration error: {0}")]
    Configuration(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

fn render_hint(hint: &Option<String>) -> String {
    match hint {
        Some(hint) => format!("\n[TIP] {}", hint),
        None => String::new(),
    }
}

impl JulesError {
    /// Build a remote-service error from a failed response
    pub fn remote(service: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::RemoteService {
            service: service.into(),
            status,
            body: body.into(),
            hint: None,
        }
    }

    /// Attach a diagnostic hint; the error kind is unchanged
    pub fn with_hint(self, text: impl Into<String>) -> Self {
        match self {
            Self::RemoteService {
                service,
                status,
                body,
                ..
            } => Self::RemoteService {
                service,
                status,
                body,
                hint: Some(text.into()),
            },
            other => other,
        }
    }

    /// HTTP status for remote-service errors
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RemoteService { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Diagnostic hint, if one was attached
    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::RemoteService { hint, .. } => hint.as_deref(),
            _ => None,
        }
    }
}

/// Result type alias using JulesError
pub type Result<T> = std::result::Result<T, JulesError>;
