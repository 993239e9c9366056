//! Error types for talking to the Campus Connect API.

use thiserror::Error;

/// Errors raised by the fetch layer, forms, and image attachment.
#[derive(Error, Debug)]
pub enum ClientError {
    /// A required field was missing or malformed; no request was sent
    #[error("{0}")]
    Validation(String),

    /// The operation needs a credential (or a specific role) we don't have
    #[error("{0}")]
    NotLoggedIn(String),

    /// The API answered with a non-2xx status
    #[error("API error {status}: {}", .message.as_deref().unwrap_or("<no message>"))]
    Api {
        status: u16,
        message: Option<String>,
    },

    /// Network failure before a response arrived
    #[error("Request failed: {0}")]
    Transport(String),

    /// The response body did not have the expected shape
    #[error("Failed to parse response: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// The single line shown to the user. Server-provided messages win over
    /// the operation-specific fallback.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Validation(msg) | Self::NotLoggedIn(msg) => msg.clone(),
            Self::Api {
                message: Some(msg), ..
            } if !msg.trim().is_empty() => msg.clone(),
            _ => fallback.to_string(),
        }
    }

    /// True for errors detected before any request was issued
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::NotLoggedIn(_))
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<ureq::Error> for ClientError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, resp) => {
                let body = resp.into_string().unwrap_or_default();
                Self::Api {
                    status,
                    message: extract_message(&body),
                }
            }
            ureq::Error::Transport(t) => Self::Transport(t.to_string()),
        }
    }
}

/// Pull the `message` field out of a JSON error body, if there is one.
pub fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .and_then(|m| m.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// A failed user action: the cause plus the line to show when the cause has
/// nothing better to say
#[derive(Debug)]
pub struct ActionError {
    pub error: ClientError,
    pub fallback: &'static str,
}

impl ActionError {
    pub fn message(&self) -> String {
        self.error.user_message(self.fallback)
    }
}

impl std::fmt::Display for ActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for ActionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Attach an operation-specific fallback message to a client result
pub trait Fallback<T> {
    fn or_say(self, fallback: &'static str) -> std::result::Result<T, ActionError>;
}

impl<T> Fallback<T> for Result<T> {
    fn or_say(self, fallback: &'static str) -> std::result::Result<T, ActionError> {
        self.map_err(|error| ActionError { error, fallback })
    }
}
