//! Error taxonomy shared by every provider.

use tracing::error;

/// Errors raised by the provider layer.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Invalid configuration or argument, detected before any network call.
    #[error("validation error: {0}")]
    Validation(String),

    /// Failed exchange with the backend: non-2xx status, transport failure or
    /// unusable response body.
    #[error("{message}")]
    Api {
        status: Option<u16>,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, LlmError>;

impl LlmError {
    pub fn validation(message: impl Into<String>) -> Self {
        LlmError::Validation(message.into())
    }

    /// Communication error without an HTTP status.
    pub fn api(message: impl Into<String>) -> Self {
        LlmError::Api {
            status: None,
            message: message.into(),
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            LlmError::Api { status, .. } => *status,
            LlmError::Validation(_) => None,
        }
    }

    /// Whether the backend rejected the credential itself
    /// (401, 403, or a 400 reporting an invalid API key).
    pub fn is_auth_rejection(&self) -> bool {
        match self {
            LlmError::Api {
                status: Some(401 | 403),
                ..
            } => true,
            LlmError::Api {
                status: Some(400),
                message,
            } => message.contains("API_KEY_INVALID"),
            _ => false,
        }
    }

    /// Prefix the message with some context, keeping kind and status.
    pub fn context(self, context: &str) -> Self {
        match self {
            LlmError::Validation(msg) => LlmError::Validation(format!("{context}: {msg}")),
            LlmError::Api { status, message } => LlmError::Api {
                status,
                message: format!("{context}: {message}"),
            },
        }
    }
}

/// The request URL is dropped from the message; it can carry credentials.
impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        let status = e.status().map(|s| s.as_u16());
        LlmError::Api {
            status,
            message: format!("communication error: {}", e.without_url()),
        }
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(e: serde_json::Error) -> Self {
        LlmError::api(format!("invalid response body: {e}"))
    }
}

/// Pass 2xx responses through; turn anything else into an `Api` error
/// embedding the status code and body text.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
    provider: &str,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error body".to_string());
    error!(provider, status = %status, body = %body, "API error");

    Err(LlmError::Api {
        status: Some(status.as_u16()),
        message: format!("{provider} error ({status}): {body}"),
    })
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
