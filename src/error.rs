use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single GraphQL fetch.
///
/// Cloneable so one in-flight fetch can hand the same outcome to every
/// caller waiting on its key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request failed{}: {message}", status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    Transport {
        status: Option<u16>,
        message: String,
    },

    #[error("authentication failed: {message}")]
    Auth { message: String },

    #[error("Empty response from API")]
    EmptyResponse,

    #[error("GraphQL errors: {}", messages.join(", "))]
    GraphQL { messages: Vec<String> },

    #[error("partial response, GraphQL errors: {}", messages.join(", "))]
    PartialData { messages: Vec<String> },

    #[error("unexpected response shape: {message}")]
    Decode { message: String },
}

impl FetchError {
    /// Only transport failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Map an HTTP status to the matching error kind.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => Self::Auth { message },
            _ => Self::Transport {
                status: Some(status),
                message,
            },
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::Decode {
                message: err.to_string(),
            };
        }
        match err.status() {
            Some(status) => Self::from_status(status.as_u16(), err.to_string()),
            None => Self::Transport {
                status: None,
                message: err.to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode {
            message: err.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum GhiError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read config file at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("No GitHub token found. Set GITHUB_TOKEN env var or add token to ~/.config/ghi/config.toml")]
    MissingToken,

    #[error(
        "No repository configured. Set GITHUB_REPO_OWNER and GITHUB_REPO_NAME or add owner/name to ~/.config/ghi/config.toml"
    )]
    MissingRepository,

    #[error("Issue not found: #{0}")]
    IssueNotFound(u64),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, GhiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transport_is_retryable() {
        assert!(FetchError::Transport {
            status: None,
            message: "connection reset".into()
        }
        .is_retryable());
        assert!(!FetchError::Auth {
            message: "bad credentials".into()
        }
        .is_retryable());
        assert!(!FetchError::EmptyResponse.is_retryable());
        assert!(!FetchError::GraphQL { messages: vec![] }.is_retryable());
        assert!(!FetchError::PartialData { messages: vec![] }.is_retryable());
    }

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            FetchError::from_status(401, String::new()),
            FetchError::Auth { .. }
        ));
        assert!(matches!(
            FetchError::from_status(403, String::new()),
            FetchError::Auth { .. }
        ));
        assert!(matches!(
            FetchError::from_status(502, String::new()),
            FetchError::Transport {
                status: Some(502),
                ..
            }
        ));
    }

    #[test]
    fn test_transport_display_includes_status() {
        let err = FetchError::Transport {
            status: Some(500),
            message: "boom".into(),
        };
        assert_eq!(err.to_string(), "request failed (status 500): boom");

        let err = FetchError::Transport {
            status: None,
            message: "timed out".into(),
        };
        assert_eq!(err.to_string(), "request failed: timed out");
    }
}
