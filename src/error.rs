use thiserror::Error;

/// Invalid or incomplete configuration, detected before any network call.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Set GITHUB_TOKEN or GH_TOKEN environment variable")]
    MissingToken,

    #[error("Account name is required: pass --owner or set GITHUB_OWNER")]
    MissingOwner,
}

/// Failure to fetch one API resource. Callers degrade these to empty data.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum FetchError {
    #[error("resource not found")]
    NotFound,

    #[error("rate limited: {message}")]
    RateLimited { message: String },

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("request failed: {0}")]
    Transport(String),
}

impl FetchError {
    /// Traffic endpoints answer 404 for repositories that never had traffic.
    pub fn is_expected(&self) -> bool {
        matches!(self, FetchError::NotFound)
    }

    pub fn from_status(status: u16, message: &str) -> Self {
        match status {
            404 => FetchError::NotFound,
            403 | 429 if message.to_lowercase().contains("rate limit") => {
                FetchError::RateLimited {
                    message: message.to_string(),
                }
            }
            _ => FetchError::Http {
                status,
                message: message.to_string(),
            },
        }
    }
}

impl From<octocrab::Error> for FetchError {
    fn from(err: octocrab::Error) -> Self {
        match err {
            octocrab::Error::GitHub { source, .. } => {
                FetchError::from_status(source.status_code.as_u16(), &source.message)
            }
            other => FetchError::Transport(other.to_string()),
        }
    }
}
