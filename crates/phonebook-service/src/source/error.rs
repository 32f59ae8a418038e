use phonebook_db::error::DbError;
use phonebook_soap::soap::ParseError;
use thiserror::Error;

/// Failure of one upstream fetch.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Invalid response: {0}")]
    Response(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Malformed response: {0}")]
    Parse(#[from] ParseError),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error(transparent)]
    Database(#[from] DbError),

    #[error("{0}")]
    Unexpected(String),
}

impl FetchError {
    /// Whether this is an ordinary upstream failure.
    ///
    /// Unexpected errors are additionally reported to error tracking.
    #[must_use]
    pub const fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::Authentication(_) | Self::Response(_) | Self::Connection(_) | Self::Parse(_)
        )
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            Self::Connection(err.to_string())
        } else if let Some(status) = err.status()
            && (status.as_u16() == 401 || status.as_u16() == 403)
        {
            Self::Authentication(err.to_string())
        } else {
            Self::Response(err.to_string())
        }
    }
}

pub type FetchResult<T> = std::result::Result<T, FetchError>;
