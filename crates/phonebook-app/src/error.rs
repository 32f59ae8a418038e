use salvo::http::StatusCode;
use thiserror::Error;

use phonebook_core::error::CoreError;
use phonebook_service::error::ServiceError;

/// Application-level errors (HTTP layer)
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    ServiceError(#[from] ServiceError),

    #[error(transparent)]
    DatabaseError(#[from] phonebook_db::error::DbError),

    #[error(transparent)]
    CoreError(#[from] CoreError),
}

impl AppError {
    /// Status answered to the client for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ServiceError(
                ServiceError::NotFound(_) | ServiceError::CoreError(CoreError::NotFound(_)),
            )
            | Self::CoreError(CoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::ServiceError(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            Self::CoreError(
                CoreError::ValidationError(_) | CoreError::InvalidInput(_) | CoreError::ParseError(_),
            ) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;
