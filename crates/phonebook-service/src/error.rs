use thiserror::Error;

/// Service layer errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    DatabaseError(#[from] phonebook_db::error::DbError),

    #[error(transparent)]
    SoapError(#[from] phonebook_soap::error::SoapError),

    #[error(transparent)]
    ParseError(#[from] phonebook_soap::soap::ParseError),

    #[error(transparent)]
    CoreError(#[from] phonebook_core::error::CoreError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Group {0} is not editable")]
    NotEditable(i64),

    #[error("Cannot sync into group {anchor_id} below another source and delete other groups")]
    DeletionSafety { anchor_id: i64 },

    #[error("Invariant violation: {0}")]
    InvariantViolation(&'static str),
}

impl ServiceError {
    /// Whether the error is the caller's fault rather than a store failure.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_)
                | Self::ValidationError(_)
                | Self::NotEditable(_)
                | Self::ParseError(_)
                | Self::CoreError(
                    phonebook_core::error::CoreError::NotFound(_)
                        | phonebook_core::error::CoreError::ValidationError(_)
                        | phonebook_core::error::CoreError::InvalidInput(_)
                        | phonebook_core::error::CoreError::ParseError(_)
                )
        )
    }
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
