use thiserror::Error;

use crate::soap::parse::ParseError;

/// Errors raised by the `PhoneBookSearch` codec.
#[derive(Error, Debug)]
pub enum SoapError {
    #[error("SOAP parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("SOAP write error: {0}")]
    Write(#[from] std::io::Error),

    #[error("SOAP output is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

pub type SoapResult<T> = std::result::Result<T, SoapError>;
