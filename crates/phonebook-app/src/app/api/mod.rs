mod addressbook;
mod app_specific;
mod json_search;
mod soap;

use salvo::http::StatusCode;
use salvo::writing::Json;
use salvo::{Response, Router};
use serde::Serialize;

use crate::error::AppError;

pub use phonebook_core::constants::{
    API_ROUTE_COMPONENT, API_ROUTE_PREFIX, JSON_SEARCH_ROUTE_COMPONENT, JSON_SEARCH_ROUTE_PREFIX,
    SOAP_ROUTE_COMPONENT, SOAP_ROUTE_PREFIX,
};

/// Error response payload
#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub error: String,
}

/// Answers a JSON error with the status matching `err`.
pub(crate) fn render_error(res: &mut Response, err: &AppError) {
    let status = err.status_code();
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %err, report = true, "Request failed");
    } else {
        tracing::debug!(error = %err, %status, "Request rejected");
    }
    res.status_code(status);
    res.render(Json(ErrorResponse {
        error: err.to_string(),
    }));
}

/// ## Summary
/// Constructs the main router: the admin API, the endpoint SOAP phonebook and
/// the JSON search.
///
/// ## Errors
/// Returns an error if any child route handler fails to initialize.
pub fn routes() -> anyhow::Result<Router> {
    Ok(Router::new()
        .push(
            Router::with_path(API_ROUTE_COMPONENT)
                .push(app_specific::routes())
                .push(addressbook::routes()),
        )
        .push(soap::routes())
        .push(json_search::routes()))
}
