//! Legacy `PhoneBookSearch` endpoint polled by video endpoints.
//!
//! Each address book answers under its own secret URL. Only `POST` with the
//! search `SOAPAction` is served.

use salvo::http::{HeaderValue, StatusCode};
use salvo::writing::Text;
use salvo::{Depot, Request, Response, Router, handler};

use phonebook_core::constants::{PHONEBOOK_SEARCH_ACTION, SOAP_ROUTE_COMPONENT};

use crate::error::AppError;
use crate::service_handler::get_service_from_depot;

/// `SOAPAction` is sent quoted by most endpoints.
fn is_search_action(req: &Request) -> bool {
    req.headers()
        .get("SOAPAction")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim().trim_matches('"') == PHONEBOOK_SEARCH_ACTION)
}

fn not_found(res: &mut Response) {
    res.status_code(StatusCode::NOT_FOUND);
    res.render(Text::Plain("Not found"));
}

#[handler]
async fn method_not_supported(req: &mut Request, res: &mut Response) {
    res.status_code(StatusCode::BAD_REQUEST);
    res.render(Text::Plain(format!("Method {} not supported.", req.method())));
}

/// ## Summary
/// Answers a `Search` envelope for the address book owning the secret key.
///
/// ## Errors
/// 404 for an unknown key or a foreign `SOAPAction`, 400 for a malformed
/// envelope, 500 for store failures.
#[handler]
#[tracing::instrument(skip_all, fields(method = "POST", path = %req.uri().path()))]
pub async fn phonebook_search(req: &mut Request, depot: &Depot, res: &mut Response) {
    if !is_search_action(req) {
        tracing::debug!("Unexpected SOAPAction");
        not_found(res);
        return;
    }

    let Some(key) = req.param::<String>("key") else {
        not_found(res);
        return;
    };

    let service = match get_service_from_depot(depot) {
        Ok(service) => service,
        Err(e) => {
            tracing::error!(error = %e, "Failed to get phonebook service");
            res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
            return;
        }
    };

    let book = match service.store().find_address_book_by_secret(&key).await {
        Ok(Some(book)) => book,
        Ok(None) => {
            not_found(res);
            return;
        }
        Err(e) => {
            tracing::error!(error = %e, report = true, "Address book lookup failed");
            res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
            return;
        }
    };

    let body = match req.payload().await {
        Ok(bytes) => bytes.to_vec(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read request body");
            res.status_code(StatusCode::BAD_REQUEST);
            return;
        }
    };

    let xml = match service.soap_search(&book, &body).await {
        Ok(xml) => xml,
        Err(e) => {
            let err = AppError::from(e);
            let status = err.status_code();
            if status == StatusCode::INTERNAL_SERVER_ERROR {
                tracing::error!(error = %err, report = true, "Phonebook search failed");
            } else {
                tracing::debug!(error = %err, "Malformed phonebook search");
            }
            res.status_code(status);
            res.render(Text::Plain(err.to_string()));
            return;
        }
    };

    res.status_code(StatusCode::OK);
    #[expect(
        clippy::let_underscore_must_use,
        reason = "Header addition failure is non-fatal"
    )]
    let _ = res.add_header(
        "Content-Type",
        HeaderValue::from_static("text/xml; charset=utf-8"),
        true,
    );
    #[expect(
        clippy::let_underscore_must_use,
        reason = "Write body failure is non-fatal"
    )]
    let _ = res.write_body(xml);
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path(SOAP_ROUTE_COMPONENT).push(
        Router::with_path("{key}")
            .get(method_not_supported)
            .post(phonebook_search),
    )
}
