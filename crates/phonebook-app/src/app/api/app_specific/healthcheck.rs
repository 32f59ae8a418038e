use salvo::http::StatusCode;
use salvo::{Depot, Response, Router, handler};

use crate::service_handler::get_service_from_depot;

/// Answers "OK" once the directory store responds.
#[handler]
async fn healthcheck(depot: &Depot, res: &mut Response) {
    let reachable = match get_service_from_depot(depot) {
        Ok(service) => service.store().list_address_books().await.is_ok(),
        Err(_) => false,
    };

    if reachable {
        res.render("OK");
    } else {
        tracing::warn!("Healthcheck failed: store unreachable");
        res.status_code(StatusCode::SERVICE_UNAVAILABLE);
        res.render("UNAVAILABLE");
    }
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path("healthcheck").get(healthcheck)
}
