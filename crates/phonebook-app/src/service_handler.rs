use salvo::async_trait;

use phonebook_core::error::CoreError;
use phonebook_service::service::PhonebookService;

use crate::error::AppResult;

/// Hoop that makes the phonebook service available to handlers.
pub struct ServiceHandler {
    pub service: PhonebookService,
}

#[async_trait]
impl salvo::Handler for ServiceHandler {
    #[tracing::instrument(skip(self, _req, depot, _res, _ctrl))]
    async fn handle(
        &self,
        _req: &mut salvo::Request,
        depot: &mut salvo::Depot,
        _res: &mut salvo::Response,
        _ctrl: &mut salvo::FlowCtrl,
    ) {
        depot.inject(self.service.clone());
    }
}

/// ## Summary
/// Retrieves the phonebook service from the depot.
///
/// ## Errors
/// Returns an error if the service is not found in the depot.
pub fn get_service_from_depot(depot: &salvo::Depot) -> AppResult<PhonebookService> {
    depot
        .obtain::<PhonebookService>()
        .cloned()
        .map_err(|_err| CoreError::InvariantViolation("Phonebook service not found in depot").into())
}
