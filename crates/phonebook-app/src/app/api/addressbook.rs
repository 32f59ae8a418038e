//! Address book administration.

use salvo::http::StatusCode;
use salvo::writing::Json;
use salvo::{Depot, Request, Response, Router, handler};
use serde::{Deserialize, Serialize};

use phonebook_db::db::enums::AddressBookKind;
use phonebook_db::model::AddressBook;
use phonebook_service::book::{BookSettings, soap_url};

use crate::app::api::{ErrorResponse, render_error};
use crate::config::get_config_from_depot;
use crate::error::{AppError, AppResult};
use crate::service_handler::get_service_from_depot;

/// Create address book request payload
#[derive(Debug, Deserialize)]
struct CreateRequest {
    title: String,
    #[serde(default)]
    kind: AddressBookKind,
    #[serde(default)]
    external_url: String,
    #[serde(default)]
    external_edit_url: String,
}

/// Copy request payload
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CopyRequest {
    new_title: Option<String>,
    /// Snapshot the manual entries into the copy instead of linking them.
    copy_editable_items: bool,
}

/// Address book response payload
#[derive(Debug, Serialize)]
struct BookResponse {
    id: i64,
    title: String,
    secret_key: String,
    soap_url: String,
}

impl BookResponse {
    fn new(book: AddressBook, origin: &str) -> Self {
        Self {
            soap_url: soap_url(&book, origin),
            id: book.id,
            title: book.title,
            secret_key: book.secret_key,
        }
    }
}

fn book_id(req: &Request, res: &mut Response) -> Option<i64> {
    let id = req.param::<i64>("id");
    if id.is_none() {
        res.status_code(StatusCode::BAD_REQUEST);
        res.render(Json(ErrorResponse {
            error: "Invalid address book id".to_string(),
        }));
    }
    id
}

async fn parse_body<T>(req: &mut Request) -> AppResult<T>
where
    T: Default + for<'de> Deserialize<'de>,
{
    let bytes = req.payload().await.map_err(|e| {
        AppError::CoreError(phonebook_core::error::CoreError::InvalidInput(e.to_string()))
    })?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(bytes).map_err(|e| {
        AppError::CoreError(phonebook_core::error::CoreError::InvalidInput(e.to_string()))
    })
}

/// `POST /api/addressbook`
#[handler]
#[tracing::instrument(skip_all)]
async fn create_address_book(req: &mut Request, depot: &Depot, res: &mut Response) {
    let create_req: CreateRequest = match req.parse_json().await {
        Ok(r) => r,
        Err(e) => {
            tracing::debug!(error = ?e, "Invalid create request");
            res.status_code(StatusCode::BAD_REQUEST);
            res.render(Json(ErrorResponse {
                error: "Invalid request body".to_string(),
            }));
            return;
        }
    };

    let result = async {
        let service = get_service_from_depot(depot)?;
        let config = get_config_from_depot(depot)?;
        let book = service
            .create_address_book(BookSettings {
                title: create_req.title,
                kind: create_req.kind,
                external_url: create_req.external_url,
                external_edit_url: create_req.external_edit_url,
            })
            .await?;
        Ok::<_, AppError>(BookResponse::new(book, &config.server.origin()))
    }
    .await;

    match result {
        Ok(body) => {
            res.status_code(StatusCode::CREATED);
            res.render(Json(body));
        }
        Err(e) => render_error(res, &e),
    }
}

/// `POST /api/addressbook/{id}/sync`, answered with the sync report.
#[handler]
#[tracing::instrument(skip_all)]
async fn sync_address_book(req: &mut Request, depot: &Depot, res: &mut Response) {
    let Some(id) = book_id(req, res) else {
        return;
    };

    let result = async {
        let service = get_service_from_depot(depot)?;
        Ok::<_, AppError>(service.sync_address_book(id).await?)
    }
    .await;

    match result {
        Ok(report) => res.render(Json(report)),
        Err(e) => render_error(res, &e),
    }
}

/// `POST /api/addressbook/{id}/copy`
#[handler]
#[tracing::instrument(skip_all)]
async fn copy_address_book(req: &mut Request, depot: &Depot, res: &mut Response) {
    let Some(id) = book_id(req, res) else {
        return;
    };

    let result = async {
        let copy_req: CopyRequest = parse_body(req).await?;
        let service = get_service_from_depot(depot)?;
        let config = get_config_from_depot(depot)?;
        let book = service
            .copy(id, copy_req.new_title.as_deref(), !copy_req.copy_editable_items)
            .await?;
        Ok::<_, AppError>(BookResponse::new(book, &config.server.origin()))
    }
    .await;

    match result {
        Ok(body) => {
            res.status_code(StatusCode::CREATED);
            res.render(Json(body));
        }
        Err(e) => render_error(res, &e),
    }
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path("addressbook")
        .post(create_address_book)
        .push(
            Router::with_path("{id}")
                .push(Router::with_path("sync").post(sync_address_book))
                .push(Router::with_path("copy").post(copy_address_book)),
        )
}
