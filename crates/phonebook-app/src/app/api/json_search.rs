//! JSON search over one address book, for web front ends.

use salvo::http::StatusCode;
use salvo::writing::Json;
use salvo::{Depot, Request, Response, Router, handler};
use serde::Serialize;

use phonebook_core::constants::JSON_SEARCH_ROUTE_COMPONENT;
use phonebook_core::types::ExternalRef;
use phonebook_db::model::{Item, SyncGroup};
use phonebook_service::search::SearchHits;

use crate::app::api::{ErrorResponse, render_error};
use crate::error::AppError;
use crate::service_handler::get_service_from_depot;

#[derive(Debug, Serialize)]
struct GroupHit {
    id: String,
    title: String,
    parent: Option<String>,
}

impl From<SyncGroup> for GroupHit {
    fn from(group: SyncGroup) -> Self {
        Self {
            id: ExternalRef::Group(group.id).to_string(),
            title: group.title,
            parent: group.parent_id.map(|id| ExternalRef::Group(id).to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct ItemHit {
    id: String,
    title: String,
    sip: String,
    h323: String,
    h323_e164: String,
}

impl From<Item> for ItemHit {
    fn from(item: Item) -> Self {
        Self {
            id: ExternalRef::Item(item.id).to_string(),
            title: item.title,
            sip: item.sip,
            h323: item.h323,
            h323_e164: item.h323_e164,
        }
    }
}

/// Search response payload
#[derive(Debug, Serialize)]
struct SearchResponse {
    groups: Vec<GroupHit>,
    items: Vec<ItemHit>,
    group_count: usize,
    item_count: usize,
}

impl SearchResponse {
    /// Slices groups and items independently; counts are taken before slicing.
    fn new(hits: SearchHits, offset: usize, limit: Option<usize>) -> Self {
        let limit = limit.unwrap_or(usize::MAX);
        Self {
            group_count: hits.groups.len(),
            item_count: hits.items.len(),
            groups: hits
                .groups
                .into_iter()
                .skip(offset)
                .take(limit)
                .map(GroupHit::from)
                .collect(),
            items: hits
                .items
                .into_iter()
                .skip(offset)
                .take(limit)
                .map(ItemHit::from)
                .collect(),
        }
    }
}

/// ## Summary
/// `GET /json/search/{key}/?q=&group=&offset=&limit=`
///
/// ## Errors
/// 404 for an unknown key, 500 for store failures.
#[handler]
#[tracing::instrument(skip_all, fields(path = %req.uri().path()))]
async fn json_search(req: &mut Request, depot: &Depot, res: &mut Response) {
    let service = match get_service_from_depot(depot) {
        Ok(service) => service,
        Err(e) => {
            render_error(res, &e);
            return;
        }
    };

    let key = req.param::<String>("key").unwrap_or_default();
    let book = match service.store().find_address_book_by_secret(&key).await {
        Ok(Some(book)) => book,
        Ok(None) => {
            res.status_code(StatusCode::NOT_FOUND);
            res.render(Json(ErrorResponse {
                error: "Address book not found".to_string(),
            }));
            return;
        }
        Err(e) => {
            render_error(res, &AppError::from(e));
            return;
        }
    };

    let value = req.query::<String>("q").unwrap_or_default();
    let group = req.query::<String>("group").filter(|g| !g.trim().is_empty());
    let offset = req.query::<usize>("offset").unwrap_or(0);
    let limit = req.query::<usize>("limit");

    match service.search(book.id, &value, group.as_deref()).await {
        Ok(hits) => res.render(Json(SearchResponse::new(hits, offset, limit))),
        Err(e) => render_error(res, &AppError::from(e)),
    }
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path(JSON_SEARCH_ROUTE_COMPONENT).push(Router::with_path("{key}").get(json_search))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(id: i64, title: &str) -> SyncGroup {
        SyncGroup {
            id,
            address_book_id: 1,
            parent_id: Some(1),
            title: title.into(),
            full_path: title.into(),
        }
    }

    fn item(id: i64, title: &str) -> Item {
        Item {
            id,
            group_id: 1,
            title: title.into(),
            description: String::new(),
            sip: format!("{id}@example.com"),
            h323: String::new(),
            h323_e164: String::new(),
            tel: String::new(),
            external_id: String::new(),
        }
    }

    #[test]
    fn lists_are_sliced_independently() {
        let hits = SearchHits {
            groups: vec![group(2, "A"), group(3, "B")],
            items: vec![item(4, "x"), item(5, "y"), item(6, "z")],
        };

        let response = SearchResponse::new(hits, 1, Some(1));
        assert_eq!(response.group_count, 2);
        assert_eq!(response.item_count, 3);
        assert_eq!(response.groups.len(), 1);
        assert_eq!(response.groups[0].id, "g-3");
        assert_eq!(response.groups[0].parent.as_deref(), Some("g-1"));
        assert_eq!(response.items.len(), 1);
        assert_eq!(response.items[0].id, "i-5");
    }

    #[test]
    fn missing_limit_returns_the_rest() {
        let hits = SearchHits {
            groups: vec![group(2, "A")],
            items: vec![item(4, "x"), item(5, "y")],
        };

        let response = SearchResponse::new(hits, 0, None);
        assert_eq!(response.groups.len(), 1);
        assert_eq!(response.items.len(), 2);
        assert_eq!(response.items[1].sip, "5@example.com");
    }
}
