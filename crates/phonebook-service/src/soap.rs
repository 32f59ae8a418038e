//! `PhoneBookSearch` requests answered from an address book.

use phonebook_core::types::ExternalRef;
use phonebook_db::model::{AddressBook, Item};
use phonebook_soap::soap::{
    Catalog, Entry, Protocol, Route, SearchRequest, SearchResult, parse_search_request,
    serialize_search_result,
};

use crate::error::ServiceResult;
use crate::search::{SearchHits, limit_search};
use crate::service::PhonebookService;

fn routes(item: &Item) -> Vec<Route> {
    [(Protocol::Sip, &item.sip), (Protocol::H323, &item.h323)]
        .into_iter()
        .filter(|(_, dial_string)| !dial_string.is_empty())
        .map(|(protocol, dial_string)| Route {
            protocol,
            dial_string: dial_string.clone(),
        })
        .collect()
}

/// Renders one page of hits as a `SearchResult`.
///
/// `IsLast` is set when the page holds fewer entries than the requested limit.
#[must_use]
pub fn render_result(book: &AddressBook, request: &SearchRequest, hits: SearchHits) -> SearchResult {
    let is_last = hits.len() < request.limit_or_default();
    SearchResult {
        name: book.title.clone(),
        is_first: request.last_id.is_none(),
        is_last,
        catalogs: hits
            .groups
            .into_iter()
            .map(|group| Catalog {
                id: ExternalRef::Group(group.id).to_string(),
                name: group.title,
            })
            .collect(),
        entries: hits
            .items
            .into_iter()
            .map(|item| Entry {
                id: ExternalRef::Item(item.id).to_string(),
                routes: routes(&item),
                name: item.title,
            })
            .collect(),
    }
}

impl PhonebookService {
    /// ## Summary
    /// Answers a `Search` envelope posted by an endpoint.
    ///
    /// The MAC address in the request is informational and never checked.
    ///
    /// ## Errors
    /// Returns a parse error for a body without a `Search` element or with a
    /// non-numeric `MaxResult`, and store or serialization errors.
    #[tracing::instrument(skip(self, book, body), fields(address_book_id = book.id, body_len = body.len()))]
    pub async fn soap_search(&self, book: &AddressBook, body: &[u8]) -> ServiceResult<String> {
        let request = parse_search_request(body)?;
        tracing::debug!(?request, "Phonebook search");

        let hits = limit_search(
            self.store(),
            book.id,
            &request.value,
            request.group_id.as_deref(),
            request.limit_or_default(),
            request.last_id.as_deref(),
            0,
        )
        .await?;

        let result = render_result(book, &request, hits);
        Ok(serialize_search_result(&result)?)
    }
}
