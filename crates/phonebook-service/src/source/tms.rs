//! Remote `PhoneBookSearch` servers.
//!
//! The adapter walks the remote catalog tree with the same protocol this
//! service answers on its own SOAP endpoint.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use phonebook_core::constants::{MAX_UPSTREAM_CATALOGS, PHONEBOOK_SEARCH_ACTION};
use phonebook_soap::soap::{
    Catalog, Entry, Protocol, SearchPage, SearchQuery, parse_search_response, serialize_search_request,
};
use reqwest::header::CONTENT_TYPE;

use super::upstream::{PhonebookClient, UpstreamFuture, Upstreams};
use super::{Contact, Descriptor, FetchError, FetchFuture, FetchResult, SourceAdapter, SourceItems, SourceTree};

const PAGE_SIZE: usize = 100;
const MAX_PAGES: usize = 1000;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// `PhonebookClient` speaking SOAP over HTTP.
#[derive(Debug, Clone, Default)]
pub struct HttpPhonebookClient {
    client: reqwest::Client,
}

impl HttpPhonebookClient {
    #[must_use]
    pub const fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl PhonebookClient for HttpPhonebookClient {
    #[tracing::instrument(skip(self, query), fields(parent_id = ?query.parent_id, start_id = ?query.start_id))]
    fn search<'a>(&'a self, url: &'a str, query: SearchQuery) -> UpstreamFuture<'a, SearchPage> {
        Box::pin(async move {
            let body = serialize_search_request(&query)
                .map_err(|e| FetchError::Unexpected(format!("failed to build search request: {e}")))?;

            let response = self
                .client
                .post(url)
                .header(CONTENT_TYPE, "text/xml; charset=utf-8")
                .header("SOAPAction", PHONEBOOK_SEARCH_ACTION)
                .body(body)
                .timeout(REQUEST_TIMEOUT)
                .send()
                .await?;

            let status = response.status();
            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(FetchError::Authentication(format!(
                    "phonebook server refused credentials ({status})"
                )));
            }
            if status.as_u16() != 200 {
                return Err(FetchError::Response(format!("Invalid status code {status}")));
            }

            let bytes = response.bytes().await?;
            Ok(parse_search_response(&bytes)?)
        })
    }
}

/// Walks every catalog of a remote phonebook.
pub struct TmsAdapter<'a> {
    client: &'a dyn PhonebookClient,
    mac: &'a str,
    phonebook_url: &'a str,
}

impl<'a> TmsAdapter<'a> {
    #[must_use]
    pub fn new(upstreams: &'a Upstreams, mac: &'a str, phonebook_url: &'a str) -> Self {
        Self {
            client: upstreams.phonebook.as_ref(),
            mac,
            phonebook_url,
        }
    }

    /// Search endpoint URL; a `%s` placeholder is replaced by the operation name.
    fn search_url(&self) -> FetchResult<String> {
        if self.mac.trim().is_empty() {
            return Err(FetchError::Configuration("phonebook MAC address not specified".into()));
        }
        if !self.phonebook_url.contains("://") {
            return Err(FetchError::Configuration(format!(
                "phonebook URL {:?} has no scheme",
                self.phonebook_url
            )));
        }
        Ok(self.phonebook_url.replace("%s", "Search"))
    }

    /// Every catalog and entry at one level, following `StartFromId` paging.
    async fn list(&self, url: &str, parent_id: Option<&str>) -> FetchResult<(Vec<Catalog>, Vec<Entry>)> {
        let mut catalogs = Vec::new();
        let mut entries = Vec::new();
        let mut last_id: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let page = self
                .client
                .search(
                    url,
                    SearchQuery {
                        mac: self.mac.to_owned(),
                        query: String::new(),
                        parent_id: parent_id.map(str::to_owned),
                        start_id: last_id.clone(),
                        limit: PAGE_SIZE,
                    },
                )
                .await?;

            if page.last_id.is_none() || (last_id.is_some() && page.last_id == last_id) {
                break;
            }
            last_id.clone_from(&page.last_id);
            catalogs.extend(page.catalogs);
            entries.extend(page.entries);

            if page.has_last {
                break;
            }
        }

        Ok((catalogs, entries))
    }

    fn walk<'b>(
        &'b self,
        url: &'b str,
        catalogs: Vec<Catalog>,
        visited: &'b mut HashSet<String>,
    ) -> Pin<Box<dyn Future<Output = FetchResult<Vec<SourceTree>>> + Send + 'b>> {
        Box::pin(async move {
            let mut trees = Vec::new();
            for catalog in catalogs {
                if !visited.insert(catalog.id.clone()) {
                    continue;
                }
                if visited.len() > MAX_UPSTREAM_CATALOGS {
                    return Err(FetchError::Unexpected(format!(
                        "phonebook has more than {MAX_UPSTREAM_CATALOGS} catalogs"
                    )));
                }

                let (child_catalogs, entries) = self.list(url, Some(&catalog.id)).await?;
                let children = self.walk(url, child_catalogs, visited).await?;
                trees.push(SourceTree {
                    descriptor: Descriptor::new(catalog.id, catalog.name),
                    children,
                    items: contacts(entries),
                });
            }
            Ok(trees)
        })
    }
}

fn contacts(entries: Vec<Entry>) -> Vec<Contact> {
    entries
        .into_iter()
        .filter_map(|entry| {
            let contact = Contact {
                sip: entry.dial_string(Protocol::Sip).unwrap_or_default().to_owned(),
                h323: entry.dial_string(Protocol::H323).unwrap_or_default().to_owned(),
                h323_e164: String::new(),
                id: entry.id,
                name: entry.name,
            };
            contact.is_dialable().then_some(contact)
        })
        .collect()
}

impl SourceAdapter for TmsAdapter<'_> {
    fn nested_items(&self) -> bool {
        true
    }

    #[tracing::instrument(skip(self), fields(phonebook_url = self.phonebook_url))]
    fn fetch(&self) -> FetchFuture<'_> {
        Box::pin(async move {
            let url = self.search_url()?;
            let (catalogs, entries) = self.list(&url, None).await?;

            let mut visited = HashSet::new();
            let children = self.walk(&url, catalogs, &mut visited).await?;
            tracing::debug!(catalogs = visited.len(), "Walked remote phonebook");

            Ok(SourceItems::Nested(SourceTree {
                descriptor: Descriptor::new("", "Root"),
                children,
                items: contacts(entries),
            }))
        })
    }
}
