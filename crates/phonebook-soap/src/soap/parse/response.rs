//! `SearchResponse` parsing, used when walking an upstream phonebook server.

use std::ops::ControlFlow;

use phonebook_core::constants::PHONEBOOK_NAMESPACE;

use super::error::{ParseError, ParseResult};
use super::{ElementName, Visitor, walk};
use crate::soap::core::{Catalog, Entry, Protocol, Route, SearchPage};

#[derive(Debug, Default)]
struct PendingRoute {
    protocol: String,
    dial_string: String,
}

#[derive(Debug, Default)]
struct ResponseVisitor {
    found: bool,
    /// Local names open below `SearchResult`, `None` outside the phonebook namespace.
    path: Option<Vec<Option<String>>>,
    page: SearchPage,
    catalog: Catalog,
    entry: Entry,
    route: PendingRoute,
    is_last: bool,
    total: Option<String>,
}

impl Visitor for ResponseVisitor {
    fn start(&mut self, name: &ElementName) {
        if let Some(path) = self.path.as_mut() {
            let step = (name.namespace.as_deref() == Some(PHONEBOOK_NAMESPACE))
                .then(|| name.local_name.clone());
            path.push(step);
            let names: Option<Vec<&str>> = path.iter().map(Option::as_deref).collect();
            match names.as_deref() {
                Some(["Catalog"]) => {
                    self.catalog = Catalog::default();
                    self.is_last = false;
                }
                Some(["Entry"]) => {
                    self.entry = Entry::default();
                    self.is_last = false;
                }
                Some(["Entry", "Route"]) => self.route = PendingRoute::default(),
                _ => {}
            }
        } else if !self.found && name.is(PHONEBOOK_NAMESPACE, "SearchResult") {
            self.found = true;
            self.path = Some(Vec::new());
        } else {
            // Envelope and response wrappers
        }
    }

    fn end(&mut self, _name: &ElementName, text: &str) -> ControlFlow<()> {
        let Some(path) = self.path.as_mut() else {
            return ControlFlow::Continue(());
        };
        if path.is_empty() {
            self.path = None;
            return ControlFlow::Break(());
        }

        let names: Option<Vec<&str>> = path.iter().map(Option::as_deref).collect();
        match names.as_deref() {
            Some(["NoOfEntries"]) => self.total = Some(text.trim().to_owned()),
            Some(["Catalog", "Name"]) => self.catalog.name = text.to_owned(),
            Some(["Catalog", "Id"]) => self.catalog.id = text.trim().to_owned(),
            Some(["Entry", "Name"]) => self.entry.name = text.to_owned(),
            Some(["Entry", "Id"]) => self.entry.id = text.trim().to_owned(),
            Some(["Catalog" | "Entry", "IsLast"]) => self.is_last = text.trim() == "true",
            Some(["Entry", "Route", "Protocol"]) => self.route.protocol = text.trim().to_owned(),
            Some(["Entry", "Route", "DialString"]) => {
                self.route.dial_string = text.trim().to_owned();
            }
            Some(["Entry", "Route"]) => {
                let route = std::mem::take(&mut self.route);
                if let Some(protocol) = Protocol::from_label(&route.protocol) {
                    self.entry.routes.push(Route {
                        protocol,
                        dial_string: route.dial_string,
                    });
                }
            }
            Some(["Catalog"]) => {
                let catalog = std::mem::take(&mut self.catalog);
                self.page.last_id = Some(catalog.id.clone());
                self.page.has_last = self.is_last;
                self.page.catalogs.push(catalog);
            }
            Some(["Entry"]) => {
                let entry = std::mem::take(&mut self.entry);
                self.page.last_id = Some(entry.id.clone());
                self.page.has_last = self.is_last;
                self.page.entries.push(entry);
            }
            _ => {}
        }

        path.pop();
        ControlFlow::Continue(())
    }
}

/// Parses a `SearchResponse` returned by an upstream phonebook server.
///
/// ## Summary
/// Reads the first `SearchResult` in the phonebook namespace: its catalogs,
/// entries with their routes, the cursor of the last element and whether the
/// server flagged it as the last one.
///
/// ## Errors
/// Returns an error if the XML is malformed or there is no `SearchResult`.
#[tracing::instrument(skip(xml), fields(xml_len = xml.len()))]
pub fn parse_search_response(xml: &[u8]) -> ParseResult<SearchPage> {
    let mut visitor = ResponseVisitor::default();
    walk(xml, &mut visitor)?;

    if !visitor.found {
        return Err(ParseError::missing_element("SearchResult"));
    }

    let mut page = visitor.page;
    page.total = visitor.total.and_then(|raw| raw.parse().ok());
    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soap::parse::ParseErrorKind;

    const UPSTREAM_PAGE: &[u8] = br#"<?xml version="1.0" encoding="utf-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <SearchResponse xmlns="http://www.tandberg.net/2004/06/PhoneBookSearch/">
      <SearchResult>
        <Name>Corporate</Name>
        <Id>0</Id>
        <IsFirst>true</IsFirst>
        <IsLast>false</IsLast>
        <NoOfEntries>3</NoOfEntries>
        <Catalog>
          <Name>Sales</Name>
          <Id>c_1</Id>
          <IsFirst>true</IsFirst>
          <IsLast>false</IsLast>
        </Catalog>
        <Entry>
          <Name>Board Room</Name>
          <Id>e_7</Id>
          <IsFirst>false</IsFirst>
          <IsLast>false</IsLast>
          <Route>
            <CallType>Video</CallType>
            <Protocol>SIP</Protocol>
            <DialString> board@example.com </DialString>
          </Route>
          <Route>
            <CallType>Video</CallType>
            <Protocol>H323</Protocol>
            <DialString>1001</DialString>
          </Route>
          <Route>
            <Protocol>ISDN</Protocol>
            <DialString>5550100</DialString>
          </Route>
        </Entry>
        <Entry>
          <Name>Lobby</Name>
          <Id>e_8</Id>
          <IsLast>true</IsLast>
        </Entry>
      </SearchResult>
    </SearchResponse>
  </soap:Body>
</soap:Envelope>"#;

    #[test]
    fn parse_upstream_page() {
        let page = parse_search_response(UPSTREAM_PAGE).unwrap();

        assert_eq!(
            page.catalogs,
            vec![Catalog {
                name: "Sales".into(),
                id: "c_1".into()
            }]
        );
        assert_eq!(page.entries.len(), 2);

        let board = &page.entries[0];
        assert_eq!(board.name, "Board Room");
        assert_eq!(board.dial_string(Protocol::Sip), Some("board@example.com"));
        assert_eq!(board.dial_string(Protocol::H323), Some("1001"));
        assert_eq!(board.routes.len(), 2);

        assert!(page.entries[1].routes.is_empty());
        assert_eq!(page.last_id.as_deref(), Some("e_8"));
        assert!(page.has_last);
        assert_eq!(page.total, Some(3));
    }

    #[test]
    fn missing_search_result() {
        let err = parse_search_response(b"<Envelope/>").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MissingElement);
    }
}
