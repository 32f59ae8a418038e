//! `Search` request parsing.

use std::ops::ControlFlow;

use phonebook_core::constants::PHONEBOOK_NAMESPACE;

use super::error::{ParseError, ParseResult};
use super::{ElementName, Visitor, walk};
use crate::soap::core::SearchRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Mac,
    SearchPath,
    SearchString,
    MaxResult,
    StartFromId,
}

impl Field {
    /// Field at `path` below `Search`; every step must be in the phonebook namespace.
    fn at(path: &[Option<String>]) -> Option<Self> {
        let names: Option<Vec<&str>> = path.iter().map(Option::as_deref).collect();
        match names?.as_slice() {
            ["Identification", "MACAddress"] => Some(Self::Mac),
            ["SearchPath"] => Some(Self::SearchPath),
            ["SearchString"] => Some(Self::SearchString),
            ["MaxResult"] => Some(Self::MaxResult),
            ["StartFromId"] => Some(Self::StartFromId),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct SearchVisitor {
    found: bool,
    /// Elements open below `Search`; `None` marks a step outside the phonebook namespace.
    path: Option<Vec<Option<String>>>,
    mac: Option<String>,
    search_path: Option<String>,
    search_string: Option<String>,
    max_result: Option<String>,
    start_from_id: Option<String>,
}

impl SearchVisitor {
    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Mac => &mut self.mac,
            Field::SearchPath => &mut self.search_path,
            Field::SearchString => &mut self.search_string,
            Field::MaxResult => &mut self.max_result,
            Field::StartFromId => &mut self.start_from_id,
        }
    }
}

impl Visitor for SearchVisitor {
    fn start(&mut self, name: &ElementName) {
        if let Some(path) = self.path.as_mut() {
            let step = (name.namespace.as_deref() == Some(PHONEBOOK_NAMESPACE))
                .then(|| name.local_name.clone());
            path.push(step);
        } else if !self.found && name.is(PHONEBOOK_NAMESPACE, "Search") {
            self.found = true;
            self.path = Some(Vec::new());
        } else {
            // Envelope and body wrappers
        }
    }

    fn end(&mut self, _name: &ElementName, text: &str) -> ControlFlow<()> {
        let Some(path) = self.path.as_mut() else {
            return ControlFlow::Continue(());
        };

        if path.is_empty() {
            // `Search` itself closed
            self.path = None;
            return ControlFlow::Break(());
        }

        let field = Field::at(path);
        path.pop();

        if let Some(field) = field {
            let slot = self.slot(field);
            // First occurrence wins
            if slot.is_none() {
                *slot = Some(text.to_owned());
            }
        }
        ControlFlow::Continue(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Parses the body of a `PhoneBookSearch` `Search` call.
///
/// ## Summary
/// Locates the first `Search` element in the phonebook namespace anywhere in
/// the document and extracts its search fields. Absent and empty fields are
/// dropped.
///
/// ## Errors
/// Returns an error if the XML is malformed, if there is no `Search` element,
/// or if `MaxResult` is not a number.
#[tracing::instrument(skip(xml), fields(xml_len = xml.len()))]
pub fn parse_search_request(xml: &[u8]) -> ParseResult<SearchRequest> {
    let mut visitor = SearchVisitor::default();
    walk(xml, &mut visitor)?;

    if !visitor.found {
        tracing::debug!("No Search element in request");
        return Err(ParseError::missing_element("Search"));
    }

    let limit = non_empty(visitor.max_result)
        .map(|raw| {
            raw.trim().parse::<usize>().map_err(|err| {
                tracing::debug!(error = %err, value = %raw, "Invalid MaxResult");
                ParseError::invalid_value(format!("MaxResult is not a number: {raw:?}"))
            })
        })
        .transpose()?;

    Ok(SearchRequest {
        mac: non_empty(visitor.mac),
        group_id: non_empty(visitor.search_path),
        value: non_empty(visitor.search_string).unwrap_or_default(),
        limit,
        last_id: non_empty(visitor.start_from_id),
    })
}
