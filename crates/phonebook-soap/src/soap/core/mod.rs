//! Core `PhoneBookSearch` types shared by the parser and the builder.

use std::fmt;

use phonebook_core::constants::DEFAULT_SEARCH_LIMIT;

/// A `Search` request as sent by an endpoint.
///
/// Absent and empty fields are `None`; `value` defaults to the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRequest {
    /// `Identification/MACAddress`. Informational only.
    pub mac: Option<String>,
    /// `SearchPath`, the catalog to browse (`g-<pk>`).
    pub group_id: Option<String>,
    /// `SearchString`.
    pub value: String,
    /// `MaxResult`.
    pub limit: Option<usize>,
    /// `StartFromId`, the cursor of the previous page.
    pub last_id: Option<String>,
}

impl SearchRequest {
    /// Page size requested, falling back to the protocol default.
    #[must_use]
    pub fn limit_or_default(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_SEARCH_LIMIT)
    }
}

/// Outgoing search against an upstream phonebook server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub mac: String,
    pub query: String,
    pub parent_id: Option<String>,
    pub start_id: Option<String>,
    pub limit: usize,
}

/// Dial protocol of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Sip,
    H323,
}

impl Protocol {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sip => "SIP",
            Self::H323 => "H323",
        }
    }

    /// Maps a wire label to a protocol. Unknown labels (ISDN etc.) yield `None`.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            l if l.eq_ignore_ascii_case("SIP") => Some(Self::Sip),
            l if l.eq_ignore_ascii_case("H323") => Some(Self::H323),
            _ => None,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub protocol: Protocol,
    pub dial_string: String,
}

/// A browsable folder of the phonebook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    pub name: String,
    pub id: String,
}

/// A dialable contact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub id: String,
    pub routes: Vec<Route>,
}

impl Entry {
    /// First non-empty dial string for the given protocol.
    #[must_use]
    pub fn dial_string(&self, protocol: Protocol) -> Option<&str> {
        self.routes
            .iter()
            .filter(|r| r.protocol == protocol)
            .map(|r| r.dial_string.trim())
            .find(|s| !s.is_empty())
    }
}

/// One rendered `SearchResult`.
///
/// Positional `IsFirst`/`IsLast` flags of catalogs and entries are derived when
/// serializing: catalogs and entries form a single numbered sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResult {
    /// Display name of the address book.
    pub name: String,
    pub is_first: bool,
    pub is_last: bool,
    pub catalogs: Vec<Catalog>,
    pub entries: Vec<Entry>,
}

impl SearchResult {
    /// `NoOfEntries`: catalogs and entries returned in this page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.catalogs.len() + self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A page read back from an upstream phonebook server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPage {
    pub catalogs: Vec<Catalog>,
    pub entries: Vec<Entry>,
    /// Id of the last catalog or entry in document order, the cursor for the next page.
    pub last_id: Option<String>,
    /// Whether the last catalog or entry carried `IsLast=true`.
    pub has_last: bool,
    /// `NoOfEntries` as reported by the server.
    pub total: Option<usize>,
}
