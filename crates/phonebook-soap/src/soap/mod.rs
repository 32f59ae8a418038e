//! Legacy `PhoneBookSearch` SOAP protocol spoken by video endpoints.
//!
//! `parse` reads search requests (server side) and search responses
//! (when walking an upstream phonebook), `build` writes them.

pub mod build;
pub mod core;
pub mod parse;

pub use build::{serialize_search_request, serialize_search_result};
pub use core::{Catalog, Entry, Protocol, Route, SearchPage, SearchQuery, SearchRequest, SearchResult};
pub use parse::{ParseError, ParseResult, parse_search_request, parse_search_response};
