#![allow(clippy::doc_markdown, clippy::unused_async)]
//! HTTP integration tests against the in-memory store.

mod addressbook;
mod helpers;
mod json_search;
mod soap;
