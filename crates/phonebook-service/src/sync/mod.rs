//! Tree synchronizer.
//!
//! A sync cycle visits the sources of one address book in a fixed order of
//! kinds, writes each source's tree below its anchor group and merges after
//! every source. One failing source never stops the others.

mod lock;
mod scheduler;
pub mod tree;


use chrono::Utc;
use futures::StreamExt;
use phonebook_core::error::CoreError;
use phonebook_db::db::enums::SourceKind;
use phonebook_db::model::{Group, NewGroup, Source};
use serde::Serialize;

pub use lock::BookLocks;
pub use scheduler::SyncScheduler;
pub use tree::{TreeOptions, TreeStats, sync_tree};

use crate::book::get_or_create_group_path;
use crate::error::{ServiceError, ServiceResult};
use crate::service::PhonebookService;
use crate::source::{FetchError, adapter_for};

/// Outcome of one source within a sync cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceOutcome {
    pub source_id: i64,
    pub kind: SourceKind,
    pub title: String,
    /// Formatted error, `None` when the source synced cleanly.
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub address_book_id: i64,
    pub sources: Vec<SourceOutcome>,
}

impl SyncReport {
    pub fn failed(&self) -> impl Iterator<Item = &SourceOutcome> {
        self.sources.iter().filter(|s| s.error.is_some())
    }
}

enum SourceFailure {
    Fetch(FetchError),
    Write(ServiceError),
}

impl SourceFailure {
    fn is_expected(&self) -> bool {
        match self {
            Self::Fetch(e) => e.is_expected(),
            Self::Write(_) => false,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Fetch(e) => e.to_string(),
            Self::Write(e) => e.to_string(),
        }
    }
}

impl PhonebookService {
    /// ## Summary
    /// Runs one full sync cycle of an address book under its lock.
    ///
    /// Manual sources are edited in place and are not fetched.
    ///
    /// ## Errors
    /// Returns `NotFound` for an unknown book, store errors, and merge errors
    /// when `strict_merge` is set. Adapter failures are recorded on the source.
    #[tracing::instrument(skip(self))]
    pub async fn sync_address_book(&self, address_book_id: i64) -> ServiceResult<SyncReport> {
        let _guard = self.locks.lock(address_book_id).await;

        if self.store.get_address_book(address_book_id).await?.is_none() {
            return Err(CoreError::NotFound(format!("address book {address_book_id}")).into());
        }

        let sources = self.store.list_sources(address_book_id).await?;
        let mut report = SyncReport {
            address_book_id,
            sources: Vec::new(),
        };

        for kind in SourceKind::SYNC_ORDER {
            for source in sources.iter().filter(|s| s.kind == kind) {
                report.sources.push(self.sync_source(source).await?);
                self.try_merge(address_book_id).await?;
            }
        }
        self.try_merge(address_book_id).await?;

        tracing::info!(
            sources = report.sources.len(),
            failed = report.failed().count(),
            "Address book synced"
        );
        Ok(report)
    }

    /// Syncs every address book, at most `parallelism` at a time.
    ///
    /// A book whose cycle fails is logged and left out of the result.
    #[tracing::instrument(skip(self))]
    pub async fn sync_all(&self) -> ServiceResult<Vec<SyncReport>> {
        let books = self.store.list_address_books().await?;
        let parallelism = self.options.parallelism.max(1);

        let reports: Vec<SyncReport> = futures::stream::iter(books)
            .map(|book| async move {
                match self.sync_address_book(book.id).await {
                    Ok(report) => Some(report),
                    Err(e) => {
                        tracing::error!(address_book_id = book.id, error = %e, "Address book sync failed");
                        None
                    }
                }
            })
            .buffer_unordered(parallelism)
            .filter_map(std::future::ready)
            .collect()
            .await;

        tracing::info!(books = reports.len(), "Sync pass finished");
        Ok(reports)
    }

    /// Syncs one source and records the outcome on it.
    pub(crate) async fn sync_source(&self, source: &Source) -> ServiceResult<SourceOutcome> {
        let anchor = self.resolve_anchor(source).await?;
        let adapter = adapter_for(source, self.store(), &self.upstreams);
        tracing::debug!(
            source_id = source.id,
            kind = %source.kind,
            nested = adapter.nested_items(),
            anchor_id = anchor.id,
            "Syncing source"
        );

        let result = match adapter.fetch().await {
            Ok(items) => {
                let (children, items) = items.into_parts();
                sync_tree(self.store(), &anchor, children, items, TreeOptions::default())
                    .await
                    .map_err(SourceFailure::Write)
            }
            Err(e) => Err(SourceFailure::Fetch(e)),
        };

        let error = match result {
            Ok(stats) => {
                tracing::debug!(source_id = source.id, ?stats, "Source synced");
                None
            }
            Err(failure) => {
                let message = failure.message();
                if failure.is_expected() {
                    tracing::warn!(source_id = source.id, error = %message, "Source sync failed");
                } else {
                    tracing::error!(
                        source_id = source.id,
                        error = %message,
                        report = true,
                        "Unexpected error while syncing source"
                    );
                }
                Some(message)
            }
        };

        self.store
            .record_sync(source.id, error.clone().unwrap_or_default(), Utc::now())
            .await?;

        Ok(SourceOutcome {
            source_id: source.id,
            kind: source.kind,
            title: source.display_name().to_owned(),
            error,
        })
    }

    /// The group a source writes below.
    ///
    /// A prefix resolves to a path of the source's own groups from the top of
    /// the book; without one the anchor is the source's parentless group with
    /// an empty title.
    async fn resolve_anchor(&self, source: &Source) -> ServiceResult<Group> {
        if let Some(anchor) = get_or_create_group_path(
            self.store(),
            source.address_book_id,
            None,
            &source.prefix,
            Some(source.id),
        )
        .await?
        {
            return Ok(anchor);
        }

        let existing = self
            .store
            .list_source_groups(source.id)
            .await?
            .into_iter()
            .find(Group::is_root_wrapper);
        if let Some(anchor) = existing {
            return Ok(anchor);
        }

        Ok(self
            .store
            .create_group(NewGroup {
                address_book_id: source.address_book_id,
                source_id: Some(source.id),
                parent_id: None,
                title: String::new(),
                external_id: String::new(),
            })
            .await?)
    }
}
