use std::sync::Arc;

use phonebook_db::store::DirectoryStore;

use crate::error::ServiceResult;
use crate::merge::{MergeReport, merge_groups};
use crate::source::Upstreams;
use crate::sync::BookLocks;

/// Tunables of sync and merge passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceOptions {
    /// Propagate merge errors instead of logging them.
    pub strict_merge: bool,
    /// Address books synced concurrently by `sync_all`.
    pub parallelism: usize,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            strict_merge: false,
            parallelism: 4,
        }
    }
}

/// Entry point of the phonebook operations.
///
/// Cheap to clone; clones share the store, upstream clients and book locks.
#[derive(Clone)]
pub struct PhonebookService {
    pub(crate) store: Arc<dyn DirectoryStore>,
    pub(crate) upstreams: Arc<Upstreams>,
    pub(crate) locks: BookLocks,
    pub(crate) options: ServiceOptions,
}

impl PhonebookService {
    #[must_use]
    pub fn new(store: Arc<dyn DirectoryStore>, upstreams: Upstreams, options: ServiceOptions) -> Self {
        Self {
            store,
            upstreams: Arc::new(upstreams),
            locks: BookLocks::default(),
            options,
        }
    }

    #[must_use]
    pub fn store(&self) -> &dyn DirectoryStore {
        self.store.as_ref()
    }

    #[must_use]
    pub const fn options(&self) -> &ServiceOptions {
        &self.options
    }

    /// Runs a merge pass. Failures are logged unless `strict_merge` is set.
    ///
    /// ## Errors
    /// Returns the merge error when `strict_merge` is set.
    pub(crate) async fn try_merge(&self, address_book_id: i64) -> ServiceResult<Option<MergeReport>> {
        match merge_groups(self.store(), address_book_id).await {
            Ok(report) => Ok(Some(report)),
            Err(e) if self.options.strict_merge => Err(e),
            Err(e) => {
                tracing::error!(
                    address_book_id,
                    error = %e,
                    report = true,
                    "Merge pass failed"
                );
                Ok(None)
            }
        }
    }

    /// Merges under the book lock, for edits made outside a sync cycle.
    pub(crate) async fn merge_locked(&self, address_book_id: i64) -> ServiceResult<Option<MergeReport>> {
        let _guard = self.locks.lock(address_book_id).await;
        self.try_merge(address_book_id).await
    }
}
