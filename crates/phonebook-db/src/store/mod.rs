//! Persistence seam of the directory.
//!
//! Services talk to a `DirectoryStore` and never to diesel directly, so the same
//! sync, merge and search code runs against `PostgreSQL` in production and
//! against `MemoryStore` in tests.
//!
//! Deleting a group removes its whole subtree and every item below it. Deleting
//! a source removes its groups. Deleting a sync group removes its canonical
//! subtree and clears `sync_group_id` on groups pointing into it.

mod memory;
mod pg;

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};

pub use memory::MemoryStore;
pub use pg::PgStore;

use crate::db::enums::SourceKind;
use crate::error::DbResult;
use crate::model::{
    AddressBook, Group, GroupChanges, Item, ItemFields, NewAddressBook, NewGroup, NewItem,
    NewSource, NewSyncGroup, Source, SyncGroup,
};

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = DbResult<T>> + Send + 'a>>;

/// Row access for address books, sources, groups, sync groups and items.
///
/// Listing methods return rows ordered by id.
pub trait DirectoryStore: Send + Sync {
    fn create_address_book(&self, new: NewAddressBook) -> StoreFuture<'_, AddressBook>;

    fn get_address_book(&self, id: i64) -> StoreFuture<'_, Option<AddressBook>>;

    fn find_address_book_by_secret<'a>(
        &'a self,
        secret_key: &'a str,
    ) -> StoreFuture<'a, Option<AddressBook>>;

    fn list_address_books(&self) -> StoreFuture<'_, Vec<AddressBook>>;

    fn create_source(&self, new: NewSource) -> StoreFuture<'_, Source>;

    fn get_source(&self, id: i64) -> StoreFuture<'_, Option<Source>>;

    fn list_sources(&self, address_book_id: i64) -> StoreFuture<'_, Vec<Source>>;

    /// Sources of `kind` across every address book.
    fn list_sources_of_kind(&self, kind: SourceKind) -> StoreFuture<'_, Vec<Source>>;

    /// Stores the outcome of a sync pass.
    fn record_sync(
        &self,
        id: i64,
        sync_errors: String,
        last_sync: DateTime<Utc>,
    ) -> StoreFuture<'_, ()>;

    /// Moves a source and its groups to another address book.
    fn move_source(&self, id: i64, address_book_id: i64) -> StoreFuture<'_, ()>;

    fn delete_source(&self, id: i64) -> StoreFuture<'_, ()>;

    fn create_group(&self, new: NewGroup) -> StoreFuture<'_, Group>;

    fn get_group(&self, id: i64) -> StoreFuture<'_, Option<Group>>;

    fn update_group(&self, id: i64, changes: GroupChanges) -> StoreFuture<'_, ()>;

    fn list_groups(&self, address_book_id: i64) -> StoreFuture<'_, Vec<Group>>;

    fn list_source_groups(&self, source_id: i64) -> StoreFuture<'_, Vec<Group>>;

    fn set_sync_group(&self, group_id: i64, sync_group_id: Option<i64>) -> StoreFuture<'_, ()>;

    /// Hands every group of `from_source_id` over to `to_source_id`.
    fn reassign_groups(&self, from_source_id: i64, to_source_id: i64) -> StoreFuture<'_, ()>;

    fn delete_groups(&self, ids: Vec<i64>) -> StoreFuture<'_, ()>;

    fn create_item(&self, new: NewItem) -> StoreFuture<'_, Item>;

    fn get_item(&self, id: i64) -> StoreFuture<'_, Option<Item>>;

    fn update_item(&self, id: i64, fields: ItemFields) -> StoreFuture<'_, ()>;

    /// Items directly inside any of `group_ids`.
    fn list_items(&self, group_ids: Vec<i64>) -> StoreFuture<'_, Vec<Item>>;

    /// Items in every group of an address book.
    fn list_book_items(&self, address_book_id: i64) -> StoreFuture<'_, Vec<Item>>;

    fn delete_items(&self, ids: Vec<i64>) -> StoreFuture<'_, ()>;

    fn create_sync_group(&self, new: NewSyncGroup) -> StoreFuture<'_, SyncGroup>;

    fn list_sync_groups(&self, address_book_id: i64) -> StoreFuture<'_, Vec<SyncGroup>>;

    fn update_sync_group(
        &self,
        id: i64,
        parent_id: Option<i64>,
        title: String,
    ) -> StoreFuture<'_, ()>;

    fn delete_sync_groups(&self, ids: Vec<i64>) -> StoreFuture<'_, ()>;
}
