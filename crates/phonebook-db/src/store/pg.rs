//! `PostgreSQL` `DirectoryStore` over the bb8 connection pool.
//!
//! Cascading deletes are left to the foreign keys declared in the migrations.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use phonebook_core::error::CoreError;

use super::{DirectoryStore, StoreFuture};
use crate::db::DbProvider;
use crate::db::connection::DbPool;
use crate::db::enums::SourceKind;
use crate::db::schema::{address_book, directory_group, item, source, sync_group};
use crate::error::DbResult;
use crate::model::{
    AddressBook, Group, GroupChanges, Item, ItemFields, NewAddressBook, NewGroup, NewItem,
    NewSource, NewSyncGroup, Source, SyncGroup,
};

/// `DirectoryStore` backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn expect_updated(affected: usize, what: &str, id: i64) -> DbResult<()> {
    if affected == 0 {
        return Err(CoreError::NotFound(format!("{what} {id}")).into());
    }
    Ok(())
}

impl DirectoryStore for PgStore {
    #[tracing::instrument(skip(self, new))]
    fn create_address_book(&self, new: NewAddressBook) -> StoreFuture<'_, AddressBook> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            let book = diesel::insert_into(address_book::table)
                .values(&new)
                .returning(AddressBook::as_returning())
                .get_result(&mut conn)
                .await?;
            Ok(book)
        })
    }

    fn get_address_book(&self, id: i64) -> StoreFuture<'_, Option<AddressBook>> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            let book = address_book::table
                .find(id)
                .select(AddressBook::as_select())
                .first(&mut conn)
                .await
                .optional()?;
            Ok(book)
        })
    }

    fn find_address_book_by_secret<'a>(
        &'a self,
        secret_key: &'a str,
    ) -> StoreFuture<'a, Option<AddressBook>> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            let book = address_book::table
                .filter(address_book::secret_key.eq(secret_key))
                .select(AddressBook::as_select())
                .first(&mut conn)
                .await
                .optional()?;
            Ok(book)
        })
    }

    fn list_address_books(&self) -> StoreFuture<'_, Vec<AddressBook>> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            let books = address_book::table
                .order(address_book::id.asc())
                .select(AddressBook::as_select())
                .load(&mut conn)
                .await?;
            Ok(books)
        })
    }

    #[tracing::instrument(skip(self, new), fields(address_book_id = new.address_book_id))]
    fn create_source(&self, new: NewSource) -> StoreFuture<'_, Source> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            let created = diesel::insert_into(source::table)
                .values(&new)
                .returning(Source::as_returning())
                .get_result(&mut conn)
                .await?;
            Ok(created)
        })
    }

    fn get_source(&self, id: i64) -> StoreFuture<'_, Option<Source>> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            let found = source::table
                .find(id)
                .select(Source::as_select())
                .first(&mut conn)
                .await
                .optional()?;
            Ok(found)
        })
    }

    fn list_sources(&self, address_book_id: i64) -> StoreFuture<'_, Vec<Source>> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            let sources = source::table
                .filter(source::address_book_id.eq(address_book_id))
                .order(source::id.asc())
                .select(Source::as_select())
                .load(&mut conn)
                .await?;
            Ok(sources)
        })
    }

    fn list_sources_of_kind(&self, kind: SourceKind) -> StoreFuture<'_, Vec<Source>> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            let sources = source::table
                .filter(source::kind.eq(kind))
                .order(source::id.asc())
                .select(Source::as_select())
                .load(&mut conn)
                .await?;
            Ok(sources)
        })
    }

    fn record_sync(
        &self,
        id: i64,
        sync_errors: String,
        last_sync: DateTime<Utc>,
    ) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            let affected = diesel::update(source::table.find(id))
                .set((
                    source::sync_errors.eq(sync_errors),
                    source::last_sync.eq(Some(last_sync)),
                ))
                .execute(&mut conn)
                .await?;
            expect_updated(affected, "source", id)
        })
    }

    #[tracing::instrument(skip(self))]
    fn move_source(&self, id: i64, address_book_id: i64) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            let affected = diesel::update(source::table.find(id))
                .set(source::address_book_id.eq(address_book_id))
                .execute(&mut conn)
                .await?;
            expect_updated(affected, "source", id)?;
            diesel::update(directory_group::table.filter(directory_group::source_id.eq(id)))
                .set(directory_group::address_book_id.eq(address_book_id))
                .execute(&mut conn)
                .await?;
            Ok(())
        })
    }

    #[tracing::instrument(skip(self))]
    fn delete_source(&self, id: i64) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            diesel::delete(source::table.find(id))
                .execute(&mut conn)
                .await?;
            Ok(())
        })
    }

    fn create_group(&self, new: NewGroup) -> StoreFuture<'_, Group> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            let group = diesel::insert_into(directory_group::table)
                .values(&new)
                .returning(Group::as_returning())
                .get_result(&mut conn)
                .await?;
            Ok(group)
        })
    }

    fn get_group(&self, id: i64) -> StoreFuture<'_, Option<Group>> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            let group = directory_group::table
                .find(id)
                .select(Group::as_select())
                .first(&mut conn)
                .await
                .optional()?;
            Ok(group)
        })
    }

    fn update_group(&self, id: i64, changes: GroupChanges) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            let affected = diesel::update(directory_group::table.find(id))
                .set(&changes)
                .execute(&mut conn)
                .await?;
            expect_updated(affected, "group", id)
        })
    }

    fn list_groups(&self, address_book_id: i64) -> StoreFuture<'_, Vec<Group>> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            let groups = directory_group::table
                .filter(directory_group::address_book_id.eq(address_book_id))
                .order(directory_group::id.asc())
                .select(Group::as_select())
                .load(&mut conn)
                .await?;
            Ok(groups)
        })
    }

    fn list_source_groups(&self, source_id: i64) -> StoreFuture<'_, Vec<Group>> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            let groups = directory_group::table
                .filter(directory_group::source_id.eq(source_id))
                .order(directory_group::id.asc())
                .select(Group::as_select())
                .load(&mut conn)
                .await?;
            Ok(groups)
        })
    }

    fn set_sync_group(&self, group_id: i64, sync_group_id: Option<i64>) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            let affected = diesel::update(directory_group::table.find(group_id))
                .set(directory_group::sync_group_id.eq(sync_group_id))
                .execute(&mut conn)
                .await?;
            expect_updated(affected, "group", group_id)
        })
    }

    fn reassign_groups(&self, from_source_id: i64, to_source_id: i64) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            diesel::update(
                directory_group::table.filter(directory_group::source_id.eq(from_source_id)),
            )
            .set(directory_group::source_id.eq(Some(to_source_id)))
            .execute(&mut conn)
            .await?;
            Ok(())
        })
    }

    fn delete_groups(&self, ids: Vec<i64>) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            if ids.is_empty() {
                return Ok(());
            }
            let mut conn = self.pool.get_connection().await?;
            diesel::delete(directory_group::table.filter(directory_group::id.eq_any(&ids)))
                .execute(&mut conn)
                .await?;
            Ok(())
        })
    }

    fn create_item(&self, new: NewItem) -> StoreFuture<'_, Item> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            let created = diesel::insert_into(item::table)
                .values(&new)
                .returning(Item::as_returning())
                .get_result(&mut conn)
                .await?;
            Ok(created)
        })
    }

    fn get_item(&self, id: i64) -> StoreFuture<'_, Option<Item>> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            let found = item::table
                .find(id)
                .select(Item::as_select())
                .first(&mut conn)
                .await
                .optional()?;
            Ok(found)
        })
    }

    fn update_item(&self, id: i64, fields: ItemFields) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            let affected = diesel::update(item::table.find(id))
                .set(&fields)
                .execute(&mut conn)
                .await?;
            expect_updated(affected, "item", id)
        })
    }

    fn list_items(&self, group_ids: Vec<i64>) -> StoreFuture<'_, Vec<Item>> {
        Box::pin(async move {
            if group_ids.is_empty() {
                return Ok(Vec::new());
            }
            let mut conn = self.pool.get_connection().await?;
            let items = item::table
                .filter(item::group_id.eq_any(&group_ids))
                .order(item::id.asc())
                .select(Item::as_select())
                .load(&mut conn)
                .await?;
            Ok(items)
        })
    }

    fn list_book_items(&self, address_book_id: i64) -> StoreFuture<'_, Vec<Item>> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            let items = item::table
                .inner_join(directory_group::table)
                .filter(directory_group::address_book_id.eq(address_book_id))
                .order(item::id.asc())
                .select(Item::as_select())
                .load(&mut conn)
                .await?;
            Ok(items)
        })
    }

    fn delete_items(&self, ids: Vec<i64>) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            if ids.is_empty() {
                return Ok(());
            }
            let mut conn = self.pool.get_connection().await?;
            diesel::delete(item::table.filter(item::id.eq_any(&ids)))
                .execute(&mut conn)
                .await?;
            Ok(())
        })
    }

    fn create_sync_group(&self, new: NewSyncGroup) -> StoreFuture<'_, SyncGroup> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            let created = diesel::insert_into(sync_group::table)
                .values(&new)
                .returning(SyncGroup::as_returning())
                .get_result(&mut conn)
                .await?;
            Ok(created)
        })
    }

    fn list_sync_groups(&self, address_book_id: i64) -> StoreFuture<'_, Vec<SyncGroup>> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            let groups = sync_group::table
                .filter(sync_group::address_book_id.eq(address_book_id))
                .order(sync_group::id.asc())
                .select(SyncGroup::as_select())
                .load(&mut conn)
                .await?;
            Ok(groups)
        })
    }

    fn update_sync_group(
        &self,
        id: i64,
        parent_id: Option<i64>,
        title: String,
    ) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            let affected = diesel::update(sync_group::table.find(id))
                .set((sync_group::parent_id.eq(parent_id), sync_group::title.eq(title)))
                .execute(&mut conn)
                .await?;
            expect_updated(affected, "sync group", id)
        })
    }

    fn delete_sync_groups(&self, ids: Vec<i64>) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            if ids.is_empty() {
                return Ok(());
            }
            let mut conn = self.pool.get_connection().await?;
            diesel::delete(sync_group::table.filter(sync_group::id.eq_any(&ids)))
                .execute(&mut conn)
                .await?;
            Ok(())
        })
    }
}
