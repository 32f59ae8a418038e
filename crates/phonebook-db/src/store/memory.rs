//! In-process `DirectoryStore`, used by tests and single-node demos.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use phonebook_core::error::CoreError;

use super::{DirectoryStore, StoreFuture};
use crate::db::enums::SourceKind;
use crate::error::DbResult;
use crate::model::{
    AddressBook, Group, GroupChanges, Item, ItemFields, NewAddressBook, NewGroup, NewItem,
    NewSource, NewSyncGroup, Source, SyncGroup,
};

#[derive(Debug, Default)]
struct MemoryState {
    next_id: i64,
    address_books: BTreeMap<i64, AddressBook>,
    sources: BTreeMap<i64, Source>,
    groups: BTreeMap<i64, Group>,
    sync_groups: BTreeMap<i64, SyncGroup>,
    items: BTreeMap<i64, Item>,
}

impl MemoryState {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn remove_groups(&mut self, ids: impl IntoIterator<Item = i64>) {
        let mut doomed: BTreeSet<i64> = ids.into_iter().collect();
        // Children cascade with their parent
        loop {
            let children: Vec<i64> = self
                .groups
                .values()
                .filter(|g| g.parent_id.is_some_and(|p| doomed.contains(&p)) && !doomed.contains(&g.id))
                .map(|g| g.id)
                .collect();
            if children.is_empty() {
                break;
            }
            doomed.extend(children);
        }

        self.groups.retain(|id, _| !doomed.contains(id));
        self.items.retain(|_, item| !doomed.contains(&item.group_id));
    }

    fn remove_sync_groups(&mut self, ids: impl IntoIterator<Item = i64>) {
        let mut doomed: BTreeSet<i64> = ids.into_iter().collect();
        loop {
            let children: Vec<i64> = self
                .sync_groups
                .values()
                .filter(|g| g.parent_id.is_some_and(|p| doomed.contains(&p)) && !doomed.contains(&g.id))
                .map(|g| g.id)
                .collect();
            if children.is_empty() {
                break;
            }
            doomed.extend(children);
        }

        self.sync_groups.retain(|id, _| !doomed.contains(id));
        for group in self.groups.values_mut() {
            if group.sync_group_id.is_some_and(|id| doomed.contains(&id)) {
                group.sync_group_id = None;
            }
        }
    }
}

fn not_found(what: &str, id: i64) -> CoreError {
    CoreError::NotFound(format!("{what} {id}"))
}

/// `DirectoryStore` kept in process memory.
///
/// Every operation runs under one lock, so each call is atomic on its own.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the state and recovers from poisoning.
    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                self.state.clear_poison();
                poisoned.into_inner()
            }
        }
    }

    fn with_state<T: Send + 'static>(
        &self,
        f: impl FnOnce(&mut MemoryState) -> DbResult<T>,
    ) -> StoreFuture<'_, T> {
        let result = f(&mut self.lock());
        Box::pin(std::future::ready(result))
    }
}

impl DirectoryStore for MemoryStore {
    fn create_address_book(&self, new: NewAddressBook) -> StoreFuture<'_, AddressBook> {
        self.with_state(move |state| {
            if state
                .address_books
                .values()
                .any(|b| b.secret_key == new.secret_key)
            {
                return Err(CoreError::ValidationError("secret key already in use".into()).into());
            }
            let book = AddressBook {
                id: state.allocate_id(),
                title: new.title,
                secret_key: new.secret_key,
                kind: new.kind,
                external_url: new.external_url,
                external_edit_url: new.external_edit_url,
                created_at: Utc::now(),
            };
            state.address_books.insert(book.id, book.clone());
            Ok(book)
        })
    }

    fn get_address_book(&self, id: i64) -> StoreFuture<'_, Option<AddressBook>> {
        self.with_state(move |state| Ok(state.address_books.get(&id).cloned()))
    }

    fn find_address_book_by_secret<'a>(
        &'a self,
        secret_key: &'a str,
    ) -> StoreFuture<'a, Option<AddressBook>> {
        self.with_state(move |state| {
            Ok(state
                .address_books
                .values()
                .find(|b| b.secret_key == secret_key)
                .cloned())
        })
    }

    fn list_address_books(&self) -> StoreFuture<'_, Vec<AddressBook>> {
        self.with_state(|state| Ok(state.address_books.values().cloned().collect()))
    }

    fn create_source(&self, new: NewSource) -> StoreFuture<'_, Source> {
        self.with_state(move |state| {
            if !state.address_books.contains_key(&new.address_book_id) {
                return Err(not_found("address book", new.address_book_id).into());
            }
            let source = Source {
                id: state.allocate_id(),
                address_book_id: new.address_book_id,
                kind: new.kind,
                title: new.title,
                prefix: new.prefix,
                config: new.config,
                last_sync: None,
                sync_errors: String::new(),
            };
            state.sources.insert(source.id, source.clone());
            Ok(source)
        })
    }

    fn get_source(&self, id: i64) -> StoreFuture<'_, Option<Source>> {
        self.with_state(move |state| Ok(state.sources.get(&id).cloned()))
    }

    fn list_sources(&self, address_book_id: i64) -> StoreFuture<'_, Vec<Source>> {
        self.with_state(move |state| {
            Ok(state
                .sources
                .values()
                .filter(|s| s.address_book_id == address_book_id)
                .cloned()
                .collect())
        })
    }

    fn list_sources_of_kind(&self, kind: SourceKind) -> StoreFuture<'_, Vec<Source>> {
        self.with_state(move |state| {
            Ok(state
                .sources
                .values()
                .filter(|s| s.kind == kind)
                .cloned()
                .collect())
        })
    }

    fn record_sync(
        &self,
        id: i64,
        sync_errors: String,
        last_sync: DateTime<Utc>,
    ) -> StoreFuture<'_, ()> {
        self.with_state(move |state| {
            let source = state
                .sources
                .get_mut(&id)
                .ok_or_else(|| not_found("source", id))?;
            source.sync_errors = sync_errors;
            source.last_sync = Some(last_sync);
            Ok(())
        })
    }

    fn move_source(&self, id: i64, address_book_id: i64) -> StoreFuture<'_, ()> {
        self.with_state(move |state| {
            if !state.address_books.contains_key(&address_book_id) {
                return Err(not_found("address book", address_book_id).into());
            }
            let source = state
                .sources
                .get_mut(&id)
                .ok_or_else(|| not_found("source", id))?;
            source.address_book_id = address_book_id;
            for group in state.groups.values_mut() {
                if group.source_id == Some(id) {
                    group.address_book_id = address_book_id;
                }
            }
            Ok(())
        })
    }

    fn delete_source(&self, id: i64) -> StoreFuture<'_, ()> {
        self.with_state(move |state| {
            state.sources.remove(&id);
            let owned: Vec<i64> = state
                .groups
                .values()
                .filter(|g| g.source_id == Some(id))
                .map(|g| g.id)
                .collect();
            state.remove_groups(owned);
            Ok(())
        })
    }

    fn create_group(&self, new: NewGroup) -> StoreFuture<'_, Group> {
        self.with_state(move |state| {
            if let Some(parent_id) = new.parent_id
                && !state.groups.contains_key(&parent_id)
            {
                return Err(not_found("parent group", parent_id).into());
            }
            let group = Group {
                id: state.allocate_id(),
                address_book_id: new.address_book_id,
                source_id: new.source_id,
                parent_id: new.parent_id,
                sync_group_id: None,
                title: new.title,
                external_id: new.external_id,
            };
            state.groups.insert(group.id, group.clone());
            Ok(group)
        })
    }

    fn get_group(&self, id: i64) -> StoreFuture<'_, Option<Group>> {
        self.with_state(move |state| Ok(state.groups.get(&id).cloned()))
    }

    fn update_group(&self, id: i64, changes: GroupChanges) -> StoreFuture<'_, ()> {
        self.with_state(move |state| {
            let group = state
                .groups
                .get_mut(&id)
                .ok_or_else(|| not_found("group", id))?;
            group.title = changes.title;
            group.parent_id = changes.parent_id;
            Ok(())
        })
    }

    fn list_groups(&self, address_book_id: i64) -> StoreFuture<'_, Vec<Group>> {
        self.with_state(move |state| {
            Ok(state
                .groups
                .values()
                .filter(|g| g.address_book_id == address_book_id)
                .cloned()
                .collect())
        })
    }

    fn list_source_groups(&self, source_id: i64) -> StoreFuture<'_, Vec<Group>> {
        self.with_state(move |state| {
            Ok(state
                .groups
                .values()
                .filter(|g| g.source_id == Some(source_id))
                .cloned()
                .collect())
        })
    }

    fn set_sync_group(&self, group_id: i64, sync_group_id: Option<i64>) -> StoreFuture<'_, ()> {
        self.with_state(move |state| {
            let group = state
                .groups
                .get_mut(&group_id)
                .ok_or_else(|| not_found("group", group_id))?;
            group.sync_group_id = sync_group_id;
            Ok(())
        })
    }

    fn reassign_groups(&self, from_source_id: i64, to_source_id: i64) -> StoreFuture<'_, ()> {
        self.with_state(move |state| {
            for group in state.groups.values_mut() {
                if group.source_id == Some(from_source_id) {
                    group.source_id = Some(to_source_id);
                }
            }
            Ok(())
        })
    }

    fn delete_groups(&self, ids: Vec<i64>) -> StoreFuture<'_, ()> {
        self.with_state(move |state| {
            state.remove_groups(ids);
            Ok(())
        })
    }

    fn create_item(&self, new: NewItem) -> StoreFuture<'_, Item> {
        self.with_state(move |state| {
            if !state.groups.contains_key(&new.group_id) {
                return Err(not_found("group", new.group_id).into());
            }
            let fields = new.fields;
            let item = Item {
                id: state.allocate_id(),
                group_id: new.group_id,
                title: fields.title,
                description: fields.description,
                sip: fields.sip,
                h323: fields.h323,
                h323_e164: fields.h323_e164,
                tel: fields.tel,
                external_id: new.external_id,
            };
            state.items.insert(item.id, item.clone());
            Ok(item)
        })
    }

    fn get_item(&self, id: i64) -> StoreFuture<'_, Option<Item>> {
        self.with_state(move |state| Ok(state.items.get(&id).cloned()))
    }

    fn update_item(&self, id: i64, fields: ItemFields) -> StoreFuture<'_, ()> {
        self.with_state(move |state| {
            let item = state
                .items
                .get_mut(&id)
                .ok_or_else(|| not_found("item", id))?;
            item.title = fields.title;
            item.description = fields.description;
            item.sip = fields.sip;
            item.h323 = fields.h323;
            item.h323_e164 = fields.h323_e164;
            item.tel = fields.tel;
            Ok(())
        })
    }

    fn list_items(&self, group_ids: Vec<i64>) -> StoreFuture<'_, Vec<Item>> {
        self.with_state(move |state| {
            let wanted: BTreeSet<i64> = group_ids.into_iter().collect();
            Ok(state
                .items
                .values()
                .filter(|i| wanted.contains(&i.group_id))
                .cloned()
                .collect())
        })
    }

    fn list_book_items(&self, address_book_id: i64) -> StoreFuture<'_, Vec<Item>> {
        self.with_state(move |state| {
            Ok(state
                .items
                .values()
                .filter(|i| {
                    state
                        .groups
                        .get(&i.group_id)
                        .is_some_and(|g| g.address_book_id == address_book_id)
                })
                .cloned()
                .collect())
        })
    }

    fn delete_items(&self, ids: Vec<i64>) -> StoreFuture<'_, ()> {
        self.with_state(move |state| {
            for id in ids {
                state.items.remove(&id);
            }
            Ok(())
        })
    }

    fn create_sync_group(&self, new: NewSyncGroup) -> StoreFuture<'_, SyncGroup> {
        self.with_state(move |state| {
            let sync_group = SyncGroup {
                id: state.allocate_id(),
                address_book_id: new.address_book_id,
                parent_id: new.parent_id,
                title: new.title,
                full_path: new.full_path,
            };
            state.sync_groups.insert(sync_group.id, sync_group.clone());
            Ok(sync_group)
        })
    }

    fn list_sync_groups(&self, address_book_id: i64) -> StoreFuture<'_, Vec<SyncGroup>> {
        self.with_state(move |state| {
            Ok(state
                .sync_groups
                .values()
                .filter(|g| g.address_book_id == address_book_id)
                .cloned()
                .collect())
        })
    }

    fn update_sync_group(
        &self,
        id: i64,
        parent_id: Option<i64>,
        title: String,
    ) -> StoreFuture<'_, ()> {
        self.with_state(move |state| {
            let sync_group = state
                .sync_groups
                .get_mut(&id)
                .ok_or_else(|| not_found("sync group", id))?;
            sync_group.parent_id = parent_id;
            sync_group.title = title;
            Ok(())
        })
    }

    fn delete_sync_groups(&self, ids: Vec<i64>) -> StoreFuture<'_, ()> {
        self.with_state(move |state| {
            state.remove_sync_groups(ids);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::enums::AddressBookKind;
    use crate::model::SourceConfig;

    async fn book(store: &MemoryStore, secret: &str) -> AddressBook {
        store
            .create_address_book(NewAddressBook {
                title: "Book".into(),
                secret_key: secret.into(),
                kind: AddressBookKind::Local,
                external_url: String::new(),
                external_edit_url: String::new(),
            })
            .await
            .unwrap()
    }

    fn group(book: &AddressBook, source_id: i64, parent_id: Option<i64>, title: &str) -> NewGroup {
        NewGroup {
            address_book_id: book.id,
            source_id: Some(source_id),
            parent_id,
            title: title.into(),
            external_id: title.into(),
        }
    }

    fn item(group_id: i64, title: &str) -> NewItem {
        NewItem {
            group_id,
            external_id: title.into(),
            fields: ItemFields {
                title: title.into(),
                sip: format!("{title}@example.com"),
                ..ItemFields::default()
            },
        }
    }

    #[test_log::test(tokio::test)]
    async fn secret_lookup() {
        let store = MemoryStore::new();
        let created = book(&store, "abc").await;

        let found = store.find_address_book_by_secret("abc").await.unwrap();
        assert_eq!(found.map(|b| b.id), Some(created.id));
        assert!(store.find_address_book_by_secret("nope").await.unwrap().is_none());
    }

    #[test_log::test(tokio::test)]
    async fn duplicate_secret_is_rejected() {
        let store = MemoryStore::new();
        book(&store, "abc").await;

        let err = store
            .create_address_book(NewAddressBook {
                title: "Other".into(),
                secret_key: "abc".into(),
                kind: AddressBookKind::Local,
                external_url: String::new(),
                external_edit_url: String::new(),
            })
            .await;
        assert!(err.is_err());
    }

    #[test_log::test(tokio::test)]
    async fn deleting_group_cascades_to_subtree_and_items() {
        let store = MemoryStore::new();
        let book = book(&store, "k").await;
        let source = store
            .create_source(NewSource::new(book.id, "", "", SourceConfig::Manual))
            .await
            .unwrap();

        let top = store.create_group(group(&book, source.id, None, "top")).await.unwrap();
        let mid = store
            .create_group(group(&book, source.id, Some(top.id), "mid"))
            .await
            .unwrap();
        let other = store.create_group(group(&book, source.id, None, "other")).await.unwrap();
        store.create_item(item(mid.id, "deep")).await.unwrap();
        let kept = store.create_item(item(other.id, "kept")).await.unwrap();

        store.delete_groups(vec![top.id]).await.unwrap();

        let groups = store.list_groups(book.id).await.unwrap();
        assert_eq!(groups.iter().map(|g| g.id).collect::<Vec<_>>(), vec![other.id]);
        let items = store.list_book_items(book.id).await.unwrap();
        assert_eq!(items.iter().map(|i| i.id).collect::<Vec<_>>(), vec![kept.id]);
    }

    #[test_log::test(tokio::test)]
    async fn deleting_source_removes_its_groups() {
        let store = MemoryStore::new();
        let book = book(&store, "k").await;
        let source = store
            .create_source(NewSource::new(book.id, "", "", SourceConfig::Manual))
            .await
            .unwrap();
        let g = store.create_group(group(&book, source.id, None, "")).await.unwrap();
        store.create_item(item(g.id, "x")).await.unwrap();

        store.delete_source(source.id).await.unwrap();

        assert!(store.get_source(source.id).await.unwrap().is_none());
        assert!(store.list_groups(book.id).await.unwrap().is_empty());
        assert!(store.list_book_items(book.id).await.unwrap().is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn deleting_sync_group_clears_references() {
        let store = MemoryStore::new();
        let book = book(&store, "k").await;
        let source = store
            .create_source(NewSource::new(book.id, "", "", SourceConfig::Manual))
            .await
            .unwrap();
        let g = store.create_group(group(&book, source.id, None, "a")).await.unwrap();
        let root = store
            .create_sync_group(NewSyncGroup {
                address_book_id: book.id,
                parent_id: None,
                title: "a".into(),
                full_path: "a".into(),
            })
            .await
            .unwrap();
        let child = store
            .create_sync_group(NewSyncGroup {
                address_book_id: book.id,
                parent_id: Some(root.id),
                title: "b".into(),
                full_path: "a > b".into(),
            })
            .await
            .unwrap();
        store.set_sync_group(g.id, Some(child.id)).await.unwrap();

        store.delete_sync_groups(vec![root.id]).await.unwrap();

        assert!(store.list_sync_groups(book.id).await.unwrap().is_empty());
        let g = store.get_group(g.id).await.unwrap().unwrap();
        assert_eq!(g.sync_group_id, None);
    }

    #[test_log::test(tokio::test)]
    async fn moving_source_moves_groups() {
        let store = MemoryStore::new();
        let first = book(&store, "1").await;
        let second = book(&store, "2").await;
        let source = store
            .create_source(NewSource::new(first.id, "", "", SourceConfig::Manual))
            .await
            .unwrap();
        let g = store.create_group(group(&first, source.id, None, "")).await.unwrap();
        store.create_item(item(g.id, "x")).await.unwrap();

        store.move_source(source.id, second.id).await.unwrap();

        assert!(store.list_sources(first.id).await.unwrap().is_empty());
        assert_eq!(store.list_book_items(second.id).await.unwrap().len(), 1);
    }

    #[test_log::test(tokio::test)]
    async fn record_sync_on_missing_source_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .record_sync(99, String::new(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::DbError::CoreError(CoreError::NotFound(_))));
    }
}
