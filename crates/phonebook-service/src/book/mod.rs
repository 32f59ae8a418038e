//! Address book lifecycle: creation, copies and source hand-over.

mod edit;

use chrono::Utc;
use phonebook_core::constants::SOAP_ROUTE_PREFIX;
use phonebook_core::error::CoreError;
use phonebook_core::util::path::{split_group_path, truncate_title};
use phonebook_core::util::secret::new_secret_key;
use phonebook_db::db::enums::{AddressBookKind, SourceKind};
use phonebook_db::model::{
    AddressBook, Group, GroupChanges, NewAddressBook, NewGroup, NewItem, NewSource, Source, SourceConfig,
};
use phonebook_db::store::DirectoryStore;

pub use edit::{BulkItem, ExportRow};

use crate::error::{ServiceError, ServiceResult};
use crate::search::fold;
use crate::service::PhonebookService;

/// Settings of a new address book.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookSettings {
    pub title: String,
    pub kind: AddressBookKind,
    pub external_url: String,
    pub external_edit_url: String,
}

impl BookSettings {
    #[must_use]
    pub fn local(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// URL endpoints are provisioned with.
///
/// External books are served elsewhere and keep their configured URL.
#[must_use]
pub fn soap_url(book: &AddressBook, public_origin: &str) -> String {
    if book.is_external() {
        return book.external_url.clone();
    }
    format!(
        "{}{SOAP_ROUTE_PREFIX}/{}/",
        public_origin.trim_end_matches('/'),
        book.secret_key
    )
}

/// ## Summary
/// Resolves a `/` or `>` separated path of group titles below `parent_id`,
/// creating the levels that do not exist.
///
/// Titles are matched case-insensitively per level. With `source_id`, only
/// groups of that source are reused; new groups take the given source or
/// inherit their parent's. Returns `None` for a path without segments.
///
/// ## Errors
/// Returns `NotFound` when `parent_id` is not a group of the book, and store
/// errors.
#[tracing::instrument(skip(store))]
pub async fn get_or_create_group_path(
    store: &dyn DirectoryStore,
    address_book_id: i64,
    parent_id: Option<i64>,
    path: &str,
    source_id: Option<i64>,
) -> ServiceResult<Option<Group>> {
    let segments = split_group_path(path);
    if segments.is_empty() {
        return Ok(None);
    }

    let mut groups = store.list_groups(address_book_id).await?;
    let mut parent: Option<Group> = match parent_id {
        Some(id) => Some(
            groups
                .iter()
                .find(|g| g.id == id)
                .cloned()
                .ok_or_else(|| CoreError::NotFound(format!("group {id}")))?,
        ),
        None => None,
    };

    for segment in segments {
        let wanted = fold(segment);
        let current_parent = parent.as_ref().map(|p| p.id);
        let existing = groups.iter().find(|g| {
            g.parent_id == current_parent
                && source_id.is_none_or(|s| g.source_id == Some(s))
                && fold(&g.title) == wanted
        });

        let group = if let Some(group) = existing {
            group.clone()
        } else {
            let created = store
                .create_group(NewGroup {
                    address_book_id,
                    source_id: source_id.or_else(|| parent.as_ref().and_then(|p| p.source_id)),
                    parent_id: current_parent,
                    title: truncate_title(segment),
                    external_id: String::new(),
                })
                .await?;
            tracing::debug!(group_id = created.id, title = %created.title, "Created path group");
            groups.push(created.clone());
            created
        };
        parent = Some(group);
    }
    Ok(parent)
}

fn is_link_to(source: &Source, manual_source_ids: &[i64]) -> bool {
    matches!(
        source.config,
        SourceConfig::ManualLink { manual_source_id } if manual_source_ids.contains(&manual_source_id)
    )
}

impl PhonebookService {
    /// ## Summary
    /// Creates an address book with a fresh secret key.
    ///
    /// Its manual source and root group are set up on a best effort basis and
    /// a merge pass creates the canonical root.
    ///
    /// ## Errors
    /// Returns store errors from creating the book itself.
    #[tracing::instrument(skip(self))]
    pub async fn create_address_book(&self, settings: BookSettings) -> ServiceResult<AddressBook> {
        let book = self
            .store
            .create_address_book(NewAddressBook {
                title: truncate_title(&settings.title),
                secret_key: new_secret_key(),
                kind: settings.kind,
                external_url: settings.external_url,
                external_edit_url: settings.external_edit_url,
            })
            .await?;

        if let Err(e) = self.ensure_manual_source(book.id).await {
            tracing::error!(address_book_id = book.id, error = %e, report = true, "Could not create manual source");
        }
        self.merge_locked(book.id).await?;

        tracing::info!(address_book_id = book.id, "Address book created");
        Ok(book)
    }

    /// Returns the manual source of a book and its root group, creating both
    /// when missing.
    pub(crate) async fn ensure_manual_source(&self, address_book_id: i64) -> ServiceResult<(Source, Group)> {
        let existing = self
            .store
            .list_sources(address_book_id)
            .await?
            .into_iter()
            .find(|s| s.kind == SourceKind::Manual);
        let source = match existing {
            Some(source) => source,
            None => {
                self.store
                    .create_source(NewSource::new(address_book_id, "", "", SourceConfig::Manual))
                    .await?
            }
        };

        let root = self
            .store
            .list_source_groups(source.id)
            .await?
            .into_iter()
            .find(|g| g.parent_id.is_none());
        let root = match root {
            Some(root) => root,
            None => {
                self.store
                    .create_group(NewGroup {
                        address_book_id,
                        source_id: Some(source.id),
                        parent_id: None,
                        title: String::new(),
                        external_id: String::new(),
                    })
                    .await?
            }
        };
        Ok((source, root))
    }

    /// ## Summary
    /// Copies an address book.
    ///
    /// Each manual source of the original becomes a link in the copy. Without
    /// `link_manual` the link is synced once and then merged into the copy's
    /// own manual source, leaving an editable snapshot. Every other source is
    /// duplicated with its settings.
    ///
    /// ## Errors
    /// Returns `NotFound` for an unknown book, and store errors.
    #[tracing::instrument(skip(self))]
    pub async fn copy(
        &self,
        address_book_id: i64,
        new_title: Option<&str>,
        link_manual: bool,
    ) -> ServiceResult<AddressBook> {
        let original = self
            .store
            .get_address_book(address_book_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("address book {address_book_id}")))?;

        let title = new_title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map_or_else(
                || format!("{} - Copy {}", original.title, Utc::now().date_naive()),
                str::to_owned,
            );

        let copy = self
            .store
            .create_address_book(NewAddressBook {
                title: truncate_title(&title),
                secret_key: new_secret_key(),
                kind: original.kind,
                external_url: original.external_url.clone(),
                external_edit_url: original.external_edit_url.clone(),
            })
            .await?;
        self.ensure_manual_source(copy.id).await?;

        let sources = self.store.list_sources(original.id).await?;
        for manual in sources.iter().filter(|s| s.kind == SourceKind::Manual) {
            let link = self
                .store
                .create_source(NewSource::new(
                    copy.id,
                    original.title.clone(),
                    manual.prefix.clone(),
                    SourceConfig::ManualLink {
                        manual_source_id: manual.id,
                    },
                ))
                .await?;

            if !link_manual {
                let outcome = {
                    let _guard = self.locks.lock(copy.id).await;
                    self.sync_source(&link).await?
                };
                if let Some(error) = outcome.error {
                    tracing::warn!(source_id = link.id, %error, "Snapshot of manual source failed");
                }
                self.merge_into_manual(link.id).await?;
            }
        }

        for kind in SourceKind::SYNC_ORDER {
            for source in sources.iter().filter(|s| s.kind == kind) {
                self.store
                    .create_source(NewSource::new(
                        copy.id,
                        source.title.clone(),
                        source.prefix.clone(),
                        source.config.clone(),
                    ))
                    .await?;
            }
        }

        self.merge_locked(copy.id).await?;
        tracing::info!(from = original.id, to = copy.id, link_manual, "Address book copied");
        Ok(copy)
    }

    /// Hands every group of a source over to the book's manual source and
    /// deletes the source. The manual source itself is left alone.
    ///
    /// The handed-over root wrapper is folded into the manual root, so the
    /// manual source keeps a single tree.
    ///
    /// ## Errors
    /// Returns `NotFound` for an unknown source or a book without a manual
    /// source, and store errors.
    #[tracing::instrument(skip(self))]
    pub async fn merge_into_manual(&self, source_id: i64) -> ServiceResult<()> {
        let source = self
            .store
            .get_source(source_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("source {source_id}")))?;

        let manual = self
            .store
            .list_sources(source.address_book_id)
            .await?
            .into_iter()
            .find(|s| s.kind == SourceKind::Manual)
            .ok_or_else(|| ServiceError::NotFound(format!("manual source of address book {}", source.address_book_id)))?;
        if manual.id == source.id {
            return Ok(());
        }

        self.store.reassign_groups(source.id, manual.id).await?;
        self.fold_root_wrappers(manual.id).await?;
        self.store.delete_source(source.id).await?;
        self.merge_locked(source.address_book_id).await?;
        Ok(())
    }

    /// Moves the content of every root wrapper of a source but the first into
    /// the first one, then deletes the emptied wrappers.
    async fn fold_root_wrappers(&self, source_id: i64) -> ServiceResult<()> {
        let groups = self.store.list_source_groups(source_id).await?;
        let mut wrappers = groups.iter().filter(|g| g.is_root_wrapper());
        let Some(root) = wrappers.next() else {
            return Ok(());
        };
        let extra: Vec<i64> = wrappers.map(|g| g.id).collect();
        if extra.is_empty() {
            return Ok(());
        }

        for child in groups
            .iter()
            .filter(|g| g.parent_id.is_some_and(|p| extra.contains(&p)))
        {
            self.store
                .update_group(
                    child.id,
                    GroupChanges {
                        title: child.title.clone(),
                        parent_id: Some(root.id),
                    },
                )
                .await?;
        }
        for item in self.store.list_items(extra.clone()).await? {
            self.store
                .create_item(NewItem {
                    group_id: root.id,
                    external_id: String::new(),
                    fields: item.fields(),
                })
                .await?;
        }

        tracing::debug!(source_id, root_id = root.id, folded = extra.len(), "Folded root wrappers");
        self.store.delete_groups(extra).await?;
        Ok(())
    }

    /// ## Summary
    /// Removes a source from a book.
    ///
    /// When another book links to this source, the source moves to that book
    /// and replaces the link instead of being deleted.
    ///
    /// ## Errors
    /// Returns `NotFound` when the source does not belong to the book, and
    /// store errors.
    #[tracing::instrument(skip(self))]
    pub async fn remove_source(&self, address_book_id: i64, source_id: i64) -> ServiceResult<()> {
        let source = self
            .store
            .get_source(source_id)
            .await?
            .filter(|s| s.address_book_id == address_book_id)
            .ok_or_else(|| CoreError::NotFound(format!("source {source_id}")))?;

        let link = self
            .store
            .list_sources_of_kind(SourceKind::ManualLink)
            .await?
            .into_iter()
            .find(|l| is_link_to(l, &[source.id]));

        match link {
            Some(link) => {
                self.store.move_source(source.id, link.address_book_id).await?;
                self.store.delete_source(link.id).await?;
                tracing::info!(source_id, to = link.address_book_id, "Source moved to linking book");
                self.merge_locked(link.address_book_id).await?;
            }
            None => {
                self.store.delete_source(source.id).await?;
                tracing::info!(source_id, "Source deleted");
            }
        }
        self.merge_locked(address_book_id).await?;
        Ok(())
    }

    /// Link sources in any book that mirror this book's manual sources.
    ///
    /// ## Errors
    /// Store errors only.
    pub async fn source_links(&self, address_book_id: i64) -> ServiceResult<Vec<Source>> {
        let manual_ids: Vec<i64> = self
            .store
            .list_sources(address_book_id)
            .await?
            .into_iter()
            .filter(|s| s.kind == SourceKind::Manual)
            .map(|s| s.id)
            .collect();
        if manual_ids.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self
            .store
            .list_sources_of_kind(SourceKind::ManualLink)
            .await?
            .into_iter()
            .filter(|l| is_link_to(l, &manual_ids))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use phonebook_db::model::{ItemFields, NewItem};
    use phonebook_db::store::MemoryStore;

    use super::*;
    use crate::service::ServiceOptions;
    use crate::source::Upstreams;

    fn service() -> PhonebookService {
        PhonebookService::new(
            Arc::new(MemoryStore::new()),
            Upstreams::default(),
            ServiceOptions {
                strict_merge: true,
                ..ServiceOptions::default()
            },
        )
    }

    async fn manual_root(service: &PhonebookService, book_id: i64) -> Group {
        service.ensure_manual_source(book_id).await.unwrap().1
    }

    #[test_log::test(tokio::test)]
    async fn new_book_has_manual_source_and_root() {
        let service = service();
        let book = service.create_address_book(BookSettings::local("Lobby")).await.unwrap();

        assert_eq!(book.secret_key.len(), 32);
        let sources = service.store().list_sources(book.id).await.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].kind, SourceKind::Manual);

        let sync_groups = service.store().list_sync_groups(book.id).await.unwrap();
        assert_eq!(sync_groups.len(), 1);
        assert!(sync_groups[0].is_root());

        let (source, root) = service.ensure_manual_source(book.id).await.unwrap();
        assert_eq!(source.id, sources[0].id);
        assert!(root.is_root_wrapper());
        assert_eq!(service.store().list_groups(book.id).await.unwrap().len(), 1);
    }

    #[test_log::test(tokio::test)]
    async fn soap_url_of_local_and_external_books() {
        let service = service();
        let local = service.create_address_book(BookSettings::local("Lobby")).await.unwrap();
        assert_eq!(
            soap_url(&local, "https://phonebook.example.com/"),
            format!("https://phonebook.example.com/tms/soap/{}/", local.secret_key)
        );

        let external = service
            .create_address_book(BookSettings {
                title: "Remote".into(),
                kind: AddressBookKind::External,
                external_url: "https://tms.example.com/search".into(),
                external_edit_url: String::new(),
            })
            .await
            .unwrap();
        assert_eq!(soap_url(&external, "https://phonebook.example.com"), "https://tms.example.com/search");
    }

    #[test_log::test(tokio::test)]
    async fn group_path_reuses_levels_case_insensitively() {
        let service = service();
        let store = service.store();
        let book = service.create_address_book(BookSettings::local("Lobby")).await.unwrap();
        let root = manual_root(&service, book.id).await;

        let leaf = get_or_create_group_path(store, book.id, Some(root.id), "Sales / Nordic", None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(leaf.title, "Nordic");
        assert_eq!(leaf.source_id, root.source_id, "inherits the parent's source");

        let again = get_or_create_group_path(store, book.id, Some(root.id), "sales>NORDIC", None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(again.id, leaf.id);
        assert_eq!(store.list_groups(book.id).await.unwrap().len(), 3);

        assert!(
            get_or_create_group_path(store, book.id, None, " / ", None)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[test_log::test(tokio::test)]
    async fn group_path_respects_source_filter() {
        let service = service();
        let store = service.store();
        let book = service.create_address_book(BookSettings::local("Lobby")).await.unwrap();
        let manual = manual_root(&service, book.id).await.source_id.unwrap();
        let other = store
            .create_source(NewSource::new(book.id, "", "", SourceConfig::CmsUser { provider_id: 1 }))
            .await
            .unwrap();

        let mine = get_or_create_group_path(store, book.id, None, "Rooms", Some(manual))
            .await
            .unwrap()
            .unwrap();
        let theirs = get_or_create_group_path(store, book.id, None, "Rooms", Some(other.id))
            .await
            .unwrap()
            .unwrap();
        assert_ne!(mine.id, theirs.id);
        assert_eq!(theirs.source_id, Some(other.id));
    }

    async fn book_with_manual_item(service: &PhonebookService) -> AddressBook {
        let book = service.create_address_book(BookSettings::local("Lobby")).await.unwrap();
        let root = manual_root(service, book.id).await;
        let group = get_or_create_group_path(service.store(), book.id, Some(root.id), "Floor 1", None)
            .await
            .unwrap()
            .unwrap();
        service
            .store()
            .create_item(NewItem {
                group_id: group.id,
                external_id: String::new(),
                fields: ItemFields {
                    title: "Room 101".into(),
                    sip: "room101@example.com".into(),
                    ..ItemFields::default()
                },
            })
            .await
            .unwrap();
        book
    }

    #[test_log::test(tokio::test)]
    async fn copy_keeps_a_live_link_by_default() {
        let service = service();
        let original = book_with_manual_item(&service).await;
        service
            .store()
            .create_source(NewSource::new(original.id, "Bridge", "", SourceConfig::CmsUser { provider_id: 3 }))
            .await
            .unwrap();

        let copy = service.copy(original.id, None, true).await.unwrap();
        assert!(copy.title.starts_with("Lobby - Copy "));
        assert_ne!(copy.secret_key, original.secret_key);

        let kinds: Vec<SourceKind> = service
            .store()
            .list_sources(copy.id)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.kind)
            .collect();
        assert_eq!(kinds, vec![SourceKind::Manual, SourceKind::ManualLink, SourceKind::CmsUser]);

        let links = service.source_links(original.id).await.unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].address_book_id, copy.id);
        assert_eq!(links[0].title, "Lobby");
    }

    #[test_log::test(tokio::test)]
    async fn copy_without_link_snapshots_into_manual() {
        let service = service();
        let original = book_with_manual_item(&service).await;

        let copy = service.copy(original.id, Some("Snapshot"), false).await.unwrap();
        assert_eq!(copy.title, "Snapshot");

        let sources = service.store().list_sources(copy.id).await.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].kind, SourceKind::Manual);
        assert!(service.source_links(original.id).await.unwrap().is_empty());

        let hits = service.search(copy.id, "room 101", None).await.unwrap();
        assert_eq!(hits.items.len(), 1);
        let group = service
            .store()
            .get_group(hits.items[0].group_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(group.source_id, Some(sources[0].id));
        assert_eq!(group.title, "Floor 1");

        let original_hits = service.search(original.id, "room 101", None).await.unwrap();
        assert_eq!(original_hits.items.len(), 1);
        assert_ne!(original_hits.items[0].id, hits.items[0].id);
    }

    #[test_log::test(tokio::test)]
    async fn snapshot_keeps_one_manual_root() {
        let service = service();
        let original = book_with_manual_item(&service).await;
        let root = manual_root(&service, original.id).await;
        service
            .store()
            .create_item(NewItem {
                group_id: root.id,
                external_id: String::new(),
                fields: ItemFields {
                    title: "Reception".into(),
                    sip: "reception@example.com".into(),
                    ..ItemFields::default()
                },
            })
            .await
            .unwrap();

        let snapshot = service.copy(original.id, Some("Snapshot"), false).await.unwrap();
        let manual = service.store().list_sources(snapshot.id).await.unwrap()[0].clone();
        let roots: Vec<Group> = service
            .store()
            .list_source_groups(manual.id)
            .await
            .unwrap()
            .into_iter()
            .filter(|g| g.parent_id.is_none())
            .collect();
        assert_eq!(roots.len(), 1);
        assert_eq!(service.search(snapshot.id, "reception", None).await.unwrap().items.len(), 1);

        let linked = service.copy(snapshot.id, Some("Linked"), true).await.unwrap();
        service.sync_address_book(linked.id).await.unwrap();
        assert_eq!(service.search(linked.id, "room 101", None).await.unwrap().items.len(), 1);
        assert_eq!(service.search(linked.id, "reception", None).await.unwrap().items.len(), 1);

        let again = service.copy(snapshot.id, Some("Again"), false).await.unwrap();
        assert_eq!(service.search(again.id, "room 101", None).await.unwrap().items.len(), 1);
        assert_eq!(service.search(again.id, "reception", None).await.unwrap().items.len(), 1);
    }

    #[test_log::test(tokio::test)]
    async fn merge_into_manual_moves_groups() {
        let service = service();
        let book = service.create_address_book(BookSettings::local("Lobby")).await.unwrap();
        let (manual, _) = service.ensure_manual_source(book.id).await.unwrap();
        let bridge = service
            .store()
            .create_source(NewSource::new(book.id, "", "", SourceConfig::CmsUser { provider_id: 1 }))
            .await
            .unwrap();
        get_or_create_group_path(service.store(), book.id, None, "Bridge users", Some(bridge.id))
            .await
            .unwrap();

        service.merge_into_manual(manual.id).await.unwrap();
        assert_eq!(service.store().list_sources(book.id).await.unwrap().len(), 2);

        service.merge_into_manual(bridge.id).await.unwrap();
        assert!(service.store().get_source(bridge.id).await.unwrap().is_none());
        let moved = service.store().list_source_groups(manual.id).await.unwrap();
        assert!(moved.iter().any(|g| g.title == "Bridge users"));
    }

    #[test_log::test(tokio::test)]
    async fn removing_a_linked_source_moves_it() {
        let service = service();
        let original = book_with_manual_item(&service).await;
        let copy = service.copy(original.id, None, true).await.unwrap();
        let manual = service
            .store()
            .list_sources(original.id)
            .await
            .unwrap()
            .into_iter()
            .find(|s| s.kind == SourceKind::Manual)
            .unwrap();

        service.remove_source(original.id, manual.id).await.unwrap();

        let moved = service.store().get_source(manual.id).await.unwrap().unwrap();
        assert_eq!(moved.address_book_id, copy.id);
        let kinds: Vec<SourceKind> = service
            .store()
            .list_sources(copy.id)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.kind)
            .collect();
        assert!(!kinds.contains(&SourceKind::ManualLink));
        assert!(service.store().list_sources(original.id).await.unwrap().is_empty());

        let hits = service.search(copy.id, "room", None).await.unwrap();
        assert_eq!(hits.items.len(), 1);
    }

    #[test_log::test(tokio::test)]
    async fn removing_an_unlinked_source_deletes_it() {
        let service = service();
        let book = book_with_manual_item(&service).await;
        let other = service.create_address_book(BookSettings::local("Other")).await.unwrap();
        let manual = service.store().list_sources(book.id).await.unwrap()[0].clone();

        let err = service.remove_source(other.id, manual.id).await.unwrap_err();
        assert!(err.is_client_error());

        service.remove_source(book.id, manual.id).await.unwrap();
        assert!(service.store().get_source(manual.id).await.unwrap().is_none());
        assert!(service.store().list_book_items(book.id).await.unwrap().is_empty());
    }
}
