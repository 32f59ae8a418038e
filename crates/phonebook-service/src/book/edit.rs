//! Hand-editing of manual groups and items.
//!
//! Only groups without a source or owned by a manual source can be edited.
//! Every change to groups is followed by a merge pass.

use std::collections::{HashMap, HashSet};

use phonebook_core::error::CoreError;
use phonebook_core::util::path::{join_path, truncate_title};
use phonebook_db::model::{Group, GroupChanges, Item, ItemFields, NewGroup, NewItem};
use serde::Serialize;

use super::get_or_create_group_path;
use crate::error::{ServiceError, ServiceResult};
use crate::merge::name_paths;
use crate::service::PhonebookService;

/// An item of a bulk import, placed by a group path below the import root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkItem {
    /// `/` or `>` separated titles; empty for the import root itself.
    pub group_path: String,
    pub fields: ItemFields,
}

/// One line of an address book export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    pub title: String,
    pub description: String,
    pub sip: String,
    pub h323: String,
    pub h323_e164: String,
    pub tel: String,
    pub external_id: String,
    /// Name path of the item's group.
    pub group_name: String,
    /// Kind label of the group's source.
    pub source_type: String,
    pub group_external_id: String,
}

/// Ids of `root` and every group below it.
fn subtree(root: i64, groups: &[Group]) -> HashSet<i64> {
    let mut children: HashMap<i64, Vec<i64>> = HashMap::new();
    for group in groups {
        if let Some(parent_id) = group.parent_id {
            children.entry(parent_id).or_default().push(group.id);
        }
    }

    let mut seen = HashSet::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if seen.insert(id) {
            stack.extend(children.get(&id).into_iter().flatten().copied());
        }
    }
    seen
}

fn checked_fields(fields: ItemFields) -> ServiceResult<ItemFields> {
    let fields = ItemFields {
        title: truncate_title(fields.title.trim()),
        ..fields
    }
    .with_default_title();
    if fields.title.is_empty() {
        return Err(ServiceError::ValidationError(
            "item needs a title or a dial address".into(),
        ));
    }
    Ok(fields)
}

fn checked_title(title: &str) -> ServiceResult<String> {
    let title = truncate_title(title.trim());
    if title.is_empty() {
        return Err(ServiceError::ValidationError("group title is empty".into()));
    }
    Ok(title)
}

impl PhonebookService {
    async fn editable_group(&self, group_id: i64) -> ServiceResult<Group> {
        let group = self
            .store
            .get_group(group_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("group {group_id}")))?;

        let editable = match group.source_id {
            None => true,
            Some(source_id) => self
                .store
                .get_source(source_id)
                .await?
                .is_some_and(|s| s.kind.is_editable()),
        };
        if !editable {
            return Err(ServiceError::NotEditable(group.id));
        }
        Ok(group)
    }

    async fn editable_item(&self, item_id: i64) -> ServiceResult<Item> {
        let item = self
            .store
            .get_item(item_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("item {item_id}")))?;
        self.editable_group(item.group_id).await?;
        Ok(item)
    }

    /// Group new manual content goes below when no parent is given.
    async fn manual_parent(&self, address_book_id: i64, parent_id: Option<i64>) -> ServiceResult<Group> {
        let parent = match parent_id {
            Some(id) => self.editable_group(id).await?,
            None => self.ensure_manual_source(address_book_id).await?.1,
        };
        if parent.address_book_id != address_book_id {
            return Err(CoreError::NotFound(format!("group {}", parent.id)).into());
        }
        Ok(parent)
    }

    /// Creates a manual group, below the manual root when `parent_id` is `None`.
    ///
    /// ## Errors
    /// Returns `NotFound`, `NotEditable` or `ValidationError` for a bad parent
    /// or title, and store errors.
    #[tracing::instrument(skip(self))]
    pub async fn create_group(
        &self,
        address_book_id: i64,
        parent_id: Option<i64>,
        title: &str,
    ) -> ServiceResult<Group> {
        let title = checked_title(title)?;
        let parent = self.manual_parent(address_book_id, parent_id).await?;

        let group = self
            .store
            .create_group(NewGroup {
                address_book_id,
                source_id: parent.source_id,
                parent_id: Some(parent.id),
                title,
                external_id: String::new(),
            })
            .await?;
        self.merge_locked(address_book_id).await?;
        Ok(group)
    }

    /// Renames or moves a manual group.
    ///
    /// ## Errors
    /// Returns `ValidationError` when the group is a root, when the title is
    /// empty or when the new parent lies inside the group, `NotEditable` for
    /// groups of synced sources, and store errors.
    #[tracing::instrument(skip(self))]
    pub async fn update_group(&self, group_id: i64, changes: GroupChanges) -> ServiceResult<Group> {
        let group = self.editable_group(group_id).await?;
        if group.is_root_wrapper() {
            return Err(ServiceError::ValidationError("the root group cannot be edited".into()));
        }
        let title = checked_title(&changes.title)?;

        if let Some(parent_id) = changes.parent_id {
            let parent = self.manual_parent(group.address_book_id, Some(parent_id)).await?;
            let groups = self.store.list_groups(group.address_book_id).await?;
            if subtree(group.id, &groups).contains(&parent.id) {
                return Err(ServiceError::ValidationError(
                    "a group cannot be moved into itself".into(),
                ));
            }
        }

        self.store
            .update_group(
                group.id,
                GroupChanges {
                    title: title.clone(),
                    parent_id: changes.parent_id,
                },
            )
            .await?;
        self.merge_locked(group.address_book_id).await?;

        Ok(Group {
            title,
            parent_id: changes.parent_id,
            ..group
        })
    }

    /// Deletes a manual group with everything below it.
    ///
    /// ## Errors
    /// Returns `ValidationError` for a root group, `NotEditable` for groups of
    /// synced sources, and store errors.
    #[tracing::instrument(skip(self))]
    pub async fn delete_group(&self, group_id: i64) -> ServiceResult<()> {
        let group = self.editable_group(group_id).await?;
        if group.is_root_wrapper() {
            return Err(ServiceError::ValidationError("the root group cannot be deleted".into()));
        }
        self.store.delete_groups(vec![group.id]).await?;
        self.merge_locked(group.address_book_id).await?;
        Ok(())
    }

    /// Adds an item to a manual group. A blank title defaults to the first
    /// populated dial address.
    ///
    /// ## Errors
    /// Returns `NotEditable`, `ValidationError` for an item with neither title
    /// nor dial address, and store errors.
    #[tracing::instrument(skip(self, fields))]
    pub async fn create_item(&self, group_id: i64, fields: ItemFields) -> ServiceResult<Item> {
        let group = self.editable_group(group_id).await?;
        let fields = checked_fields(fields)?;
        Ok(self
            .store
            .create_item(NewItem {
                group_id: group.id,
                external_id: String::new(),
                fields,
            })
            .await?)
    }

    /// ## Errors
    /// Returns `NotFound`, `NotEditable`, `ValidationError`, and store errors.
    #[tracing::instrument(skip(self, fields))]
    pub async fn update_item(&self, item_id: i64, fields: ItemFields) -> ServiceResult<Item> {
        let item = self.editable_item(item_id).await?;
        let fields = checked_fields(fields)?;
        self.store.update_item(item.id, fields.clone()).await?;
        Ok(Item {
            title: fields.title,
            description: fields.description,
            sip: fields.sip,
            h323: fields.h323,
            h323_e164: fields.h323_e164,
            tel: fields.tel,
            ..item
        })
    }

    /// ## Errors
    /// Returns `NotFound`, `NotEditable`, and store errors.
    #[tracing::instrument(skip(self))]
    pub async fn delete_item(&self, item_id: i64) -> ServiceResult<()> {
        let item = self.editable_item(item_id).await?;
        self.store.delete_items(vec![item.id]).await?;
        Ok(())
    }

    /// ## Summary
    /// Imports items below a manual group, creating the groups named by each
    /// item's path.
    ///
    /// Items without title and dial address are skipped.
    ///
    /// ## Errors
    /// Returns `NotFound` or `NotEditable` for a bad root, and store errors.
    #[tracing::instrument(skip(self, items), fields(count = items.len()))]
    pub async fn bulk_create_items(
        &self,
        address_book_id: i64,
        root_group_id: Option<i64>,
        items: Vec<BulkItem>,
    ) -> ServiceResult<Vec<Item>> {
        let root = self.manual_parent(address_book_id, root_group_id).await?;

        let mut created = Vec::with_capacity(items.len());
        for item in items {
            let Ok(fields) = checked_fields(item.fields) else {
                tracing::debug!(group_path = %item.group_path, "Skipping empty item");
                continue;
            };
            let group_id = get_or_create_group_path(
                self.store(),
                address_book_id,
                Some(root.id),
                &item.group_path,
                root.source_id,
            )
            .await?
            .map_or(root.id, |g| g.id);

            created.push(
                self.store
                    .create_item(NewItem {
                        group_id,
                        external_id: String::new(),
                        fields,
                    })
                    .await?,
            );
        }

        self.merge_locked(address_book_id).await?;
        tracing::info!(created = created.len(), "Items imported");
        Ok(created)
    }

    /// Items of a group and of every group below it.
    ///
    /// ## Errors
    /// Returns `NotFound` for an unknown group, and store errors.
    pub async fn items_in_subtree(&self, group_id: i64) -> ServiceResult<Vec<Item>> {
        let group = self
            .store
            .get_group(group_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("group {group_id}")))?;
        let groups = self.store.list_groups(group.address_book_id).await?;
        let ids: Vec<i64> = subtree(group.id, &groups).into_iter().collect();
        Ok(self.store.list_items(ids).await?)
    }

    /// Every item of a book with its group's name, source type and external
    /// id, sorted by group name and title.
    ///
    /// ## Errors
    /// Store errors only.
    #[tracing::instrument(skip(self))]
    pub async fn export_rows(&self, address_book_id: i64) -> ServiceResult<Vec<ExportRow>> {
        let groups: HashMap<i64, Group> = self
            .store
            .list_groups(address_book_id)
            .await?
            .into_iter()
            .map(|g| (g.id, g))
            .collect();
        let labels: HashMap<i64, &'static str> = self
            .store
            .list_sources(address_book_id)
            .await?
            .into_iter()
            .map(|s| (s.id, s.kind.label()))
            .collect();

        let mut rows: Vec<ExportRow> = self
            .store
            .list_book_items(address_book_id)
            .await?
            .into_iter()
            .filter_map(|item| {
                let group = groups.get(&item.group_id)?;
                Some(ExportRow {
                    group_name: join_path(&name_paths(group, &groups)),
                    source_type: group
                        .source_id
                        .and_then(|id| labels.get(&id))
                        .map_or_else(String::new, |label| (*label).to_owned()),
                    group_external_id: group.external_id.clone(),
                    title: item.title,
                    description: item.description,
                    sip: item.sip,
                    h323: item.h323,
                    h323_e164: item.h323_e164,
                    tel: item.tel,
                    external_id: item.external_id,
                })
            })
            .collect();
        rows.sort_by(|a, b| (&a.group_name, &a.title).cmp(&(&b.group_name, &b.title)));
        Ok(rows)
    }
}
