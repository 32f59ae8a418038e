//! Writes one adapter tree below a sync anchor and removes what disappeared.

use std::collections::{HashMap, HashSet};

use phonebook_core::util::path::truncate_title;
use phonebook_db::model::{Group, GroupChanges, Item, ItemFields, NewGroup, NewItem};
use phonebook_db::store::DirectoryStore;

use crate::error::{ServiceError, ServiceResult};
use crate::source::{Contact, Descriptor, SourceTree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeOptions {
    /// Write every descendant folder's contacts into the parent group.
    pub flatten_groups: bool,
    /// Remove groups and items of the source that were not written.
    pub delete_other: bool,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            flatten_groups: false,
            delete_other: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub created_groups: usize,
    pub updated_groups: usize,
    pub deleted_groups: usize,
    pub created_items: usize,
    pub updated_items: usize,
    pub deleted_items: usize,
    pub skipped_items: usize,
}

impl TreeStats {
    /// Whether the pass wrote nothing.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.created_groups == 0
            && self.updated_groups == 0
            && self.deleted_groups == 0
            && self.created_items == 0
            && self.updated_items == 0
            && self.deleted_items == 0
    }
}

/// Ids of `group` and its ancestors, leaf first.
pub(crate) fn ancestors_or_self(group_id: i64, groups: &HashMap<i64, Group>) -> Vec<i64> {
    let mut chain = Vec::new();
    let mut current = Some(group_id);
    while let Some(id) = current {
        if chain.contains(&id) {
            break;
        }
        chain.push(id);
        current = groups.get(&id).and_then(|g| g.parent_id);
    }
    chain
}

struct TreeWriter<'a> {
    store: &'a dyn DirectoryStore,
    address_book_id: i64,
    source_id: Option<i64>,
    existing_groups: HashMap<String, Group>,
    existing_items: HashMap<(i64, String), Item>,
    valid_groups: HashSet<i64>,
    valid_items: HashSet<i64>,
    stats: TreeStats,
}

impl TreeWriter<'_> {
    async fn write_item(&mut self, group_id: i64, contact: Contact) -> ServiceResult<()> {
        if !contact.is_dialable() {
            self.stats.skipped_items += 1;
            return Ok(());
        }

        let key = (group_id, contact.id);
        if let Some(existing) = self.existing_items.get_mut(&key) {
            let fields = ItemFields {
                title: truncate_title(&contact.name),
                description: existing.description.clone(),
                sip: contact.sip,
                h323: contact.h323,
                h323_e164: contact.h323_e164,
                tel: existing.tel.clone(),
            }
            .with_default_title();

            if fields != existing.fields() {
                self.store.update_item(existing.id, fields.clone()).await?;
                existing.title = fields.title;
                existing.sip = fields.sip;
                existing.h323 = fields.h323;
                existing.h323_e164 = fields.h323_e164;
                self.stats.updated_items += 1;
            }
            self.valid_items.insert(existing.id);
            return Ok(());
        }

        let item = self
            .store
            .create_item(NewItem {
                group_id,
                external_id: key.1.clone(),
                fields: ItemFields {
                    title: truncate_title(&contact.name),
                    sip: contact.sip,
                    h323: contact.h323,
                    h323_e164: contact.h323_e164,
                    ..ItemFields::default()
                }
                .with_default_title(),
            })
            .await?;
        self.stats.created_items += 1;
        self.valid_items.insert(item.id);
        self.existing_items.insert(key, item);
        Ok(())
    }

    /// Reuses or creates the group of `descriptor` under `parent_id`.
    ///
    /// Returns `None` when the descriptor was already written in this pass.
    async fn write_group(
        &mut self,
        parent_id: i64,
        descriptor: Descriptor,
    ) -> ServiceResult<Option<i64>> {
        let title = truncate_title(&descriptor.name);

        if let Some(existing) = self.existing_groups.get_mut(&descriptor.id) {
            if self.valid_groups.contains(&existing.id) || existing.id == parent_id {
                tracing::warn!(
                    external_id = %descriptor.id,
                    "Folder appears more than once in source tree, skipping"
                );
                return Ok(None);
            }

            if existing.title != title || existing.parent_id != Some(parent_id) {
                self.store
                    .update_group(
                        existing.id,
                        GroupChanges {
                            title: title.clone(),
                            parent_id: Some(parent_id),
                        },
                    )
                    .await?;
                existing.title = title;
                existing.parent_id = Some(parent_id);
                self.stats.updated_groups += 1;
            }
            self.valid_groups.insert(existing.id);
            return Ok(Some(existing.id));
        }

        let group = self
            .store
            .create_group(NewGroup {
                address_book_id: self.address_book_id,
                source_id: self.source_id,
                parent_id: Some(parent_id),
                title,
                external_id: descriptor.id.clone(),
            })
            .await?;
        self.stats.created_groups += 1;
        self.valid_groups.insert(group.id);
        let id = group.id;
        self.existing_groups.insert(descriptor.id, group);
        Ok(Some(id))
    }

    async fn write(
        &mut self,
        anchor_id: i64,
        children: Vec<SourceTree>,
        items: Vec<Contact>,
        flatten_groups: bool,
    ) -> ServiceResult<()> {
        let mut pending = vec![(anchor_id, children, items)];

        while let Some((group_id, children, items)) = pending.pop() {
            for contact in items {
                self.write_item(group_id, contact).await?;
            }

            let mut next = Vec::with_capacity(children.len());
            for child in children {
                if flatten_groups {
                    next.push((group_id, child.children, child.items));
                } else if let Some(child_id) = self.write_group(group_id, child.descriptor).await? {
                    next.push((child_id, child.children, child.items));
                }
            }
            pending.extend(next.into_iter().rev());
        }
        Ok(())
    }
}

/// Writes an adapter tree below `anchor`, the root descriptor mapping onto the
/// anchor itself.
///
/// Items are keyed by `(group, external id)` and groups by external id among
/// all groups of the anchor's source. Contacts without any dial field are
/// skipped.
///
/// ## Errors
/// Fails with `DeletionSafety` before deleting anything when the anchor's
/// parent belongs to another source, and with store errors.
#[tracing::instrument(skip(store, anchor, children, items), fields(anchor_id = anchor.id, source_id = ?anchor.source_id))]
pub async fn sync_tree(
    store: &dyn DirectoryStore,
    anchor: &Group,
    children: Vec<SourceTree>,
    items: Vec<Contact>,
    options: TreeOptions,
) -> ServiceResult<TreeStats> {
    let book_groups: HashMap<i64, Group> = store
        .list_groups(anchor.address_book_id)
        .await?
        .into_iter()
        .map(|g| (g.id, g))
        .collect();

    let source_groups: Vec<&Group> = book_groups
        .values()
        .filter(|g| g.source_id == anchor.source_id)
        .collect();

    let protected: HashSet<i64> = ancestors_or_self(anchor.id, &book_groups)
        .into_iter()
        .filter(|id| book_groups.get(id).is_some_and(|g| g.source_id == anchor.source_id))
        .chain([anchor.id])
        .collect();

    let mut existing_groups = HashMap::new();
    let mut ordered: Vec<&Group> = source_groups
        .iter()
        .copied()
        .filter(|g| !protected.contains(&g.id))
        .collect();
    ordered.sort_by_key(|g| g.id);
    for group in ordered {
        existing_groups
            .entry(group.external_id.clone())
            .or_insert_with(|| group.clone());
    }

    let mut existing_items = HashMap::new();
    for item in store
        .list_items(source_groups.iter().map(|g| g.id).collect())
        .await?
    {
        existing_items
            .entry((item.group_id, item.external_id.clone()))
            .or_insert(item);
    }

    let mut writer = TreeWriter {
        store,
        address_book_id: anchor.address_book_id,
        source_id: anchor.source_id,
        existing_groups,
        existing_items,
        valid_groups: HashSet::from([anchor.id]),
        valid_items: HashSet::new(),
        stats: TreeStats::default(),
    };
    writer
        .write(anchor.id, children, items, options.flatten_groups)
        .await?;

    let mut stats = writer.stats;
    if !options.delete_other {
        return Ok(stats);
    }

    if let Some(parent_id) = anchor.parent_id
        && book_groups.get(&parent_id).map(|p| p.source_id) != Some(anchor.source_id)
    {
        return Err(ServiceError::DeletionSafety {
            anchor_id: anchor.id,
        });
    }

    let current_groups: Vec<Group> = match anchor.source_id {
        Some(source_id) => store.list_source_groups(source_id).await?,
        None => store
            .list_groups(anchor.address_book_id)
            .await?
            .into_iter()
            .filter(|g| g.source_id.is_none())
            .collect(),
    };

    let stale_items: Vec<i64> = store
        .list_items(current_groups.iter().map(|g| g.id).collect())
        .await?
        .into_iter()
        .map(|item| item.id)
        .filter(|id| !writer.valid_items.contains(id))
        .collect();

    let stale_groups: Vec<i64> = current_groups
        .iter()
        .map(|g| g.id)
        .filter(|id| !protected.contains(id) && !writer.valid_groups.contains(id))
        .collect();

    stats.deleted_items = stale_items.len();
    stats.deleted_groups = stale_groups.len();
    store.delete_items(stale_items).await?;
    store.delete_groups(stale_groups).await?;

    tracing::debug!(?stats, "Source tree written");
    Ok(stats)
}
