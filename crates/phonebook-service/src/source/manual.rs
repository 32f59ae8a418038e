use std::collections::HashMap;

use phonebook_db::model::{Group, Item};
use phonebook_db::store::DirectoryStore;

use super::{Contact, Descriptor, FetchError, FetchFuture, FetchResult, SourceAdapter, SourceItems, SourceTree};

/// Hand-edited groups of a manual source, read back from the store.
pub struct ManualAdapter<'a> {
    store: &'a dyn DirectoryStore,
    source_id: i64,
}

impl<'a> ManualAdapter<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn DirectoryStore, source_id: i64) -> Self {
        Self { store, source_id }
    }
}

impl SourceAdapter for ManualAdapter<'_> {
    fn nested_items(&self) -> bool {
        true
    }

    fn fetch(&self) -> FetchFuture<'_> {
        Box::pin(async move { Ok(SourceItems::Nested(serialize_tree(self.store, self.source_id).await?)) })
    }
}

/// Mirrors the manual source of another address book.
pub struct ManualLinkAdapter<'a> {
    store: &'a dyn DirectoryStore,
    manual_source_id: i64,
}

impl<'a> ManualLinkAdapter<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn DirectoryStore, manual_source_id: i64) -> Self {
        Self {
            store,
            manual_source_id,
        }
    }
}

impl SourceAdapter for ManualLinkAdapter<'_> {
    fn nested_items(&self) -> bool {
        true
    }

    #[tracing::instrument(skip(self), fields(manual_source_id = self.manual_source_id))]
    fn fetch(&self) -> FetchFuture<'_> {
        Box::pin(async move {
            if self.store.get_source(self.manual_source_id).await?.is_none() {
                return Err(FetchError::Configuration(format!(
                    "linked manual source {} no longer exists",
                    self.manual_source_id
                )));
            }
            Ok(SourceItems::Nested(
                serialize_tree(self.store, self.manual_source_id).await?,
            ))
        })
    }
}

fn contact(item: Item) -> Contact {
    Contact {
        id: item.id.to_string(),
        name: item.title,
        sip: item.sip,
        h323: item.h323,
        h323_e164: item.h323_e164,
    }
}

/// Serializes the tree below the source's root group.
///
/// A source without a root group yields an empty tree.
async fn serialize_tree(store: &dyn DirectoryStore, source_id: i64) -> FetchResult<SourceTree> {
    let groups = store.list_source_groups(source_id).await?;
    let Some(root) = groups.iter().find(|g| g.parent_id.is_none()).cloned() else {
        return Ok(SourceTree::default());
    };

    let items = store
        .list_items(groups.iter().map(|g| g.id).collect())
        .await?;

    let mut items_by_group: HashMap<i64, Vec<Contact>> = HashMap::new();
    for item in items {
        items_by_group.entry(item.group_id).or_default().push(contact(item));
    }

    let mut children_by_group: HashMap<i64, Vec<Group>> = HashMap::new();
    for group in groups {
        if let Some(parent_id) = group.parent_id {
            children_by_group.entry(parent_id).or_default().push(group);
        }
    }

    Ok(build(root, &mut children_by_group, &mut items_by_group))
}

fn build(
    group: Group,
    children_by_group: &mut HashMap<i64, Vec<Group>>,
    items_by_group: &mut HashMap<i64, Vec<Contact>>,
) -> SourceTree {
    let children = children_by_group
        .remove(&group.id)
        .unwrap_or_default()
        .into_iter()
        .map(|child| build(child, children_by_group, items_by_group))
        .collect();

    SourceTree {
        items: items_by_group.remove(&group.id).unwrap_or_default(),
        descriptor: Descriptor::new(group.id.to_string(), group.title),
        children,
    }
}
