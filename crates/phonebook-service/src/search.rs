//! Search and pagination over the canonical tree of an address book.
//!
//! ## Summary
//! Browsing (an empty search value) lists the direct children of a scope.
//! Searching walks every canonical group below the scope and matches groups on
//! title and items on title or SIP URI, case-insensitively.
//!
//! Pages number groups and items in one sequence, groups first, and resume
//! after the entry whose external id the client sends back.

use std::collections::{HashMap, HashSet};

use icu::casemap::CaseMapper;
use phonebook_core::types::ExternalRef;
use phonebook_db::model::{Group, Item, SyncGroup};
use phonebook_db::store::DirectoryStore;

use crate::error::ServiceResult;
use crate::service::PhonebookService;

/// Canonical groups and items matched by a search, both ordered by title.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchHits {
    pub groups: Vec<SyncGroup>,
    pub items: Vec<Item>,
}

impl SearchHits {
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len() + self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// ## Summary
    /// Cuts one page out of the hits.
    ///
    /// With `last_id`, entries up to and including the one with that external
    /// id are skipped and `offset` becomes its position; an id that never
    /// matches yields an empty page. Otherwise the first `offset` entries are
    /// skipped.
    ///
    /// Groups stop once `position - offset` reaches `limit`, items once it
    /// exceeds `limit`.
    #[must_use]
    pub fn page(self, limit: usize, last_id: Option<&str>, mut offset: usize) -> Self {
        let mut cursor = last_id.filter(|id| !id.is_empty());
        let mut position = 0;
        let mut page = Self::default();

        let mut full = false;
        for group in self.groups {
            position += 1;
            if let Some(target) = cursor {
                if ExternalRef::Group(group.id).to_string() == target {
                    offset = position;
                    cursor = None;
                }
                continue;
            }
            if position <= offset {
                continue;
            }
            if position - offset >= limit {
                full = true;
                break;
            }
            page.groups.push(group);
        }
        if full {
            return page;
        }

        for item in self.items {
            position += 1;
            if let Some(target) = cursor {
                if ExternalRef::Item(item.id).to_string() == target {
                    offset = position;
                    cursor = None;
                }
                continue;
            }
            if position <= offset {
                continue;
            }
            if position - offset > limit {
                break;
            }
            page.items.push(item);
        }
        page
    }
}

/// Unicode case folding used for every case-insensitive comparison.
pub(crate) fn fold(value: &str) -> String {
    CaseMapper::new().fold_string(value).into_owned()
}

fn by_title<T>(entries: &mut [T], key: impl Fn(&T) -> (&str, i64)) {
    entries.sort_by(|a, b| key(a).cmp(&key(b)));
}

/// Ids of `roots` and every canonical group below them.
fn subtree_ids(roots: impl IntoIterator<Item = i64>, children: &HashMap<i64, Vec<i64>>) -> HashSet<i64> {
    let mut seen = HashSet::new();
    let mut stack: Vec<i64> = roots.into_iter().collect();
    while let Some(id) = stack.pop() {
        if seen.insert(id) {
            stack.extend(children.get(&id).into_iter().flatten().copied());
        }
    }
    seen
}

/// ## Summary
/// Searches one address book.
///
/// `group_id` scopes the search to a canonical group (`g-<pk>` or a bare pk).
/// An unparsable or unknown scope yields no hits.
///
/// ## Errors
/// Store errors only.
#[tracing::instrument(skip(store))]
pub async fn search(
    store: &dyn DirectoryStore,
    address_book_id: i64,
    value: &str,
    group_id: Option<&str>,
) -> ServiceResult<SearchHits> {
    let sync_groups: HashMap<i64, SyncGroup> = store
        .list_sync_groups(address_book_id)
        .await?
        .into_iter()
        .map(|sg| (sg.id, sg))
        .collect();

    let scope = match group_id.map(str::trim).filter(|g| !g.is_empty()) {
        None => None,
        Some(raw) => match ExternalRef::parse_group_scope(raw).and_then(|pk| sync_groups.get(&pk)) {
            Some(scope) => Some(scope.id),
            None => {
                tracing::debug!(group_id = raw, "Unknown search scope");
                return Ok(SearchHits::default());
            }
        },
    };

    let groups: HashMap<i64, Group> = store
        .list_groups(address_book_id)
        .await?
        .into_iter()
        .map(|g| (g.id, g))
        .collect();
    let items = store.list_book_items(address_book_id).await?;

    let is_top_level = |sg: &SyncGroup| match sg.parent_id {
        None => true,
        Some(parent_id) => sync_groups.get(&parent_id).is_some_and(SyncGroup::is_root),
    };
    let mut candidates: Vec<&SyncGroup> = sync_groups
        .values()
        .filter(|sg| match scope {
            Some(scope_id) => sg.parent_id == Some(scope_id),
            None => !sg.title.is_empty() && is_top_level(sg),
        })
        .collect();
    candidates.sort_by_key(|sg| sg.id);

    if value.is_empty() {
        let mut hits = SearchHits {
            groups: candidates.into_iter().cloned().collect(),
            items: items
                .into_iter()
                .filter(|item| {
                    groups.get(&item.group_id).is_some_and(|g| match scope {
                        Some(scope_id) => g.sync_group_id == Some(scope_id),
                        None => g.is_root_wrapper(),
                    })
                })
                .collect(),
        };
        by_title(&mut hits.groups, |sg| (sg.title.as_str(), sg.id));
        by_title(&mut hits.items, |item| (item.title.as_str(), item.id));
        return Ok(hits);
    }

    let mut children: HashMap<i64, Vec<i64>> = HashMap::new();
    for sg in sync_groups.values() {
        if let Some(parent_id) = sg.parent_id {
            children.entry(parent_id).or_default().push(sg.id);
        }
    }
    let in_scope = subtree_ids(
        scope.into_iter().chain(candidates.iter().map(|sg| sg.id)),
        &children,
    );

    let needle = fold(value);
    let mut hits = SearchHits {
        groups: sync_groups
            .values()
            .filter(|sg| in_scope.contains(&sg.id) && Some(sg.id) != scope && !sg.is_root())
            .filter(|sg| fold(&sg.title).contains(&needle))
            .cloned()
            .collect(),
        items: items
            .into_iter()
            .filter(|item| {
                scope.is_none()
                    || groups
                        .get(&item.group_id)
                        .and_then(|g| g.sync_group_id)
                        .is_some_and(|sg| in_scope.contains(&sg))
            })
            .filter(|item| fold(&item.title).contains(&needle) || fold(&item.sip).contains(&needle))
            .collect(),
    };
    by_title(&mut hits.groups, |sg| (sg.title.as_str(), sg.id));
    by_title(&mut hits.items, |item| (item.title.as_str(), item.id));
    Ok(hits)
}

/// One page of [`search`], see [`SearchHits::page`].
///
/// ## Errors
/// Store errors only.
pub async fn limit_search(
    store: &dyn DirectoryStore,
    address_book_id: i64,
    value: &str,
    group_id: Option<&str>,
    limit: usize,
    last_id: Option<&str>,
    offset: usize,
) -> ServiceResult<SearchHits> {
    Ok(search(store, address_book_id, value, group_id)
        .await?
        .page(limit, last_id, offset))
}

impl PhonebookService {
    /// Searches an address book. See [`search`].
    ///
    /// ## Errors
    /// Store errors only.
    pub async fn search(
        &self,
        address_book_id: i64,
        value: &str,
        group_id: Option<&str>,
    ) -> ServiceResult<SearchHits> {
        search(self.store(), address_book_id, value, group_id).await
    }
}
