//! Path merge engine.
//!
//! Rebuilds the canonical sync-group tree of an address book from the raw
//! groups of all its sources. Raw groups with the same name path share one
//! sync group.

use std::collections::{HashMap, HashSet};

use phonebook_core::util::path::{join_path, title_segments};
use phonebook_db::model::{Group, NewSyncGroup, SyncGroup};
use phonebook_db::store::DirectoryStore;
use serde::Serialize;

use crate::error::ServiceResult;
use crate::sync::tree::ancestors_or_self;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub created: usize,
    pub updated: usize,
    pub reassigned: usize,
    pub deleted: usize,
}

impl MergeReport {
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.created == 0 && self.updated == 0 && self.reassigned == 0 && self.deleted == 0
    }
}

/// Title segments from the top of the tree down to `group`.
///
/// Titles are split on `>`, trimmed and empty segments dropped. The walk stops
/// at a parentless group with an empty title, which contributes nothing.
#[must_use]
pub fn name_paths(group: &Group, groups: &HashMap<i64, Group>) -> Vec<String> {
    let mut chain: Vec<&Group> = Vec::new();
    for id in ancestors_or_self(group.id, groups) {
        let current = if id == group.id {
            group
        } else if let Some(parent) = groups.get(&id) {
            parent
        } else {
            break;
        };
        if current.is_root_wrapper() {
            break;
        }
        chain.push(current);
    }

    chain
        .into_iter()
        .rev()
        .flat_map(|g| title_segments(&g.title))
        .map(str::to_owned)
        .collect()
}

struct MergePass<'a> {
    store: &'a dyn DirectoryStore,
    address_book_id: i64,
    by_path: HashMap<String, SyncGroup>,
    touched: HashMap<String, i64>,
    report: MergeReport,
}

impl MergePass<'_> {
    async fn root(&mut self, existing: &[SyncGroup]) -> ServiceResult<i64> {
        let id = if let Some(root) = existing.iter().find(|sg| sg.is_root()) {
            root.id
        } else {
            let root = self
                .store
                .create_sync_group(NewSyncGroup {
                    address_book_id: self.address_book_id,
                    parent_id: None,
                    title: String::new(),
                    full_path: String::new(),
                })
                .await?;
            self.report.created += 1;
            root.id
        };
        self.touched.insert(String::new(), id);
        Ok(id)
    }

    /// Sync group of `path`, creating or repairing its ancestors on the way.
    ///
    /// The leaf takes `leaf_title`; synthesized ancestors take their last segment.
    async fn resolve(&mut self, root_id: i64, path: &[String], leaf_title: &str) -> ServiceResult<i64> {
        let mut parent_id = root_id;

        for depth in 1..=path.len() {
            let full_path = join_path(&path[..depth]);
            if let Some(&id) = self.touched.get(&full_path) {
                parent_id = id;
                continue;
            }

            let title = if depth == path.len() {
                leaf_title.to_owned()
            } else {
                path[depth - 1].clone()
            };

            let id = if let Some(existing) = self.by_path.get(&full_path) {
                if existing.parent_id != Some(parent_id) || existing.title != title {
                    self.store
                        .update_sync_group(existing.id, Some(parent_id), title)
                        .await?;
                    self.report.updated += 1;
                }
                existing.id
            } else {
                let created = self
                    .store
                    .create_sync_group(NewSyncGroup {
                        address_book_id: self.address_book_id,
                        parent_id: Some(parent_id),
                        title,
                        full_path: full_path.clone(),
                    })
                    .await?;
                self.report.created += 1;
                created.id
            };

            self.touched.insert(full_path, id);
            parent_id = id;
        }

        Ok(parent_id)
    }
}

/// ## Summary
/// Builds exactly one sync group per distinct name path and attaches every raw
/// group of the book to it.
///
/// Sync groups not reached during the pass are deleted. A second pass without
/// raw group changes writes nothing.
///
/// ## Errors
/// Returns store errors.
#[tracing::instrument(skip(store))]
pub async fn merge_groups(store: &dyn DirectoryStore, address_book_id: i64) -> ServiceResult<MergeReport> {
    let groups: HashMap<i64, Group> = store
        .list_groups(address_book_id)
        .await?
        .into_iter()
        .map(|g| (g.id, g))
        .collect();
    let existing = store.list_sync_groups(address_book_id).await?;

    let mut by_path = HashMap::new();
    for sync_group in existing.iter().filter(|sg| !sg.is_root()) {
        by_path
            .entry(sync_group.full_path.clone())
            .or_insert_with(|| sync_group.clone());
    }

    let mut pass = MergePass {
        store,
        address_book_id,
        by_path,
        touched: HashMap::new(),
        report: MergeReport::default(),
    };
    let root_id = pass.root(&existing).await?;

    let mut ordered: Vec<(Vec<String>, &Group)> = groups
        .values()
        .map(|g| (name_paths(g, &groups), g))
        .collect();
    ordered.sort_by(|a, b| a.0.len().cmp(&b.0.len()).then(a.1.id.cmp(&b.1.id)));

    for (path, group) in ordered {
        let sync_group_id = pass.resolve(root_id, &path, &group.title).await?;
        if group.sync_group_id != Some(sync_group_id) {
            store.set_sync_group(group.id, Some(sync_group_id)).await?;
            pass.report.reassigned += 1;
        }
    }

    let touched: HashSet<i64> = pass.touched.values().copied().collect();
    let orphaned: Vec<i64> = existing
        .iter()
        .map(|sg| sg.id)
        .filter(|id| !touched.contains(id))
        .collect();
    pass.report.deleted = orphaned.len();
    store.delete_sync_groups(orphaned).await?;

    let report = pass.report;
    if report.is_noop() {
        tracing::debug!("Merge pass changed nothing");
    } else {
        tracing::debug!(?report, "Merge pass applied changes");
    }
    Ok(report)
}
