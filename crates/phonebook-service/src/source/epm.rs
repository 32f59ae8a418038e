use std::collections::{HashMap, HashSet};

use super::upstream::{Endpoint, OrgUnit, Upstreams};
use super::{Contact, Descriptor, FetchError, FetchFuture, SourceAdapter, SourceItems, SourceTree};

/// Endpoints of the local registry, grouped by organization unit.
pub struct EpmAdapter<'a> {
    upstreams: &'a Upstreams,
    org_unit_id: Option<i64>,
    flatten: bool,
    ignore_hide_status: bool,
}

impl<'a> EpmAdapter<'a> {
    #[must_use]
    pub const fn new(
        upstreams: &'a Upstreams,
        org_unit_id: Option<i64>,
        flatten: bool,
        ignore_hide_status: bool,
    ) -> Self {
        Self {
            upstreams,
            org_unit_id,
            flatten,
            ignore_hide_status,
        }
    }
}

fn contact(endpoint: Endpoint) -> Contact {
    Contact {
        id: endpoint.id.to_string(),
        name: endpoint.title,
        sip: endpoint.sip,
        h323: endpoint.h323,
        h323_e164: endpoint.h323_e164,
    }
}

/// Ids of `root` and every unit below it.
fn descendants(units: &[OrgUnit], root: i64) -> HashSet<i64> {
    let mut found = HashSet::from([root]);
    let mut frontier = vec![root];
    while let Some(parent) = frontier.pop() {
        for unit in units {
            if unit.parent_id == Some(parent) && found.insert(unit.id) {
                frontier.push(unit.id);
            }
        }
    }
    found
}

struct Folders {
    items: HashMap<Option<i64>, Vec<Contact>>,
    children: HashMap<Option<i64>, Vec<OrgUnit>>,
}

impl Folders {
    /// Builds the folder and prunes subfolders without any contacts.
    ///
    /// Each folder's children are taken once, so a cyclic unit table terminates.
    fn build(&mut self, folder_id: Option<i64>, name: String) -> SourceTree {
        let items = self.items.remove(&folder_id).unwrap_or_default();
        let units = self.children.remove(&folder_id).unwrap_or_default();

        let children = units
            .into_iter()
            .map(|unit| self.build(Some(unit.id), unit.name))
            .filter(|child| child.item_count() > 0)
            .collect();

        SourceTree {
            descriptor: Descriptor::new(folder_id.map(|id| id.to_string()).unwrap_or_default(), name),
            children,
            items,
        }
    }
}

impl SourceAdapter for EpmAdapter<'_> {
    fn nested_items(&self) -> bool {
        true
    }

    #[tracing::instrument(skip(self), fields(org_unit_id = ?self.org_unit_id, flatten = self.flatten))]
    fn fetch(&self) -> FetchFuture<'_> {
        Box::pin(async move {
            let registry = self.upstreams.endpoints()?;
            let mut endpoints = registry.endpoints().await?;
            if !self.ignore_hide_status {
                endpoints.retain(|e| !e.hide_from_addressbook);
            }

            let mut folders = Folders {
                items: HashMap::new(),
                children: HashMap::new(),
            };
            let mut root_name = "Root".to_owned();

            if let Some(org_unit_id) = self.org_unit_id {
                let units = registry.org_units().await?;
                let root = units
                    .iter()
                    .find(|u| u.id == org_unit_id)
                    .ok_or_else(|| {
                        FetchError::Configuration(format!("unknown organization unit {org_unit_id}"))
                    })?;
                root_name.clone_from(&root.name);

                let included = descendants(&units, org_unit_id);
                endpoints.retain(|e| e.org_unit_id.is_some_and(|id| included.contains(&id)));

                for unit in units.into_iter().filter(|u| included.contains(&u.id)) {
                    let parent = if self.flatten { None } else { unit.parent_id };
                    folders.children.entry(parent).or_default().push(unit);
                }
            }

            for endpoint in endpoints {
                let folder = if self.org_unit_id.is_some() && !self.flatten {
                    endpoint.org_unit_id
                } else {
                    None
                };
                folders.items.entry(folder).or_default().push(contact(endpoint));
            }

            let tree = match self.org_unit_id {
                Some(org_unit_id) if !self.flatten => {
                    folders.build(Some(org_unit_id), root_name)
                }
                _ if self.flatten => SourceTree {
                    items: folders.items.remove(&None).unwrap_or_default(),
                    ..SourceTree::default()
                },
                _ => folders.build(None, root_name),
            };

            Ok(SourceItems::Nested(tree))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::source::upstream::{EndpointRegistry, UpstreamFuture};

    struct Registry;

    fn endpoint(id: i64, org_unit_id: Option<i64>, hidden: bool) -> Endpoint {
        Endpoint {
            id,
            title: format!("Room {id}"),
            sip: format!("room{id}@example.com"),
            org_unit_id,
            hide_from_addressbook: hidden,
            ..Endpoint::default()
        }
    }

    impl EndpointRegistry for Registry {
        fn endpoints(&self) -> UpstreamFuture<'_, Vec<Endpoint>> {
            Box::pin(async {
                Ok(vec![
                    endpoint(1, None, false),
                    endpoint(2, Some(10), false),
                    endpoint(3, Some(11), false),
                    endpoint(4, Some(11), true),
                ])
            })
        }

        fn org_units(&self) -> UpstreamFuture<'_, Vec<OrgUnit>> {
            let unit = |id, parent_id, name: &str| OrgUnit {
                id,
                parent_id,
                name: name.into(),
            };
            let units = vec![
                unit(10, None, "Sweden"),
                unit(11, Some(10), "Stockholm"),
                unit(12, Some(10), "Empty"),
            ];
            Box::pin(async move { Ok(units) })
        }
    }

    fn upstreams() -> Upstreams {
        Upstreams {
            endpoints: Some(Arc::new(Registry)),
            ..Upstreams::default()
        }
    }

    async fn fetch(adapter: EpmAdapter<'_>) -> SourceTree {
        match adapter.fetch().await.unwrap() {
            SourceItems::Nested(tree) => tree,
            SourceItems::Flat(_) => panic!("expected a tree"),
        }
    }

    #[test_log::test(tokio::test)]
    async fn without_org_unit_everything_is_at_root() {
        let upstreams = upstreams();
        let tree = fetch(EpmAdapter::new(&upstreams, None, false, false)).await;
        assert!(tree.children.is_empty());
        assert_eq!(tree.items.len(), 3);

        let tree = fetch(EpmAdapter::new(&upstreams, None, false, true)).await;
        assert_eq!(tree.items.len(), 4);
    }

    #[test_log::test(tokio::test)]
    async fn org_unit_subtree_prunes_empty_units() {
        let upstreams = upstreams();
        let tree = fetch(EpmAdapter::new(&upstreams, Some(10), false, false)).await;
        assert_eq!(tree.descriptor, Descriptor::new("10", "Sweden"));
        assert_eq!(tree.items.len(), 1);
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].descriptor.name, "Stockholm");
        assert_eq!(tree.children[0].items[0].id, "3");
    }

    #[test_log::test(tokio::test)]
    async fn flatten_collects_subtree_items() {
        let upstreams = upstreams();
        let tree = fetch(EpmAdapter::new(&upstreams, Some(10), true, false)).await;
        assert!(tree.children.is_empty());
        let ids: Vec<_> = tree.items.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3"]);
    }
}
