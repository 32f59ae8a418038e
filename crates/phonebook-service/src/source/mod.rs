//! Source adapters.
//!
//! Each adapter turns one upstream system into either a flat list of contacts
//! or a nested tree of descriptors with contacts at every level. The tree
//! synchronizer only ever sees this normalized shape.

mod cms;
mod epm;
mod error;
mod manual;
mod seevia;
mod tms;
pub mod upstream;
mod vcs;

use std::future::Future;
use std::pin::Pin;

use phonebook_db::model::{Source, SourceConfig};
use phonebook_db::store::DirectoryStore;

pub use cms::{CmsSpacesAdapter, CmsUserAdapter};
pub use epm::EpmAdapter;
pub use error::{FetchError, FetchResult};
pub use manual::{ManualAdapter, ManualLinkAdapter};
pub use seevia::SeeviaAdapter;
pub use tms::{HttpPhonebookClient, TmsAdapter};
pub use upstream::Upstreams;
pub use vcs::VcsAdapter;

pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = FetchResult<SourceItems>> + Send + 'a>>;

/// Identity and display name of an upstream folder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Descriptor {
    pub id: String,
    pub name: String,
}

impl Descriptor {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A dialable contact as reported upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub sip: String,
    pub h323: String,
    pub h323_e164: String,
}

impl Contact {
    #[must_use]
    pub fn sip(id: impl Into<String>, name: impl Into<String>, sip: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            sip: sip.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_dialable(&self) -> bool {
        !(self.sip.is_empty() && self.h323.is_empty() && self.h323_e164.is_empty())
    }
}

/// One folder of a nested source with its subfolders and contacts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceTree {
    pub descriptor: Descriptor,
    pub children: Vec<SourceTree>,
    pub items: Vec<Contact>,
}

impl SourceTree {
    /// Total contacts in this folder and below.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.items.len() + self.children.iter().map(Self::item_count).sum::<usize>()
    }
}

/// What a source yields for one sync pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceItems {
    Flat(Vec<Contact>),
    Nested(SourceTree),
}

impl SourceItems {
    /// Splits into the subfolders and contacts written below the sync anchor.
    ///
    /// The root descriptor of a nested tree maps onto the anchor itself.
    #[must_use]
    pub fn into_parts(self) -> (Vec<SourceTree>, Vec<Contact>) {
        match self {
            Self::Flat(items) => (Vec::new(), items),
            Self::Nested(tree) => (tree.children, tree.items),
        }
    }
}

/// Fetches the current contents of one upstream.
pub trait SourceAdapter: Send + Sync {
    /// Whether `fetch` yields a nested tree.
    fn nested_items(&self) -> bool;

    fn fetch(&self) -> FetchFuture<'_>;
}

/// Builds the adapter for a stored source.
#[must_use]
pub fn adapter_for<'a>(
    source: &'a Source,
    store: &'a dyn DirectoryStore,
    upstreams: &'a Upstreams,
) -> Box<dyn SourceAdapter + 'a> {
    match &source.config {
        SourceConfig::Manual => Box::new(ManualAdapter::new(store, source.id)),
        SourceConfig::ManualLink { manual_source_id } => {
            Box::new(ManualLinkAdapter::new(store, *manual_source_id))
        }
        SourceConfig::CmsUser { provider_id } => {
            Box::new(CmsUserAdapter::new(upstreams, *provider_id))
        }
        SourceConfig::CmsCoSpace {
            provider_id,
            include_auto_generated,
        } => Box::new(CmsSpacesAdapter::new(
            upstreams,
            *provider_id,
            *include_auto_generated,
        )),
        SourceConfig::Tms { mac, phonebook_url } => {
            Box::new(TmsAdapter::new(upstreams, mac, phonebook_url))
        }
        SourceConfig::Vcs {
            provider_id,
            limit_domains,
        } => Box::new(VcsAdapter::new(upstreams, *provider_id, limit_domains)),
        SourceConfig::Seevia { .. } => Box::new(SeeviaAdapter),
        SourceConfig::Epm {
            org_unit_id,
            flatten,
            ignore_hide_status,
        } => Box::new(EpmAdapter::new(
            upstreams,
            *org_unit_id,
            *flatten,
            *ignore_hide_status,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(id: &str, children: Vec<SourceTree>, items: usize) -> SourceTree {
        SourceTree {
            descriptor: Descriptor::new(id, id),
            children,
            items: (0..items)
                .map(|i| Contact::sip(format!("{id}-{i}"), "x", "x@example.com"))
                .collect(),
        }
    }

    #[test]
    fn item_count_includes_subfolders() {
        let root = tree("root", vec![tree("a", vec![tree("b", vec![], 2)], 1)], 3);
        assert_eq!(root.item_count(), 6);
    }

    #[test]
    fn nested_root_maps_onto_anchor() {
        let (children, items) =
            SourceItems::Nested(tree("root", vec![tree("a", vec![], 0)], 1)).into_parts();
        assert_eq!(children.len(), 1);
        assert_eq!(items.len(), 1);

        let (children, items) =
            SourceItems::Flat(vec![Contact::default(), Contact::default()]).into_parts();
        assert!(children.is_empty());
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn dialable_needs_a_dial_field() {
        assert!(!Contact::default().is_dialable());
        assert!(
            Contact {
                h323_e164: "100".into(),
                ..Contact::default()
            }
            .is_dialable()
        );
    }
}
