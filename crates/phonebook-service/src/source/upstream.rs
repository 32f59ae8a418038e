//! Native APIs of the upstream systems.
//!
//! Only the shape of what each system returns matters here. Deployments plug
//! their clients into an [`Upstreams`] registry; a missing client turns into a
//! configuration error on the sources that need it.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use phonebook_soap::soap::{Protocol, SearchPage, SearchQuery};

use super::error::{FetchError, FetchResult};
use super::tms::HttpPhonebookClient;

pub type UpstreamFuture<'a, T> = Pin<Box<dyn Future<Output = FetchResult<T>> + Send + 'a>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CmsUser {
    pub id: String,
    pub name: String,
    pub jid: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CmsSpace {
    pub id: String,
    pub name: String,
    pub uri: String,
    pub auto_generated: bool,
}

/// User and meeting-space directory of a conferencing bridge.
pub trait CmsDirectory: Send + Sync {
    fn users(&self, provider_id: i64) -> UpstreamFuture<'_, Vec<CmsUser>>;

    fn spaces(&self, provider_id: i64) -> UpstreamFuture<'_, Vec<CmsSpace>>;

    /// Ids of spaces currently backing an active booking.
    fn booked_space_ids(&self, provider_id: i64) -> UpstreamFuture<'_, HashSet<String>>;

    /// Full SIP URI of a space URI user part.
    fn sip_uri(&self, _provider_id: i64, uri: &str) -> String {
        uri.to_owned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub alias: String,
    pub protocol: Protocol,
    pub number: String,
}

/// Live registrations of a video registrar.
pub trait VcsRegistrar: Send + Sync {
    fn registrations(&self, provider_id: i64) -> UpstreamFuture<'_, Vec<Registration>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgUnit {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Endpoint {
    pub id: i64,
    pub title: String,
    pub sip: String,
    pub h323: String,
    pub h323_e164: String,
    pub org_unit_id: Option<i64>,
    pub hide_from_addressbook: bool,
}

/// The local room and endpoint registry.
pub trait EndpointRegistry: Send + Sync {
    fn endpoints(&self) -> UpstreamFuture<'_, Vec<Endpoint>>;

    fn org_units(&self) -> UpstreamFuture<'_, Vec<OrgUnit>>;
}

/// One page request against a remote `PhoneBookSearch` server.
pub trait PhonebookClient: Send + Sync {
    fn search<'a>(&'a self, url: &'a str, query: SearchQuery)
    -> UpstreamFuture<'a, SearchPage>;
}

/// Clients for every upstream system a deployment talks to.
#[derive(Clone)]
pub struct Upstreams {
    pub cms: Option<Arc<dyn CmsDirectory>>,
    pub vcs: Option<Arc<dyn VcsRegistrar>>,
    pub endpoints: Option<Arc<dyn EndpointRegistry>>,
    pub phonebook: Arc<dyn PhonebookClient>,
}

impl Default for Upstreams {
    fn default() -> Self {
        Self {
            cms: None,
            vcs: None,
            endpoints: None,
            phonebook: Arc::new(HttpPhonebookClient::default()),
        }
    }
}

impl Upstreams {
    /// ## Errors
    /// Returns a configuration error when no bridge directory is registered.
    pub fn cms(&self) -> FetchResult<&dyn CmsDirectory> {
        self.cms
            .as_deref()
            .ok_or_else(|| FetchError::Configuration("no CMS directory configured".into()))
    }

    /// ## Errors
    /// Returns a configuration error when no registrar is registered.
    pub fn vcs(&self) -> FetchResult<&dyn VcsRegistrar> {
        self.vcs
            .as_deref()
            .ok_or_else(|| FetchError::Configuration("no VCS registrar configured".into()))
    }

    /// ## Errors
    /// Returns a configuration error when no endpoint registry is registered.
    pub fn endpoints(&self) -> FetchResult<&dyn EndpointRegistry> {
        self.endpoints
            .as_deref()
            .ok_or_else(|| FetchError::Configuration("no endpoint registry configured".into()))
    }
}
