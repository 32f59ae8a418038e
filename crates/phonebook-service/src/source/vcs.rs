use phonebook_soap::soap::Protocol;

use super::upstream::{Registration, Upstreams};
use super::{Contact, FetchFuture, SourceAdapter, SourceItems};

/// Registrations of a video registrar, optionally limited to alias domains.
pub struct VcsAdapter<'a> {
    upstreams: &'a Upstreams,
    provider_id: i64,
    domains: Vec<String>,
}

impl<'a> VcsAdapter<'a> {
    /// `limit_domains` is a comma separated list of alias suffixes.
    #[must_use]
    pub fn new(upstreams: &'a Upstreams, provider_id: i64, limit_domains: &str) -> Self {
        Self {
            upstreams,
            provider_id,
            domains: limit_domains
                .split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_owned)
                .collect(),
        }
    }

    fn accepts(&self, registration: &Registration) -> bool {
        self.domains.is_empty()
            || self
                .domains
                .iter()
                .any(|domain| registration.alias.ends_with(domain.as_str()))
    }
}

/// Registrations are keyed by protocol and alias, the pair the registrar
/// treats as unique.
fn contact(registration: Registration) -> Contact {
    let id = format!("{}:{}", registration.protocol.as_str(), registration.alias);
    let (sip, h323) = match registration.protocol {
        Protocol::Sip => (registration.alias.clone(), String::new()),
        Protocol::H323 => (String::new(), registration.number),
    };
    Contact {
        id,
        name: registration.alias,
        sip,
        h323,
        h323_e164: String::new(),
    }
}

impl SourceAdapter for VcsAdapter<'_> {
    fn nested_items(&self) -> bool {
        false
    }

    #[tracing::instrument(skip(self), fields(provider_id = self.provider_id))]
    fn fetch(&self) -> FetchFuture<'_> {
        Box::pin(async move {
            let registrations = self
                .upstreams
                .vcs()?
                .registrations(self.provider_id)
                .await?;

            Ok(SourceItems::Flat(
                registrations
                    .into_iter()
                    .filter(|r| self.accepts(r))
                    .map(contact)
                    .collect(),
            ))
        })
    }
}
