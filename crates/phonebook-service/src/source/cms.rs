use super::upstream::Upstreams;
use super::{Contact, FetchFuture, SourceAdapter, SourceItems};

/// Users of a conferencing bridge, dialed by their JID.
pub struct CmsUserAdapter<'a> {
    upstreams: &'a Upstreams,
    provider_id: i64,
}

impl<'a> CmsUserAdapter<'a> {
    #[must_use]
    pub const fn new(upstreams: &'a Upstreams, provider_id: i64) -> Self {
        Self {
            upstreams,
            provider_id,
        }
    }
}

impl SourceAdapter for CmsUserAdapter<'_> {
    fn nested_items(&self) -> bool {
        false
    }

    #[tracing::instrument(skip(self), fields(provider_id = self.provider_id))]
    fn fetch(&self) -> FetchFuture<'_> {
        Box::pin(async move {
            let users = self.upstreams.cms()?.users(self.provider_id).await?;
            tracing::debug!(count = users.len(), "Fetched bridge users");

            Ok(SourceItems::Flat(
                users
                    .into_iter()
                    .map(|user| Contact::sip(user.id, user.name, user.jid))
                    .collect(),
            ))
        })
    }
}

/// Meeting spaces of a conferencing bridge.
///
/// Spaces backing an active booking are skipped, as are auto-generated spaces
/// unless `include_auto_generated` is set.
pub struct CmsSpacesAdapter<'a> {
    upstreams: &'a Upstreams,
    provider_id: i64,
    include_auto_generated: bool,
}

impl<'a> CmsSpacesAdapter<'a> {
    #[must_use]
    pub const fn new(upstreams: &'a Upstreams, provider_id: i64, include_auto_generated: bool) -> Self {
        Self {
            upstreams,
            provider_id,
            include_auto_generated,
        }
    }
}

impl SourceAdapter for CmsSpacesAdapter<'_> {
    fn nested_items(&self) -> bool {
        false
    }

    #[tracing::instrument(skip(self), fields(provider_id = self.provider_id))]
    fn fetch(&self) -> FetchFuture<'_> {
        Box::pin(async move {
            let cms = self.upstreams.cms()?;
            let booked = cms.booked_space_ids(self.provider_id).await?;
            let spaces = cms.spaces(self.provider_id).await?;

            let contacts: Vec<Contact> = spaces
                .into_iter()
                .filter(|space| !booked.contains(&space.id))
                .filter(|space| self.include_auto_generated || !space.auto_generated)
                .map(|space| {
                    let sip = cms.sip_uri(self.provider_id, &space.uri);
                    Contact::sip(space.id, space.name, sip)
                })
                .collect();

            tracing::debug!(count = contacts.len(), "Fetched bridge spaces");
            Ok(SourceItems::Flat(contacts))
        })
    }
}
