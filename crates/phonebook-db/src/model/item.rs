use diesel::{pg::Pg, prelude::*};

use crate::db::schema;

/// A dialable contact or room under a group.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable)]
#[diesel(table_name = schema::item)]
#[diesel(check_for_backend(Pg))]
pub struct Item {
    pub id: i64,
    pub group_id: i64,
    pub title: String,
    pub description: String,
    pub sip: String,
    pub h323: String,
    pub h323_e164: String,
    pub tel: String,
    pub external_id: String,
}

impl Item {
    #[must_use]
    pub fn fields(&self) -> ItemFields {
        ItemFields {
            title: self.title.clone(),
            description: self.description.clone(),
            sip: self.sip.clone(),
            h323: self.h323.clone(),
            h323_e164: self.h323_e164.clone(),
            tel: self.tel.clone(),
        }
    }
}

/// Editable contact fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Insertable, AsChangeset)]
#[diesel(table_name = schema::item)]
pub struct ItemFields {
    pub title: String,
    pub description: String,
    pub sip: String,
    pub h323: String,
    pub h323_e164: String,
    pub tel: String,
}

impl ItemFields {
    /// Whether any of sip, h323 or h323_e164 is set.
    #[must_use]
    pub fn is_dialable(&self) -> bool {
        !(self.sip.is_empty() && self.h323.is_empty() && self.h323_e164.is_empty())
    }

    /// Fills a blank title from the first populated dial field.
    #[must_use]
    pub fn with_default_title(mut self) -> Self {
        if self.title.trim().is_empty() {
            self.title = [&self.sip, &self.h323, &self.h323_e164]
                .into_iter()
                .find(|s| !s.is_empty())
                .cloned()
                .unwrap_or_default();
        }
        self
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::item)]
pub struct NewItem {
    pub group_id: i64,
    pub external_id: String,
    #[diesel(embed)]
    pub fields: ItemFields,
}
