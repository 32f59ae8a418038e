use diesel::{pg::Pg, prelude::*};

use crate::db::schema;

/// A node of one source's own tree.
///
/// Identity within a source is `external_id`. A parentless group with an empty
/// title is a root wrapper and contributes nothing to name paths.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable)]
#[diesel(table_name = schema::directory_group)]
#[diesel(check_for_backend(Pg))]
pub struct Group {
    pub id: i64,
    pub address_book_id: i64,
    pub source_id: Option<i64>,
    pub parent_id: Option<i64>,
    /// Canonical group this group was merged into.
    pub sync_group_id: Option<i64>,
    pub title: String,
    pub external_id: String,
}

impl Group {
    /// Whether this is an empty-title root wrapper.
    #[must_use]
    pub fn is_root_wrapper(&self) -> bool {
        self.parent_id.is_none() && self.title.is_empty()
    }
}

/// Insert struct for creating groups
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::directory_group)]
pub struct NewGroup {
    pub address_book_id: i64,
    pub source_id: Option<i64>,
    pub parent_id: Option<i64>,
    pub title: String,
    pub external_id: String,
}

/// Title and placement of a group.
#[derive(Debug, Clone, PartialEq, Eq, AsChangeset)]
#[diesel(table_name = schema::directory_group)]
#[diesel(treat_none_as_null = true)]
pub struct GroupChanges {
    pub title: String,
    pub parent_id: Option<i64>,
}
