use diesel::{pg::Pg, prelude::*};

use crate::db::schema;

/// A node of the canonical tree merged across every source of an address book.
///
/// Identity is `(address_book_id, full_path)`. The root has an empty title and path.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable)]
#[diesel(table_name = schema::sync_group)]
#[diesel(check_for_backend(Pg))]
pub struct SyncGroup {
    pub id: i64,
    pub address_book_id: i64,
    pub parent_id: Option<i64>,
    pub title: String,
    pub full_path: String,
}

impl SyncGroup {
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none() && self.title.is_empty()
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::sync_group)]
pub struct NewSyncGroup {
    pub address_book_id: i64,
    pub parent_id: Option<i64>,
    pub title: String,
    pub full_path: String,
}
