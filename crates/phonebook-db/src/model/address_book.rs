use diesel::{pg::Pg, prelude::*};

use crate::db::{enums::AddressBookKind, schema};

/// A phonebook served to endpoints under its secret key.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable)]
#[diesel(table_name = schema::address_book)]
#[diesel(check_for_backend(Pg))]
pub struct AddressBook {
    pub id: i64,
    pub title: String,
    pub secret_key: String,
    pub kind: AddressBookKind,
    pub external_url: String,
    pub external_edit_url: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl AddressBook {
    #[must_use]
    pub fn is_external(&self) -> bool {
        self.kind == AddressBookKind::External
    }
}

/// Insert struct for creating address books
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::address_book)]
pub struct NewAddressBook {
    pub title: String,
    pub secret_key: String,
    pub kind: AddressBookKind,
    pub external_url: String,
    pub external_edit_url: String,
}
