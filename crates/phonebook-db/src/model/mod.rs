pub mod address_book;
pub mod group;
pub mod item;
pub mod source;
pub mod sync_group;

pub use address_book::{AddressBook, NewAddressBook};
pub use group::{Group, GroupChanges, NewGroup};
pub use item::{Item, ItemFields, NewItem};
pub use source::{NewSource, Source, SourceConfig};
pub use sync_group::{NewSyncGroup, SyncGroup};
