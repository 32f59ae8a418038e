//! `PhoneBookSearch` XML serialization.

mod escape;
pub mod search;

pub use search::{serialize_search_request, serialize_search_result};
