//! Phonebook server - integration test support.
//!
//! This crate re-exports the workspace crates so integration tests can reach
//! every layer through one dependency.

#![allow(ambiguous_glob_reexports)]

pub mod component {
    pub use phonebook_core::*;
    pub use phonebook_service::*;

    pub mod db {
        pub use phonebook_db::db::*;
    }

    pub mod model {
        pub use phonebook_db::model::*;
    }

    pub mod store {
        pub use phonebook_db::store::*;
    }

    // Config from both core and app
    pub mod config {
        pub use phonebook_app::config::ConfigHandler;
        pub use phonebook_core::config::*;
    }
}

pub mod app {
    pub use phonebook_app::*;

    pub mod api {
        pub use phonebook_app::app::api::*;
    }
}

pub use phonebook_soap as soap;
