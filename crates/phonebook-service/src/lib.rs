pub mod book;
pub mod error;
pub mod merge;
pub mod search;
pub mod service;
pub mod soap;
pub mod source;
pub mod sync;
