pub mod error;
pub mod soap;
