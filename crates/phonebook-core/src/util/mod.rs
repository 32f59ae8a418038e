pub mod path;
pub mod secret;
