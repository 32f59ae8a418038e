//! Address book secrets used in the SOAP endpoint URL.

/// Generates a new 32 character lowercase hex secret.
#[must_use]
pub fn new_secret_key() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
