use super::{FetchError, FetchFuture, SourceAdapter};

/// The retired third-party directory service. Every fetch fails.
pub struct SeeviaAdapter;

impl SourceAdapter for SeeviaAdapter {
    fn nested_items(&self) -> bool {
        true
    }

    fn fetch(&self) -> FetchFuture<'_> {
        Box::pin(async {
            Err(FetchError::Connection(
                "Seevia service is no longer online".into(),
            ))
        })
    }
}
