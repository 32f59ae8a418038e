use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::OwnedMutexGuard;

/// Per-address-book locks serializing sync and merge cycles.
///
/// Different books never contend.
#[derive(Debug, Clone, Default)]
pub struct BookLocks {
    locks: Arc<Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>>,
}

impl BookLocks {
    fn registry(&self) -> MutexGuard<'_, HashMap<i64, Arc<tokio::sync::Mutex<()>>>> {
        match self.locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                self.locks.clear_poison();
                poisoned.into_inner()
            }
        }
    }

    /// Waits for exclusive access to one address book.
    pub async fn lock(&self, address_book_id: i64) -> OwnedMutexGuard<()> {
        let lock = Arc::clone(self.registry().entry(address_book_id).or_default());
        lock.lock_owned().await
    }

    /// Whether a cycle currently holds the book.
    #[must_use]
    pub fn is_locked(&self, address_book_id: i64) -> bool {
        self.registry()
            .get(&address_book_id)
            .is_some_and(|lock| lock.try_lock().is_err())
    }
}
