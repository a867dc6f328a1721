use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Serializes read-then-write cycles per auction id; different ids never
/// wait on each other.
#[derive(Default)]
pub struct AuctionLocks {
    locks: Mutex<HashMap<u64, Arc<AsyncMutex<()>>>>,
}

impl AuctionLocks {
    pub async fn lock(&self, id: u64) -> OwnedMutexGuard<()> {
        let lock = self.locks.lock().entry(id).or_default().clone();
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_id_waits_other_ids_do_not() {
        let locks = Arc::new(AuctionLocks::default());
        let held = locks.lock(1).await;

        let other = tokio::time::timeout(Duration::from_millis(50), locks.lock(2)).await;
        assert!(other.is_ok(), "a different id must not block");

        let same = tokio::time::timeout(Duration::from_millis(50), locks.lock(1)).await;
        assert!(same.is_err(), "the same id must wait for the holder");

        drop(held);
        let same = tokio::time::timeout(Duration::from_millis(50), locks.lock(1)).await;
        assert!(same.is_ok());
    }
}
