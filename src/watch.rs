use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

/// `upsert_watch_progress` is a read-then-write (fetch existing row, then
/// insert or update) rather than a single atomic statement, so two requests
/// racing for the same (user, media_item) pair could both see no existing
/// row and attempt duplicate inserts. A lock per pair serializes those
/// requests without serializing unrelated users/media.
#[derive(Default)]
pub struct WatchLocks {
    locks: Mutex<HashMap<(i64, i64), Arc<Mutex<()>>>>,
}

impl WatchLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock_for(&self, user_id: i64, media_item_id: i64) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry((user_id, media_item_id))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
