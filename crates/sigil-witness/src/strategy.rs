//! Cache-mode batching buffer.
//!
//! Holds the entry hashes of records awaiting a batched anchor. The
//! buffer is drained only after a flush attempt completes, so a crash
//! mid-flush leaves every unanchored record still buffered (and, in any
//! case, still pending in the store).

use parking_lot::Mutex;
use sigil_core::ContentDigest;

#[derive(Debug, Default)]
pub struct CacheBuffer {
    entries: Mutex<Vec<ContentDigest>>,
}

impl CacheBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer a record. Returns the buffered count after insertion.
    pub fn push(&self, hash: ContentDigest) -> usize {
        let mut entries = self.entries.lock();
        entries.push(hash);
        entries.len()
    }

    /// Snapshot the buffered hashes without draining them.
    pub fn snapshot(&self) -> Vec<ContentDigest> {
        self.entries.lock().clone()
    }

    /// Remove processed hashes after a flush attempt completes.
    pub fn remove(&self, processed: &[ContentDigest]) {
        let mut entries = self.entries.lock();
        entries.retain(|hash| !processed.contains(hash));
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
