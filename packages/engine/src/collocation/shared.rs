use std::sync::Arc;

use parking_lot::RwLock;

use super::index::CollocationIndex;

/// Process-wide handle to the current collocation index.
///
/// Readers hold an `Arc` snapshot; `publish` swaps in a rebuilt index
/// without disturbing snapshots already handed out.
#[derive(Debug, Default)]
pub struct SharedCollocationIndex {
    current: RwLock<Arc<CollocationIndex>>,
}

impl SharedCollocationIndex {
    pub fn new(index: CollocationIndex) -> Self {
        Self {
            current: RwLock::new(Arc::new(index)),
        }
    }

    pub fn snapshot(&self) -> Arc<CollocationIndex> {
        Arc::clone(&self.current.read())
    }

    /// Replace the index and return the previous one.
    pub fn publish(&self, index: CollocationIndex) -> Arc<CollocationIndex> {
        let next = Arc::new(index);
        tracing::info!(
            tokens = next.total_tokens(),
            types = next.vocabulary_size(),
            "Publishing collocation index"
        );
        std::mem::replace(&mut *self.current.write(), next)
    }
}
