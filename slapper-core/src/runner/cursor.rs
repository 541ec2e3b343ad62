use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Round-robin position shared by all workers.
///
/// Each call to [`SharedCursor::next_index`] claims a distinct position, so selection `n`
/// always maps to index `n % len`.
#[derive(Debug)]
pub struct SharedCursor {
    next: AtomicU64,
    len: u64,
}

impl SharedCursor {
    pub fn new(len: NonZeroUsize) -> Self {
        Self {
            next: AtomicU64::new(0),
            len: len.get() as u64,
        }
    }

    pub fn next_index(&self) -> usize {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        (n % self.len) as usize
    }

    /// Selections handed out so far.
    pub fn claimed(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}
