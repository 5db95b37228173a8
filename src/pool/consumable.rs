// Consumable pool: a bounded FIFO of large text items (titles, article
// bodies) popped exactly once per process lifetime, with duplicate-id
// rejection across the pool's entire history since the last `clear`.

use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

/// A single consumable item as loaded from storage.
#[derive(Debug, Clone)]
pub struct ConsumableItem {
    pub id: i64,
    pub text: String,
}

struct Inner {
    items: VecDeque<ConsumableItem>,
    /// Every id ever accepted since the last `clear`, including ones
    /// already popped. Prevents the Refiller from re-loading an id the
    /// process already served.
    loaded_ids: HashSet<i64>,
    memory_bytes: usize,
}

pub struct ConsumablePool {
    max_size: usize,
    /// Absolute item count below which the Refiller attempts to top this
    /// pool back up. Defaults to `max_size` (refill whenever not full).
    refill_threshold: usize,
    inner: Mutex<Inner>,
    consumed_count: AtomicU64,
}

impl ConsumablePool {
    pub fn new(max_size: usize) -> Self {
        Self::with_refill_threshold(max_size, max_size)
    }

    pub fn with_refill_threshold(max_size: usize, refill_threshold: usize) -> Self {
        Self {
            max_size,
            refill_threshold,
            inner: Mutex::new(Inner {
                items: VecDeque::new(),
                loaded_ids: HashSet::new(),
                memory_bytes: 0,
            }),
            consumed_count: AtomicU64::new(0),
        }
    }

    pub fn refill_threshold(&self) -> usize {
        self.refill_threshold
    }

    /// Accept as many `items` as fit, skipping any id already seen this
    /// process lifetime and any item beyond remaining capacity. Returns the
    /// number of items actually accepted.
    pub fn push(&self, items: Vec<ConsumableItem>) -> usize {
        let mut inner = self.inner.lock();
        let mut accepted = 0;
        for item in items {
            if inner.loaded_ids.contains(&item.id) {
                continue;
            }
            if inner.items.len() >= self.max_size {
                break;
            }
            inner.memory_bytes += item.text.len();
            inner.loaded_ids.insert(item.id);
            inner.items.push_back(item);
            accepted += 1;
        }
        accepted
    }

    /// Pop the FIFO head. The id remains in `loaded_ids` even after this
    /// call; it is not eligible to be reloaded within this process.
    pub fn pop(&self) -> Option<ConsumableItem> {
        let mut inner = self.inner.lock();
        let item = inner.items.pop_front()?;
        inner.memory_bytes = inner.memory_bytes.saturating_sub(item.text.len());
        self.consumed_count.fetch_add(1, Ordering::Relaxed);
        Some(item)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn memory_bytes(&self) -> usize {
        self.inner.lock().memory_bytes
    }

    pub fn consumed_count(&self) -> u64 {
        self.consumed_count.load(Ordering::Relaxed)
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Resets items, loaded-id set and memory counter. Does not reset
    /// `consumed_count`, which is a lifetime counter for dashboarding.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.items.clear();
        inner.loaded_ids.clear();
        inner.memory_bytes = 0;
    }
}
