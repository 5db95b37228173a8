// Object pool: a ring buffer of synthetically generated strings (random CSS
// class names, URLs, keyword+emoji fragments) kept near capacity by a small
// fleet of worker tasks. `Get` never blocks: an empty pool yields `None`
// immediately and refill proceeds independently in the background.

use chrono::Utc;
use crossbeam::queue::ArrayQueue;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, warn};

pub type Generator<T> = Arc<dyn Fn() -> T + Send + Sync>;

struct Counters {
    refill_count: AtomicU64,
    total_generated: AtomicU64,
    total_consumed: AtomicU64,
    last_refresh_ns: AtomicU64,
}

impl Counters {
    fn new() -> Self {
        Self {
            refill_count: AtomicU64::new(0),
            total_generated: AtomicU64::new(0),
            total_consumed: AtomicU64::new(0),
            last_refresh_ns: AtomicU64::new(0),
        }
    }
}

/// Snapshot of an [`ObjectPool`]'s counters, for dashboarding.
#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
pub struct ObjectPoolStats {
    pub size: usize,
    pub available: usize,
    pub refill_count: u64,
    pub total_generated: u64,
    pub total_consumed: u64,
    pub paused: bool,
}

/// A fixed-capacity pool of generated `T`s, refilled by background workers
/// whenever its fill ratio drops below `threshold`.
pub struct ObjectPool<T: Send + Sync + 'static> {
    size: usize,
    threshold: f64,
    num_workers: usize,
    check_interval: Duration,
    queue: Arc<ArrayQueue<T>>,
    generator: Generator<T>,
    paused: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
    counters: Arc<Counters>,
    check_task: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl<T: Send + Sync + 'static> ObjectPool<T> {
    pub fn new(
        size: usize,
        threshold: f64,
        num_workers: usize,
        check_interval: Duration,
        generator: Generator<T>,
    ) -> crate::error::Result<Self> {
        if !(0.0..1.0).contains(&threshold) {
            return Err(crate::error::SeoError::ConfigInvalid(format!(
                "object pool threshold must be in (0,1), got {threshold}"
            )));
        }
        Ok(Self {
            size,
            threshold,
            num_workers: num_workers.max(1),
            check_interval,
            queue: Arc::new(ArrayQueue::new(size.max(1))),
            generator,
            paused: Arc::new(AtomicBool::new(false)),
            stopped: Arc::new(AtomicBool::new(false)),
            counters: Arc::new(Counters::new()),
            check_task: parking_lot::Mutex::new(None),
        })
    }

    /// Prefill to capacity and spawn the background check loop.
    pub fn start(&self) {
        Self::refill_if_needed(
            &self.queue,
            &self.generator,
            self.size,
            self.threshold,
            self.num_workers,
            &self.counters,
        );

        let queue = self.queue.clone();
        let generator = self.generator.clone();
        let size = self.size;
        let threshold = self.threshold;
        let num_workers = self.num_workers;
        let counters = self.counters.clone();
        let paused = self.paused.clone();
        let stopped = self.stopped.clone();
        let mut ticker = interval(self.check_interval);

        let handle = tokio::spawn(async move {
            loop {
                ticker.tick().await;
                if stopped.load(Ordering::Relaxed) {
                    break;
                }
                if paused.load(Ordering::Relaxed) {
                    continue;
                }
                Self::refill_if_needed(&queue, &generator, size, threshold, num_workers, &counters);
            }
        });
        *self.check_task.lock() = Some(handle);
    }

    fn refill_if_needed(
        queue: &Arc<ArrayQueue<T>>,
        generator: &Generator<T>,
        size: usize,
        threshold: f64,
        num_workers: usize,
        counters: &Arc<Counters>,
    ) {
        let available = queue.len();
        if (available as f64) >= (size as f64) * threshold {
            return;
        }
        let need = size.saturating_sub(available);
        if need == 0 {
            return;
        }
        let per_worker = (need + num_workers - 1) / num_workers;
        let mut generated = 0usize;
        for _ in 0..num_workers {
            let remaining = need - generated;
            if remaining == 0 {
                break;
            }
            let share = per_worker.min(remaining);
            for _ in 0..share {
                let item = generator();
                if queue.push(item).is_err() {
                    // Pool filled by a concurrent producer; stop this share.
                    break;
                }
                generated += 1;
            }
        }
        counters.refill_count.fetch_add(1, Ordering::Relaxed);
        counters.total_generated.fetch_add(generated as u64, Ordering::Relaxed);
        let now_ns = Utc::now().timestamp_nanos_opt().unwrap_or(0).max(0) as u64;
        counters.last_refresh_ns.store(now_ns, Ordering::Relaxed);
        debug!(generated, need, "object pool refilled");
    }

    /// Non-blocking take. Returns `None` on an empty or paused pool;
    /// callers treat this as "no data" and degrade gracefully.
    pub fn get(&self) -> Option<T> {
        if self.stopped.load(Ordering::Relaxed) {
            return None;
        }
        let item = self.queue.pop();
        if item.is_some() {
            self.counters.total_consumed.fetch_add(1, Ordering::Relaxed);
        }
        item
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::Relaxed);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::Relaxed);
    }

    pub fn stats(&self) -> ObjectPoolStats {
        ObjectPoolStats {
            size: self.size,
            available: self.queue.len(),
            refill_count: self.counters.refill_count.load(Ordering::Relaxed),
            total_generated: self.counters.total_generated.load(Ordering::Relaxed),
            total_consumed: self.counters.total_consumed.load(Ordering::Relaxed),
            paused: self.paused.load(Ordering::Relaxed),
        }
    }

    pub async fn stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
        let handle = self.check_task.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "object pool check task join failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn get_on_empty_pool_returns_none_without_blocking() {
        let pool: ObjectPool<String> =
            ObjectPool::new(4, 0.4, 1, Duration::from_millis(10), Arc::new(|| "x".to_string()))
                .unwrap();
        assert!(pool.get().is_none());
    }

    #[test]
    fn refill_generates_exactly_the_deficit() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter2 = counter.clone();
        let generator: Generator<usize> = Arc::new(move || counter2.fetch_add(1, Ordering::Relaxed));
        let queue = Arc::new(ArrayQueue::new(10));
        let counters = Arc::new(Counters::new());
        // Simulate 3 items already available out of size 10; threshold 0.4
        // means refill triggers (3 < 4) and should generate exactly 7.
        for i in 0..3 {
            queue.push(i).unwrap();
        }
        ObjectPool::<usize>::refill_if_needed(&queue, &generator, 10, 0.4, 2, &counters);
        assert_eq!(queue.len(), 10);
        assert_eq!(counters.total_generated.load(Ordering::Relaxed), 7);
    }

    #[test]
    fn invalid_threshold_is_rejected() {
        let result: crate::error::Result<ObjectPool<u8>> =
            ObjectPool::new(10, 1.5, 1, Duration::from_millis(10), Arc::new(|| 0));
        assert!(result.is_err());
    }
}
