// Update batcher: coalesces many "mark id consumed" events into a handful
// of bulk UPDATE statements, one per table per flush.

use crate::storage::Storage;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, Instant};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct MarkConsumedTask {
    pub table: &'static str,
    pub id: i64,
}

pub struct UpdateBatcher {
    sender: mpsc::Sender<MarkConsumedTask>,
    shutdown: Arc<Notify>,
    worker: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl UpdateBatcher {
    pub fn start(
        storage: Arc<dyn Storage>,
        channel_capacity: usize,
        max_batch: usize,
        flush_interval: Duration,
    ) -> Self {
        let (sender, mut receiver) = mpsc::channel(channel_capacity.max(1));
        let shutdown = Arc::new(Notify::new());
        let shutdown_worker = shutdown.clone();

        let worker = tokio::spawn(async move {
            let mut pending: HashMap<&'static str, Vec<i64>> = HashMap::new();
            let mut pending_count = 0usize;
            let mut ticker = interval(flush_interval);
            let mut last_flush = Instant::now();

            loop {
                tokio::select! {
                    _ = shutdown_worker.notified() => {
                        flush(&storage, &mut pending, &mut pending_count).await;
                        break;
                    }
                    _ = ticker.tick() => {
                        if pending_count > 0 && last_flush.elapsed() >= flush_interval {
                            flush(&storage, &mut pending, &mut pending_count).await;
                            last_flush = Instant::now();
                        }
                    }
                    maybe_task = receiver.recv() => {
                        match maybe_task {
                            Some(task) => {
                                pending.entry(task.table).or_default().push(task.id);
                                pending_count += 1;
                                if pending_count >= max_batch {
                                    flush(&storage, &mut pending, &mut pending_count).await;
                                    last_flush = Instant::now();
                                }
                            }
                            None => {
                                // Channel closed (all senders dropped): final flush then exit.
                                flush(&storage, &mut pending, &mut pending_count).await;
                                break;
                            }
                        }
                    }
                }
            }
        });

        Self { sender, shutdown, worker: parking_lot::Mutex::new(Some(worker)) }
    }

    /// Non-blocking enqueue. On a full channel the task is logged and
    /// dropped; the item remains served in-memory but its storage status
    /// lags until the next successful mark (acceptable per the
    /// at-most-once-within-process contract).
    pub fn add(&self, task: MarkConsumedTask) {
        if self.sender.try_send(task.clone()).is_err() {
            warn!(table = task.table, id = task.id, "update batcher channel full, task dropped");
        }
    }

    /// Wakes the worker immediately for one final flush, then joins it.
    /// Driven by a `Notify` rather than channel closure, since `self.sender`
    /// keeps a sender alive for the lifetime of `self`.
    pub async fn stop(&self) {
        self.shutdown.notify_one();
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.await;
        }
    }
}

async fn flush(
    storage: &Arc<dyn Storage>,
    pending: &mut HashMap<&'static str, Vec<i64>>,
    pending_count: &mut usize,
) {
    if pending.is_empty() {
        return;
    }
    for (table, ids) in pending.drain() {
        if let Err(e) = storage.mark_consumed(table, &ids).await {
            warn!(table, error = %e, "bulk mark-consumed failed, batch discarded");
            continue;
        }
        debug!(table, count = ids.len(), "flushed mark-consumed batch");
    }
    *pending_count = 0;
}
