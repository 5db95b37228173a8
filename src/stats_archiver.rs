// Converts volatile per-project counters (held in an external KV store
// behind the `Storage` seam) into durable, time-bucketed history. Owns
// nothing mutable beyond its own last-archived snapshot and watermarks;
// every persisted row is an idempotent upsert so a missed or duplicated
// tick cannot corrupt history.

use crate::error::Result;
use crate::storage::Storage;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::warn;

const MINUTE: i64 = 60;
const HOUR: i64 = 3_600;
const DAY: i64 = 86_400;
const MINUTE_RETENTION_SECS: i64 = 7 * DAY;
const HOUR_RETENTION_SECS: i64 = 30 * DAY;

/// Raw delta/volatile counters for one project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectCounters {
    pub total: i64,
    pub completed: i64,
    pub failed: i64,
    pub retried: i64,
}

impl ProjectCounters {
    /// `self - other`, each field clamped to >= 0 (a volatile counter may
    /// have reset between ticks).
    fn saturating_sub(&self, other: &Self) -> Self {
        Self {
            total: (self.total - other.total).max(0),
            completed: (self.completed - other.completed).max(0),
            failed: (self.failed - other.failed).max(0),
            retried: (self.retried - other.retried).max(0),
        }
    }
}

/// One durable archived bucket, upserted on `(project_id, period_type,
/// period_start)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsHistoryRow {
    pub project_id: i64,
    pub period_type: &'static str,
    pub period_start: i64,
    pub total: i64,
    pub completed: i64,
    pub failed: i64,
    pub retried: i64,
    pub avg_speed: i64,
}

fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

fn truncate(secs: i64, bucket: i64) -> i64 {
    secs - secs.rem_euclid(bucket)
}

pub struct StatsArchiver {
    stopped: Arc<AtomicBool>,
    task: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl StatsArchiver {
    /// Spawn the ticker loop. `tick_interval` is the spec'd 10s cadence
    /// (kept configurable for tests).
    pub fn start(storage: Arc<dyn Storage>, tick_interval: Duration) -> Self {
        let stopped = Arc::new(AtomicBool::new(false));
        let last_archived: Arc<DashMap<i64, ProjectCounters>> = Arc::new(DashMap::new());
        let last_minute = Arc::new(AtomicI64::new(0));
        let last_hour = Arc::new(AtomicI64::new(0));
        let last_day = Arc::new(AtomicI64::new(0));

        let task_stopped = stopped.clone();
        let mut ticker = interval(tick_interval);
        let handle = tokio::spawn(async move {
            loop {
                ticker.tick().await;
                if task_stopped.load(Ordering::Relaxed) {
                    break;
                }
                if let Err(e) = run_tick(
                    &storage,
                    &last_archived,
                    &last_minute,
                    &last_hour,
                    &last_day,
                    now_secs(),
                )
                .await
                {
                    warn!(error = %e, "stats archiver tick failed");
                }
            }
        });

        Self { stopped, task: parking_lot::Mutex::new(Some(handle)) }
    }

    pub async fn stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "stats archiver task join failed");
            }
        }
    }
}

async fn run_tick(
    storage: &Arc<dyn Storage>,
    last_archived: &Arc<DashMap<i64, ProjectCounters>>,
    last_minute: &Arc<AtomicI64>,
    last_hour: &Arc<AtomicI64>,
    last_day: &Arc<AtomicI64>,
    now: i64,
) -> Result<()> {
    let minute = truncate(now, MINUTE);
    if minute > last_minute.load(Ordering::Relaxed) {
        archive_minute(storage, last_archived, minute).await?;
        last_minute.store(minute, Ordering::Relaxed);
    }

    let hour = truncate(now, HOUR);
    if hour > last_hour.load(Ordering::Relaxed) {
        archive_hour(storage, hour).await?;
        last_hour.store(hour, Ordering::Relaxed);
    }

    let day = truncate(now, DAY);
    if day > last_day.load(Ordering::Relaxed) {
        archive_day(storage, day).await?;
        last_day.store(day, Ordering::Relaxed);
    }

    Ok(())
}

async fn archive_minute(
    storage: &Arc<dyn Storage>,
    last_archived: &Arc<DashMap<i64, ProjectCounters>>,
    minute_start: i64,
) -> Result<()> {
    let project_ids = storage.list_project_ids().await?;
    for project_id in project_ids {
        let current = storage.read_volatile_stats(project_id).await?;
        let previous = last_archived.get(&project_id).map(|e| *e).unwrap_or_default();
        let delta = current.saturating_sub(&previous);

        storage
            .upsert_stats_history(StatsHistoryRow {
                project_id,
                period_type: "minute",
                period_start: minute_start,
                total: delta.total,
                completed: delta.completed,
                failed: delta.failed,
                retried: delta.retried,
                avg_speed: delta.completed,
            })
            .await?;

        last_archived.insert(project_id, current);
    }
    Ok(())
}

async fn archive_hour(storage: &Arc<dyn Storage>, hour_start: i64) -> Result<()> {
    let prior_start = hour_start - HOUR;
    let project_ids = storage.list_project_ids().await?;
    for project_id in project_ids {
        let sum = storage
            .sum_stats_history(project_id, "minute", prior_start, hour_start)
            .await?;
        storage
            .upsert_stats_history(StatsHistoryRow {
                project_id,
                period_type: "hour",
                period_start: prior_start,
                total: sum.total,
                completed: sum.completed,
                failed: sum.failed,
                retried: sum.retried,
                avg_speed: sum.completed,
            })
            .await?;
    }
    storage.prune_stats_history("minute", hour_start, MINUTE_RETENTION_SECS).await?;
    Ok(())
}

async fn archive_day(storage: &Arc<dyn Storage>, day_start: i64) -> Result<()> {
    let prior_start = day_start - DAY;
    let project_ids = storage.list_project_ids().await?;
    for project_id in project_ids {
        let sum = storage.sum_stats_history(project_id, "hour", prior_start, day_start).await?;
        storage
            .upsert_stats_history(StatsHistoryRow {
                project_id,
                period_type: "day",
                period_start: prior_start,
                total: sum.total,
                completed: sum.completed,
                failed: sum.failed,
                retried: sum.retried,
                avg_speed: sum.completed,
            })
            .await?;
    }
    storage.prune_stats_history("hour", day_start, HOUR_RETENTION_SECS).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::config::PoolConfig;
    use crate::storage::InMemoryStorage;

    #[test]
    fn counters_saturating_sub_clamps_on_reset() {
        let current = ProjectCounters { total: 5, completed: 2, failed: 1, retried: 0 };
        let previous = ProjectCounters { total: 100, completed: 90, failed: 10, retried: 0 };
        let delta = current.saturating_sub(&previous);
        assert_eq!(delta, ProjectCounters::default());
    }

    #[test]
    fn truncate_rounds_down_to_bucket() {
        assert_eq!(truncate(125, MINUTE), 120);
        assert_eq!(truncate(3_661, HOUR), 3_600);
    }

    #[tokio::test]
    async fn minute_archive_persists_clamped_delta_row() {
        let storage = InMemoryStorage::new(PoolConfig::default());
        storage
            .volatile
            .lock()
            .insert(42, ProjectCounters { total: 100, completed: 90, failed: 10, retried: 0 });

        let last_archived: Arc<DashMap<i64, ProjectCounters>> = Arc::new(DashMap::new());
        last_archived.insert(42, ProjectCounters { total: 95, completed: 87, failed: 8, retried: 0 });

        let minute_start = 120;
        archive_minute(&(storage.clone() as Arc<dyn Storage>), &last_archived, minute_start)
            .await
            .unwrap();

        let history = storage.history.lock();
        let row = history
            .iter()
            .find(|r| r.project_id == 42 && r.period_type == "minute")
            .unwrap();
        assert_eq!(row.period_start, minute_start);
        assert_eq!(row.total, 5);
        assert_eq!(row.completed, 3);
        assert_eq!(row.failed, 2);
        assert_eq!(row.retried, 0);
        assert_eq!(row.avg_speed, 3);

        let updated = *last_archived.get(&42).unwrap();
        assert_eq!(updated, ProjectCounters { total: 100, completed: 90, failed: 10, retried: 0 });
    }

    #[tokio::test]
    async fn hour_archive_sums_minute_rows_and_prunes() {
        let storage = InMemoryStorage::new(PoolConfig::default());
        storage.history.lock().push(StatsHistoryRow {
            project_id: 1,
            period_type: "minute",
            period_start: 0,
            total: 3,
            completed: 2,
            failed: 1,
            retried: 0,
            avg_speed: 2,
        });
        storage.history.lock().push(StatsHistoryRow {
            project_id: 1,
            period_type: "minute",
            period_start: 60,
            total: 4,
            completed: 3,
            failed: 1,
            retried: 0,
            avg_speed: 3,
        });
        storage.volatile.lock().insert(1, ProjectCounters::default());

        archive_hour(&(storage.clone() as Arc<dyn Storage>), HOUR).await.unwrap();

        let history = storage.history.lock();
        let row = history.iter().find(|r| r.period_type == "hour").unwrap();
        assert_eq!(row.total, 7);
        assert_eq!(row.completed, 5);
    }
}
