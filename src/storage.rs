// Backing-storage seam. The rendering-resource subsystem never opens a raw
// connection itself (spec'd as an external collaborator); it talks to
// whatever concrete store the embedding application wires in through this
// trait. An in-memory double is provided for tests.

use crate::pool::config::PoolConfig;
use crate::pool::consumable::ConsumableItem;
use crate::pool::items::{Image, Keyword};
use crate::stats_archiver::ProjectCounters;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;

/// Tables the Refiller is allowed to query, guarding against building a
/// table name from untrusted input.
pub const REFILLABLE_TABLES: &[&str] = &["contents"];

#[async_trait]
pub trait Storage: Send + Sync {
    /// `SELECT id, <text_column> FROM <table> WHERE group_id = ? AND status
    /// = 1 ORDER BY batch_id DESC, id ASC LIMIT ?`
    async fn fetch_available(
        &self,
        table: &str,
        group_id: i64,
        limit: usize,
    ) -> Result<Vec<ConsumableItem>>;

    /// `UPDATE <table> SET status = 0 WHERE id IN (...)`, one statement per
    /// table, ids set-unioned within a table.
    async fn mark_consumed(&self, table: &str, ids: &[i64]) -> Result<()>;

    async fn distinct_group_ids(&self, table: &str) -> Result<Vec<i64>>;

    /// Every project id with a live volatile stats key, for StatsArchiver's
    /// per-tick scan.
    async fn list_project_ids(&self) -> Result<Vec<i64>>;

    async fn load_all_keywords(&self, group_id: i64) -> Result<Vec<Keyword>>;
    async fn load_all_images(&self, group_id: i64) -> Result<Vec<Image>>;

    async fn load_pool_config(&self) -> Result<PoolConfig>;

    /// Read current volatile counters for a project from the KV stats
    /// store, e.g. `spider:<project_id>:stats`.
    async fn read_volatile_stats(&self, project_id: i64) -> Result<ProjectCounters>;

    /// Upsert a history row keyed by `(project_id, period_type,
    /// period_start)`.
    async fn upsert_stats_history(&self, row: crate::stats_archiver::StatsHistoryRow) -> Result<()>;

    /// Delete history rows of `period_type` older than `older_than_secs`
    /// before `now_secs`.
    async fn prune_stats_history(
        &self,
        period_type: &str,
        now_secs: i64,
        older_than_secs: i64,
    ) -> Result<()>;

    /// Sum minute/hour rows in `[start_secs, end_secs)` for aggregation into
    /// the next bucket up.
    async fn sum_stats_history(
        &self,
        project_id: i64,
        period_type: &str,
        start_secs: i64,
        end_secs: i64,
    ) -> Result<ProjectCounters>;
}

/// Simple in-memory double used by tests and by the example binary. Not
/// part of the public contract the spec defines.
pub struct InMemoryStorage {
    pub contents: parking_lot::Mutex<HashMap<i64, Vec<ConsumableItem>>>,
    pub keywords: parking_lot::Mutex<HashMap<i64, Vec<Keyword>>>,
    pub images: parking_lot::Mutex<HashMap<i64, Vec<Image>>>,
    pub config: parking_lot::Mutex<PoolConfig>,
    pub volatile: parking_lot::Mutex<HashMap<i64, ProjectCounters>>,
    pub history: parking_lot::Mutex<Vec<crate::stats_archiver::StatsHistoryRow>>,
    pub marked: parking_lot::Mutex<HashMap<String, std::collections::HashSet<i64>>>,
}

impl InMemoryStorage {
    pub fn new(config: PoolConfig) -> Arc<Self> {
        Arc::new(Self {
            contents: parking_lot::Mutex::new(HashMap::new()),
            keywords: parking_lot::Mutex::new(HashMap::new()),
            images: parking_lot::Mutex::new(HashMap::new()),
            config: parking_lot::Mutex::new(config),
            volatile: parking_lot::Mutex::new(HashMap::new()),
            history: parking_lot::Mutex::new(Vec::new()),
            marked: parking_lot::Mutex::new(HashMap::new()),
        })
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn fetch_available(
        &self,
        table: &str,
        group_id: i64,
        limit: usize,
    ) -> Result<Vec<ConsumableItem>> {
        if table != "contents" {
            return Ok(Vec::new());
        }
        let marked = self.marked.lock();
        let already = marked.get(table);
        let rows = self.contents.lock();
        let items = rows
            .get(&group_id)
            .map(|v| {
                v.iter()
                    .filter(|item| already.map(|a| !a.contains(&item.id)).unwrap_or(true))
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(items)
    }

    async fn mark_consumed(&self, table: &str, ids: &[i64]) -> Result<()> {
        let mut marked = self.marked.lock();
        let set = marked.entry(table.to_string()).or_default();
        for id in ids {
            set.insert(*id);
        }
        Ok(())
    }

    async fn distinct_group_ids(&self, table: &str) -> Result<Vec<i64>> {
        let groups: Vec<i64> = match table {
            "contents" => self.contents.lock().keys().copied().collect(),
            "keywords" => self.keywords.lock().keys().copied().collect(),
            "images" => self.images.lock().keys().copied().collect(),
            _ => Vec::new(),
        };
        Ok(groups)
    }

    async fn load_all_keywords(&self, group_id: i64) -> Result<Vec<Keyword>> {
        Ok(self.keywords.lock().get(&group_id).cloned().unwrap_or_default())
    }

    async fn load_all_images(&self, group_id: i64) -> Result<Vec<Image>> {
        Ok(self.images.lock().get(&group_id).cloned().unwrap_or_default())
    }

    async fn load_pool_config(&self) -> Result<PoolConfig> {
        Ok(self.config.lock().clone())
    }

    async fn list_project_ids(&self) -> Result<Vec<i64>> {
        Ok(self.volatile.lock().keys().copied().collect())
    }

    async fn read_volatile_stats(&self, project_id: i64) -> Result<ProjectCounters> {
        Ok(self.volatile.lock().get(&project_id).cloned().unwrap_or_default())
    }

    async fn upsert_stats_history(&self, row: crate::stats_archiver::StatsHistoryRow) -> Result<()> {
        let mut history = self.history.lock();
        if let Some(existing) = history.iter_mut().find(|r| {
            r.project_id == row.project_id
                && r.period_type == row.period_type
                && r.period_start == row.period_start
        }) {
            *existing = row;
        } else {
            history.push(row);
        }
        Ok(())
    }

    async fn prune_stats_history(
        &self,
        period_type: &str,
        now_secs: i64,
        older_than_secs: i64,
    ) -> Result<()> {
        let mut history = self.history.lock();
        history.retain(|r| {
            r.period_type != period_type || r.period_start >= now_secs - older_than_secs
        });
        Ok(())
    }

    async fn sum_stats_history(
        &self,
        project_id: i64,
        period_type: &str,
        start_secs: i64,
        end_secs: i64,
    ) -> Result<ProjectCounters> {
        let history = self.history.lock();
        let mut sum = ProjectCounters::default();
        for row in history.iter() {
            if row.project_id == project_id
                && row.period_type == period_type
                && row.period_start >= start_secs
                && row.period_start < end_secs
            {
                sum.total += row.total;
                sum.completed += row.completed;
                sum.failed += row.failed;
                sum.retried += row.retried;
            }
        }
        Ok(sum)
    }
}
