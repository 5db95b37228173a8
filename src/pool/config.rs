// Single configuration record for the whole rendering-resource subsystem,
// loaded at startup and reloadable at runtime via `PoolManager::reload`.

use crate::error::SeoError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    pub titles_size: usize,
    pub contents_size: usize,
    /// Absolute item count below which the Refiller fires for a group.
    pub threshold: usize,
    pub refill_interval_ms: u64,

    pub keywords_size: usize,
    pub images_size: usize,
    pub refresh_interval_ms: u64,

    pub title_pool_size: usize,
    pub title_workers: usize,
    pub title_refill_interval_ms: u64,
    pub title_threshold: f64,

    pub cls_pool_size: usize,
    pub cls_workers: usize,
    pub cls_refill_interval_ms: u64,
    pub cls_threshold: f64,

    pub url_pool_size: usize,
    pub url_workers: usize,
    pub url_refill_interval_ms: u64,
    pub url_threshold: f64,

    pub keyword_emoji_pool_size: usize,
    pub keyword_emoji_workers: usize,
    pub keyword_emoji_refill_interval_ms: u64,
    pub keyword_emoji_threshold: f64,

    /// `UpdateBatcher` flush trigger: pending count.
    pub update_max_batch: usize,
    /// `UpdateBatcher` flush trigger: elapsed time.
    pub update_flush_interval_ms: u64,
    pub update_channel_capacity: usize,
}

/// Default worker fleet size for a single object-pool family: scales with
/// the machine's core count, like the teacher's connection-pool sizing, but
/// capped: these are cheap generator tasks, not connections, so a 32-core
/// box doesn't need 32 of them per pool.
fn default_worker_count() -> usize {
    num_cpus::get().clamp(2, 4)
}

impl Default for PoolConfig {
    fn default() -> Self {
        let workers = default_worker_count();
        Self {
            titles_size: 0, // titles are generated, not loaded; informational only
            contents_size: 500,
            threshold: 100,
            refill_interval_ms: 1_000,

            keywords_size: 0, // informational; reusable pools load-all
            images_size: 0,
            refresh_interval_ms: 60_000,

            title_pool_size: 64,
            title_workers: workers,
            title_refill_interval_ms: 1_000,
            title_threshold: 0.4,

            cls_pool_size: 256,
            cls_workers: workers,
            cls_refill_interval_ms: 1_000,
            cls_threshold: 0.4,

            url_pool_size: 256,
            url_workers: workers,
            url_refill_interval_ms: 1_000,
            url_threshold: 0.4,

            keyword_emoji_pool_size: 256,
            keyword_emoji_workers: workers,
            keyword_emoji_refill_interval_ms: 1_000,
            keyword_emoji_threshold: 0.4,

            update_max_batch: 100,
            update_flush_interval_ms: 5_000,
            update_channel_capacity: 10_000,
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> Result<(), SeoError> {
        for (name, value) in [
            ("title_threshold", self.title_threshold),
            ("cls_threshold", self.cls_threshold),
            ("url_threshold", self.url_threshold),
            ("keyword_emoji_threshold", self.keyword_emoji_threshold),
        ] {
            if !(0.0..1.0).contains(&value) {
                return Err(SeoError::ConfigInvalid(format!(
                    "{name} must be in (0,1), got {value}"
                )));
            }
        }
        if self.contents_size == 0 {
            return Err(SeoError::ConfigInvalid("contents_size must be > 0".into()));
        }
        if self.update_max_batch == 0 {
            return Err(SeoError::ConfigInvalid("update_max_batch must be > 0".into()));
        }
        Ok(())
    }

    pub fn refill_interval(&self) -> Duration {
        Duration::from_millis(self.refill_interval_ms)
    }

    pub fn title_refill_interval(&self) -> Duration {
        Duration::from_millis(self.title_refill_interval_ms)
    }

    pub fn cls_refill_interval(&self) -> Duration {
        Duration::from_millis(self.cls_refill_interval_ms)
    }

    pub fn url_refill_interval(&self) -> Duration {
        Duration::from_millis(self.url_refill_interval_ms)
    }

    pub fn keyword_emoji_refill_interval(&self) -> Duration {
        Duration::from_millis(self.keyword_emoji_refill_interval_ms)
    }

    pub fn update_flush_interval(&self) -> Duration {
        Duration::from_millis(self.update_flush_interval_ms)
    }

    pub fn builder() -> PoolConfigBuilder {
        PoolConfigBuilder::default()
    }
}

#[derive(Default)]
pub struct PoolConfigBuilder {
    config: PoolConfig,
}

impl PoolConfigBuilder {
    pub fn contents_size(mut self, size: usize) -> Self {
        self.config.contents_size = size;
        self
    }

    pub fn threshold(mut self, threshold: usize) -> Self {
        self.config.threshold = threshold;
        self
    }

    pub fn refill_interval_ms(mut self, ms: u64) -> Self {
        self.config.refill_interval_ms = ms;
        self
    }

    pub fn title_pool_size(mut self, size: usize) -> Self {
        self.config.title_pool_size = size;
        self
    }

    pub fn title_workers(mut self, workers: usize) -> Self {
        self.config.title_workers = workers;
        self
    }

    pub fn build(self) -> Result<PoolConfig, SeoError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(PoolConfig::default().validate().is_ok());
    }

    #[test]
    fn threshold_out_of_range_is_rejected() {
        let mut config = PoolConfig::default();
        config.cls_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn builder_produces_valid_config() {
        let config = PoolConfig::builder()
            .contents_size(10)
            .threshold(2)
            .title_pool_size(4)
            .title_workers(1)
            .build()
            .unwrap();
        assert_eq!(config.contents_size, 10);
    }
}
