// PoolManager: the facade owning every pool instance. Callers (PageHandler,
// the admin mutation hooks) only ever talk to this type; it is the single
// process-wide owner of pool state, constructed explicitly at startup and
// injected into its collaborators rather than reached for as a global.

use crate::error::{Result, SeoError};
use crate::pool::config::PoolConfig;
use crate::pool::consumable::{ConsumableItem, ConsumablePool};
use crate::pool::items::{Image, Keyword};
use crate::pool::object_pool::{Generator, ObjectPool};
use crate::pool::refiller::Refiller;
use crate::pool::reusable::ReusablePool;
use crate::pool::stats::{ConsumableGroupStatus, PoolKind, PoolStatus};
use crate::pool::title_generator::TitleGenerator;
use crate::pool::update_batcher::{MarkConsumedTask, UpdateBatcher};
use crate::emoji::EmojiStore;
use crate::storage::Storage;
use dashmap::DashMap;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tracing::{info, warn};

fn random_cls(rng: &parking_lot::Mutex<SmallRng>) -> String {
    const CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rng.lock();
    (0..8).map(|_| CHARS[rng.random_range(0..CHARS.len())] as char).collect()
}

fn random_url(rng: &parking_lot::Mutex<SmallRng>) -> String {
    let mut rng = rng.lock();
    let slug: String = (0..10)
        .map(|_| (b'a' + rng.random_range(0..26u8)) as char)
        .collect();
    format!("/articles/{slug}")
}

pub struct PoolManager {
    config: parking_lot::RwLock<PoolConfig>,
    storage: Arc<dyn Storage>,

    keywords: Arc<ReusablePool<Keyword>>,
    images: Arc<ReusablePool<Image>>,
    contents: Arc<DashMap<i64, Arc<ConsumablePool>>>,

    title_generator: Arc<TitleGenerator>,
    emojis: Arc<EmojiStore>,

    cls_pool: Arc<ObjectPool<String>>,
    url_pool: Arc<ObjectPool<String>>,
    keyword_emoji_pool: Arc<ObjectPool<String>>,

    update_batcher: Arc<UpdateBatcher>,
    refiller: parking_lot::Mutex<Option<Refiller>>,
}

impl PoolManager {
    /// Construct every pool from `config` and `emojis`. Does not discover
    /// groups or start background workers; call `start` for that.
    pub fn new(config: PoolConfig, storage: Arc<dyn Storage>, emojis: Arc<EmojiStore>) -> Result<Self> {
        config.validate()?;

        let keywords = Arc::new(ReusablePool::new());
        let images = Arc::new(ReusablePool::new());
        let contents = Arc::new(DashMap::new());

        let title_generator = Arc::new(TitleGenerator::new(
            keywords.clone(),
            emojis.clone(),
            config.title_pool_size,
            config.title_workers,
            config.title_refill_interval(),
            config.title_threshold,
        ));

        let cls_rng = Arc::new(parking_lot::Mutex::new(SmallRng::from_os_rng()));
        let cls_gen: Generator<String> = {
            let rng = cls_rng.clone();
            Arc::new(move || random_cls(&rng))
        };
        let cls_pool = Arc::new(ObjectPool::new(
            config.cls_pool_size,
            config.cls_threshold,
            config.cls_workers,
            config.cls_refill_interval(),
            cls_gen,
        )?);

        let url_rng = Arc::new(parking_lot::Mutex::new(SmallRng::from_os_rng()));
        let url_gen: Generator<String> = {
            let rng = url_rng.clone();
            Arc::new(move || random_url(&rng))
        };
        let url_pool = Arc::new(ObjectPool::new(
            config.url_pool_size,
            config.url_threshold,
            config.url_workers,
            config.url_refill_interval(),
            url_gen,
        )?);

        let ke_keywords = keywords.clone();
        let ke_emojis = emojis.clone();
        let keyword_emoji_gen: Generator<String> = Arc::new(move || {
            let kw = ke_keywords.random(1).map(|k| k.text).unwrap_or_default();
            let emoji = ke_emojis.random().unwrap_or_default();
            format!("{kw}{emoji}")
        });
        let keyword_emoji_pool = Arc::new(ObjectPool::new(
            config.keyword_emoji_pool_size,
            config.keyword_emoji_threshold,
            config.keyword_emoji_workers,
            config.keyword_emoji_refill_interval(),
            keyword_emoji_gen,
        )?);

        let update_batcher = Arc::new(UpdateBatcher::start(
            storage.clone(),
            config.update_channel_capacity,
            config.update_max_batch,
            config.update_flush_interval(),
        ));

        Ok(Self {
            config: parking_lot::RwLock::new(config),
            storage,
            keywords,
            images,
            contents,
            title_generator,
            emojis,
            cls_pool,
            url_pool,
            keyword_emoji_pool,
            update_batcher,
            refiller: parking_lot::Mutex::new(None),
        })
    }

    /// Discover groups for contents/keywords/images, pre-create pools and
    /// launch every background worker.
    pub async fn start(&self) -> Result<()> {
        let config = self.config.read().clone();

        let content_groups = self
            .storage
            .distinct_group_ids("contents")
            .await
            .map_err(|e| SeoError::Storage(format!("group discovery failed: {e}")))?;
        for group_id in &content_groups {
            self.contents
                .entry(*group_id)
                .or_insert_with(|| {
                    Arc::new(ConsumablePool::with_refill_threshold(
                        config.contents_size,
                        config.threshold,
                    ))
                });
        }

        let keyword_groups = self.storage.distinct_group_ids("keywords").await.unwrap_or_default();
        for group_id in &keyword_groups {
            if let Ok(items) = self.storage.load_all_keywords(*group_id).await {
                self.keywords.load_group(*group_id, items);
            }
        }

        let image_groups = self.storage.distinct_group_ids("images").await.unwrap_or_default();
        for group_id in image_groups {
            if let Ok(items) = self.storage.load_all_images(group_id).await {
                self.images.load_group(group_id, items);
            }
        }

        // Titles are popped by keyword_group_id (page_handler.rs), not by
        // content group, so the worker fleet must be started over the
        // keyword groups. `pop` also lazily ensures a group's buffer exists
        // for any group discovery misses.
        self.title_generator.start(&keyword_groups);
        self.cls_pool.start();
        self.url_pool.start();
        self.keyword_emoji_pool.start();

        let refiller = Refiller::start(
            self.contents.clone(),
            self.storage.clone(),
            config.threshold,
            config.refill_interval(),
        );
        *self.refiller.lock() = Some(refiller);

        info!(groups = content_groups.len(), "pool manager started");
        Ok(())
    }

    /// Cascade-stop every subcomponent in reverse dependency order.
    pub async fn stop(&self) {
        self.cls_pool.stop().await;
        self.url_pool.stop().await;
        self.keyword_emoji_pool.stop().await;
        self.title_generator.stop().await;
        if let Some(refiller) = self.refiller.lock().take() {
            refiller.stop().await;
        }
        self.update_batcher.stop().await;
    }

    fn get_or_create_content_pool(&self, group_id: i64) -> Arc<ConsumablePool> {
        let config = self.config.read();
        self.contents
            .entry(group_id)
            .or_insert_with(|| {
                Arc::new(ConsumablePool::with_refill_threshold(
                    config.contents_size,
                    config.threshold,
                ))
            })
            .clone()
    }

    /// `titles` delegates to the TitleGenerator (always succeeds); `contents`
    /// pops, refilling once inline on an empty pool before giving up.
    pub async fn pop_content(&self, group_id: i64) -> Result<String> {
        let pool = self.get_or_create_content_pool(group_id);
        if let Some(item) = pool.pop() {
            self.schedule_mark_consumed(item.id);
            return Ok(item.text);
        }

        self.refill_content_once(group_id, &pool).await;

        match pool.pop() {
            Some(item) => {
                self.schedule_mark_consumed(item.id);
                Ok(item.text)
            }
            None => Err(SeoError::CachePoolEmpty { group_id }),
        }
    }

    async fn refill_content_once(&self, group_id: i64, pool: &Arc<ConsumablePool>) {
        let need = pool.max_size().saturating_sub(pool.len());
        if need == 0 {
            return;
        }
        match self.storage.fetch_available("contents", group_id, need).await {
            Ok(rows) => {
                pool.push(rows);
            }
            Err(e) => warn!(group_id, error = %e, "inline content refill failed"),
        }
    }

    fn schedule_mark_consumed(&self, id: i64) {
        self.update_batcher.add(MarkConsumedTask { table: "contents", id });
    }

    pub fn pop_title(&self, group_id: i64) -> String {
        self.title_generator.pop(group_id)
    }

    pub fn random_keyword(&self, group_id: i64) -> Option<String> {
        self.keywords.random(group_id).map(|k| k.encoded)
    }

    pub fn random_keyword_raw(&self, group_id: i64) -> Option<String> {
        self.keywords.random(group_id).map(|k| k.text)
    }

    pub fn random_image(&self, group_id: i64) -> Option<String> {
        self.images.random(group_id).map(|i| i.url)
    }

    pub fn random_emoji(&self) -> Option<String> {
        self.emojis.random()
    }

    pub fn get_cls(&self) -> Option<String> {
        self.cls_pool.get()
    }

    pub fn get_url(&self) -> Option<String> {
        self.url_pool.get()
    }

    pub fn get_keyword_emoji(&self) -> Option<String> {
        self.keyword_emoji_pool.get()
    }

    pub fn append_keywords(&self, group_id: i64, items: &[(i64, String)]) {
        let keywords: Vec<Keyword> = items
            .iter()
            .map(|(id, text)| Keyword::new(*id, group_id, text.clone()))
            .collect();
        self.keywords.append(group_id, &keywords);
    }

    pub fn append_images(&self, group_id: i64, items: &[(i64, String)]) {
        let images: Vec<Image> = items
            .iter()
            .map(|(id, url)| Image::new(*id, group_id, url.clone()))
            .collect();
        self.images.append(group_id, &images);
    }

    pub async fn reload_keyword_group(&self, group_id: i64) -> Result<()> {
        let items = self
            .storage
            .load_all_keywords(group_id)
            .await
            .map_err(|e| SeoError::Storage(e.to_string()))?;
        self.keywords.reload(group_id, items);
        Ok(())
    }

    pub async fn reload_image_group(&self, group_id: i64) -> Result<()> {
        let items = self
            .storage
            .load_all_images(group_id)
            .await
            .map_err(|e| SeoError::Storage(e.to_string()))?;
        self.images.reload(group_id, items);
        Ok(())
    }

    pub fn reload_emojis(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        self.emojis.reload(path)
    }

    /// Re-read pool_config and propagate: resize content pools preserving
    /// head items up to the new capacity, and drop the title/object pool
    /// buffers (their workers refill on their own cadence).
    pub async fn reload(&self) -> Result<()> {
        let new_config = self
            .storage
            .load_pool_config()
            .await
            .map_err(|e| SeoError::Storage(e.to_string()))?;
        new_config.validate()?;

        for mut entry in self.contents.iter_mut() {
            let old = entry.value().clone();
            let resized = Arc::new(ConsumablePool::with_refill_threshold(
                new_config.contents_size,
                new_config.threshold,
            ));
            let mut carried = 0;
            while carried < new_config.contents_size {
                match old.pop() {
                    Some(item) => {
                        resized.push(vec![item]);
                        carried += 1;
                    }
                    None => break,
                }
            }
            *entry.value_mut() = resized;
        }

        self.title_generator.reload();

        *self.config.write() = new_config;
        Ok(())
    }

    pub fn get_data_pools_stats(&self) -> Vec<PoolStatus> {
        let mut out = Vec::new();

        out.push(PoolStatus {
            name: "keywords".into(),
            kind: PoolKind::Reusable,
            reusable_counts: Some(self.keywords.stats()),
            consumable_groups: None,
            object_pool: None,
        });
        out.push(PoolStatus {
            name: "images".into(),
            kind: PoolKind::Reusable,
            reusable_counts: Some(self.images.stats()),
            consumable_groups: None,
            object_pool: None,
        });

        let groups: Vec<ConsumableGroupStatus> = self
            .contents
            .iter()
            .map(|entry| {
                let pool = entry.value();
                let size = pool.max_size();
                let available = pool.len();
                let used = pool.consumed_count();
                ConsumableGroupStatus {
                    group_id: *entry.key(),
                    size,
                    available,
                    used,
                    utilization_pct: if size == 0 {
                        0.0
                    } else {
                        100.0 * (size - available) as f64 / size as f64
                    },
                    memory_bytes: pool.memory_bytes(),
                }
            })
            .collect();
        out.push(PoolStatus {
            name: "contents".into(),
            kind: PoolKind::Consumable,
            reusable_counts: None,
            consumable_groups: Some(groups),
            object_pool: None,
        });

        for (name, pool) in [
            ("cls", &self.cls_pool),
            ("url", &self.url_pool),
            ("keyword_emoji", &self.keyword_emoji_pool),
        ] {
            out.push(PoolStatus {
                name: name.into(),
                kind: PoolKind::Static,
                reusable_counts: None,
                consumable_groups: None,
                object_pool: Some(pool.stats()),
            });
        }

        out
    }

    pub fn config(&self) -> PoolConfig {
        self.config.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;
    use std::time::Duration;

    fn test_emojis() -> Arc<EmojiStore> {
        Arc::new(EmojiStore::from_items(vec!["😀".into(), "😎".into()]))
    }

    #[tokio::test]
    async fn pop_content_refills_inline_then_reports_empty() {
        let config = PoolConfig::builder()
            .contents_size(3)
            .threshold(2)
            .refill_interval_ms(10)
            .build()
            .unwrap();
        let storage = InMemoryStorage::new(config.clone());
        storage.contents.lock().insert(
            7,
            (1..=5)
                .map(|i| ConsumableItem { id: i, text: format!("content {i}") })
                .collect(),
        );

        let manager = PoolManager::new(config, storage, test_emojis()).unwrap();
        manager.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(manager.get_data_pools_stats().len(), 5);

        let first = manager.pop_content(7).await.unwrap();
        assert!(first.starts_with("content"));
        let second = manager.pop_content(7).await.unwrap();
        assert!(second.starts_with("content"));

        manager.stop().await;
    }

    #[tokio::test]
    async fn pop_content_on_truly_empty_group_returns_cache_pool_empty() {
        let config = PoolConfig::builder().contents_size(2).threshold(1).build().unwrap();
        let storage = InMemoryStorage::new(config.clone());
        let manager = PoolManager::new(config, storage, test_emojis()).unwrap();
        let err = manager.pop_content(99).await.unwrap_err();
        assert!(matches!(err, SeoError::CachePoolEmpty { group_id: 99 }));
    }

    #[tokio::test]
    async fn pop_title_always_succeeds_even_before_start() {
        let config = PoolConfig::default();
        let storage = InMemoryStorage::new(config.clone());
        storage.keywords.lock().insert(
            1,
            vec![Keyword::new(1, 1, "k1"), Keyword::new(2, 1, "k2"), Keyword::new(3, 1, "k3")],
        );
        let manager = PoolManager::new(config, storage, test_emojis()).unwrap();
        manager.reload_keyword_group(1).await.unwrap();
        let title = manager.pop_title(1);
        assert!(!title.is_empty());
    }

    #[tokio::test]
    async fn random_keyword_returns_encoded_text() {
        let config = PoolConfig::default();
        let storage = InMemoryStorage::new(config.clone());
        let manager = PoolManager::new(config, storage, test_emojis()).unwrap();
        manager.append_keywords(1, &[(1, "<b>tag</b>".to_string())]);
        assert_eq!(manager.random_keyword(1).unwrap(), "&lt;b&gt;tag&lt;/b&gt;");
        assert_eq!(manager.random_keyword_raw(1).unwrap(), "<b>tag</b>");
    }
}

