// Title generator: per-group bounded buffer of composed titles. Workers
// synthesize `kw + emoji + kw + emoji + kw` ahead of demand; `pop` never
// blocks, on an empty buffer it synthesizes one title inline, which keeps
// every request's latency bounded even on cold start.

use crate::emoji::EmojiStore;
use crate::pool::items::Keyword;
use crate::pool::reusable::ReusablePool;
use crossbeam::queue::ArrayQueue;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};

struct GroupBuffer {
    queue: Arc<ArrayQueue<String>>,
    tasks: Vec<JoinHandle<()>>,
}

pub struct TitleGenerator {
    keywords: Arc<ReusablePool<Keyword>>,
    emojis: Arc<EmojiStore>,
    pool_size: usize,
    workers_per_group: usize,
    refill_interval: Duration,
    threshold: f64,
    buffers: DashMap<i64, GroupBuffer>,
    stopped: Arc<AtomicBool>,
}

fn synthesize(keywords: &ReusablePool<Keyword>, emojis: &EmojiStore, group_id: i64) -> String {
    let kws: Vec<String> = (0..3)
        .filter_map(|_| keywords.random(group_id).map(|k| k.text))
        .collect();
    if kws.is_empty() {
        return String::new();
    }
    let mut exclude = HashSet::new();
    let e1 = emojis.random().unwrap_or_default();
    if !e1.is_empty() {
        exclude.insert(e1.clone());
    }
    let e2 = emojis.random_exclude(&exclude).unwrap_or_default();

    let mut title = String::new();
    for (i, kw) in kws.iter().enumerate() {
        title.push_str(kw);
        if i == 0 {
            title.push_str(&e1);
        } else if i == 1 {
            title.push_str(&e2);
        }
    }
    title
}

impl TitleGenerator {
    pub fn new(
        keywords: Arc<ReusablePool<Keyword>>,
        emojis: Arc<EmojiStore>,
        pool_size: usize,
        workers_per_group: usize,
        refill_interval: Duration,
        threshold: f64,
    ) -> Self {
        Self {
            keywords,
            emojis,
            pool_size,
            workers_per_group: workers_per_group.max(1),
            refill_interval,
            threshold,
            buffers: DashMap::new(),
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Pre-fill each group's buffer and launch its worker fleet.
    pub fn start(&self, group_ids: &[i64]) {
        for &group_id in group_ids {
            self.ensure_group(group_id);
        }
    }

    /// Create a group's buffer and worker fleet if it doesn't already exist.
    /// Called from `start` for discovered groups and from `pop` for any
    /// group a caller reaches before discovery started it, so a request
    /// never serves off an empty buffer just because it was missed at
    /// startup.
    fn ensure_group(&self, group_id: i64) {
        self.buffers.entry(group_id).or_insert_with(|| {
            let queue = Arc::new(ArrayQueue::new(self.pool_size.max(1)));
            let tasks = self.spawn_workers(group_id, queue.clone());
            GroupBuffer { queue, tasks }
        });
    }

    fn spawn_workers(&self, group_id: i64, queue: Arc<ArrayQueue<String>>) -> Vec<JoinHandle<()>> {
        (0..self.workers_per_group)
            .map(|_| {
                let queue = queue.clone();
                let keywords = self.keywords.clone();
                let emojis = self.emojis.clone();
                let stopped = self.stopped.clone();
                let pool_size = self.pool_size;
                let threshold = self.threshold;
                let mut ticker = interval(self.refill_interval);

                tokio::spawn(async move {
                    loop {
                        ticker.tick().await;
                        if stopped.load(Ordering::Relaxed) {
                            break;
                        }
                        while (queue.len() as f64) < (pool_size as f64) * threshold {
                            let title = synthesize(&keywords, &emojis, group_id);
                            if title.is_empty() || queue.push(title).is_err() {
                                break;
                            }
                        }
                    }
                })
            })
            .collect()
    }

    /// Non-blocking pop; synthesizes inline on an empty buffer, guaranteeing
    /// a bounded-latency result.
    pub fn pop(&self, group_id: i64) -> String {
        self.ensure_group(group_id);
        if let Some(buffer) = self.buffers.get(&group_id) {
            if let Some(title) = buffer.queue.pop() {
                return title;
            }
        }
        synthesize(&self.keywords, &self.emojis, group_id)
    }

    /// Drop every buffer, abort their now-orphaned workers, and immediately
    /// recreate a fresh buffer and worker fleet for the same groups, so pops
    /// keep being served by background-filled buffers instead of falling
    /// back to inline synthesis forever.
    pub fn reload(&self) {
        let group_ids: Vec<i64> = self.buffers.iter().map(|entry| *entry.key()).collect();
        for group_id in &group_ids {
            if let Some((_, buffer)) = self.buffers.remove(group_id) {
                for task in buffer.tasks {
                    task.abort();
                }
            }
        }
        for group_id in group_ids {
            self.ensure_group(group_id);
        }
    }

    pub async fn stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
        let mut handles = Vec::new();
        for mut entry in self.buffers.iter_mut() {
            handles.append(&mut entry.tasks);
        }
        for handle in handles {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyword(id: i64, group_id: i64, text: &str) -> Keyword {
        Keyword::new(id, group_id, text)
    }

    #[test]
    fn synthesize_shape_with_three_keywords_two_emojis() {
        let keywords = Arc::new(ReusablePool::new());
        keywords.load_group(
            1,
            vec![keyword(1, 1, "k1"), keyword(2, 1, "k2"), keyword(3, 1, "k3")],
        );
        let emojis = Arc::new(EmojiStore::from_items(vec!["😀".into(), "😎".into()]));
        let title = synthesize(&keywords, &emojis, 1);
        assert!(title.starts_with("k1"));
        assert!(title.contains("k2"));
        assert!(title.ends_with("k3"));
    }

    #[test]
    fn synthesize_degrades_gracefully_with_no_keywords() {
        let keywords: Arc<ReusablePool<Keyword>> = Arc::new(ReusablePool::new());
        let emojis = Arc::new(EmojiStore::from_items(vec!["😀".into()]));
        assert_eq!(synthesize(&keywords, &emojis, 1), "");
    }

    #[tokio::test]
    async fn pop_synthesizes_inline_on_cold_start() {
        let keywords = Arc::new(ReusablePool::new());
        keywords.load_group(1, vec![keyword(1, 1, "k1")]);
        let emojis = Arc::new(EmojiStore::from_items(vec!["😀".into(), "😎".into()]));
        let generator = TitleGenerator::new(
            keywords,
            emojis,
            4,
            1,
            Duration::from_millis(10),
            0.5,
        );
        // No start() call yet, pop must still return promptly via inline
        // synthesis even though it also lazily creates the group's buffer.
        let title = generator.pop(1);
        assert!(title.contains("k1"));
    }

    #[tokio::test]
    async fn reload_recreates_buffer_for_previously_known_groups() {
        let keywords = Arc::new(ReusablePool::new());
        keywords.load_group(
            1,
            vec![keyword(1, 1, "k1"), keyword(2, 1, "k2"), keyword(3, 1, "k3")],
        );
        let emojis = Arc::new(EmojiStore::from_items(vec!["😀".into(), "😎".into()]));
        let generator = TitleGenerator::new(keywords, emojis, 4, 1, Duration::from_millis(10), 0.5);
        generator.start(&[1]);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(generator.buffers.contains_key(&1));

        generator.reload();
        // The buffer for a previously known group must come back immediately,
        // not stay dropped until some external caller re-invokes start.
        assert!(generator.buffers.contains_key(&1));

        tokio::time::sleep(Duration::from_millis(50)).await;
        generator.stop().await;
    }
}
