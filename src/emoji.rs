// Emoji store: an immutable set of emoji strings loaded once from a file,
// sampled uniformly at random with an exclusion set so title synthesis can
// draw two distinct emojis per title.

use crate::error::{Result, SeoError};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Immutable snapshot of the emoji set. Cheap to clone (`Arc<[String]>`).
pub struct EmojiStore {
    emojis: arc_swap::ArcSwap<Vec<String>>,
    rng: parking_lot::Mutex<SmallRng>,
}

impl EmojiStore {
    /// Load the emoji file; one emoji per non-empty, trimmed line.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())
            .map_err(|e| SeoError::Storage(format!("failed to read emoji file: {e}")))?;
        let emojis: Vec<String> = raw
            .lines()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .map(|l| l.to_string())
            .collect();
        Ok(Self {
            emojis: arc_swap::ArcSwap::from_pointee(emojis),
            rng: parking_lot::Mutex::new(SmallRng::from_os_rng()),
        })
    }

    /// Construct directly from an in-memory list, for tests and for callers
    /// that already hold the parsed set.
    pub fn from_items(items: Vec<String>) -> Self {
        Self {
            emojis: arc_swap::ArcSwap::from_pointee(items),
            rng: parking_lot::Mutex::new(SmallRng::from_os_rng()),
        }
    }

    /// Re-parse the emoji file in place, replacing the current snapshot.
    pub fn reload(&self, path: impl AsRef<Path>) -> Result<()> {
        let raw = fs::read_to_string(path.as_ref())
            .map_err(|e| SeoError::Storage(format!("failed to read emoji file: {e}")))?;
        let emojis: Vec<String> = raw
            .lines()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .map(|l| l.to_string())
            .collect();
        self.emojis.store(Arc::new(emojis));
        Ok(())
    }

    /// Uniform random draw. Returns `None` if the store is empty.
    pub fn random(&self) -> Option<String> {
        let snapshot = self.emojis.load();
        if snapshot.is_empty() {
            return None;
        }
        let idx = self.rng.lock().random_range(0..snapshot.len());
        Some(snapshot[idx].clone())
    }

    /// Uniform random draw excluding a set of already-chosen emojis, for
    /// composing a title with two visually distinct emojis. Falls back to
    /// an unconstrained draw if every emoji is excluded.
    pub fn random_exclude(&self, exclude: &HashSet<String>) -> Option<String> {
        let snapshot = self.emojis.load();
        if snapshot.is_empty() {
            return None;
        }
        let candidates: Vec<&String> = snapshot.iter().filter(|e| !exclude.contains(*e)).collect();
        let pool: &[&String] = if candidates.is_empty() {
            return self.random();
        } else {
            &candidates
        };
        let idx = self.rng.lock().random_range(0..pool.len());
        Some(pool[idx].clone())
    }

    pub fn len(&self) -> usize {
        self.emojis.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_exclude_avoids_excluded_when_possible() {
        let store = EmojiStore::from_items(vec!["😀".into(), "😎".into()]);
        let mut exclude = HashSet::new();
        exclude.insert("😀".to_string());
        for _ in 0..20 {
            let picked = store.random_exclude(&exclude).unwrap();
            assert_eq!(picked, "😎");
        }
    }

    #[test]
    fn empty_store_returns_none() {
        let store = EmojiStore::from_items(vec![]);
        assert!(store.random().is_none());
        assert!(store.random_exclude(&HashSet::new()).is_none());
    }

    #[test]
    fn reload_replaces_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("emojis.txt");
        std::fs::write(&path, "😀\n😎\n").unwrap();
        let store = EmojiStore::load(&path).unwrap();
        assert_eq!(store.len(), 2);
        std::fs::write(&path, "🙂\n").unwrap();
        store.reload(&path).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.random().unwrap(), "🙂");
    }
}
