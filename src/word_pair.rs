//! Word pair co-occurrence counters.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::locale::Lang;
use crate::positions::WordId;

/// Length of a short-period bucket: five days.
pub const SHORT_PERIOD: u64 = 86_400 * 5;
/// Length of a long-period bucket: 270 days.
pub const LONG_PERIOD: u64 = 86_400 * 270;

/// Unordered pair of normal form ids. A pair with zero counts the word alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WordPair {
    /// Smaller id.
    pub word1: WordId,
    /// Larger id.
    pub word2: WordId,
}

impl WordPair {
    /// Pair of `a` and `b` in either order.
    pub fn new(a: WordId, b: WordId) -> Self {
        WordPair {
            word1: a.min(b),
            word2: a.max(b),
        }
    }

    /// The self pair counting occurrences of `word` alone.
    pub fn single(word: WordId) -> Self {
        Self::new(word, 0)
    }
}

/// Short-period bucket a publication time falls into.
pub fn short_time_index(published: u64) -> u32 {
    u32::try_from(published / SHORT_PERIOD).unwrap_or(u32::MAX)
}

/// Long-period bucket a publication time falls into.
pub fn long_time_index(published: u64) -> u32 {
    u32::try_from(published / LONG_PERIOD).unwrap_or(u32::MAX)
}

/// Store of co-occurrence counters keyed by language, time bucket and pair.
///
/// Shared between index shards, hence the `&self` receivers.
pub trait WordPairStore: Send + Sync {
    /// Count one more co-occurrence.
    fn increment(&self, lang: Lang, time_index: u32, pair: WordPair);
    /// Take back one co-occurrence.
    fn decrement(&self, lang: Lang, time_index: u32, pair: WordPair);
    /// Current count.
    fn get(&self, lang: Lang, time_index: u32, pair: WordPair) -> u32;
}

/// [`WordPairStore`] keeping every counter in one hash map.
#[derive(Debug, Default)]
pub struct InMemoryWordPairStore {
    counters: Mutex<HashMap<(Lang, u32, WordPair), u32>>,
}

impl InMemoryWordPairStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of non-zero counters.
    pub fn len(&self) -> usize {
        self.counters.lock().len()
    }

    /// Whether every counter is zero.
    pub fn is_empty(&self) -> bool {
        self.counters.lock().is_empty()
    }
}

impl WordPairStore for InMemoryWordPairStore {
    fn increment(&self, lang: Lang, time_index: u32, pair: WordPair) {
        *self.counters.lock().entry((lang, time_index, pair)).or_insert(0) += 1;
    }

    fn decrement(&self, lang: Lang, time_index: u32, pair: WordPair) {
        let mut counters = self.counters.lock();
        let key = (lang, time_index, pair);
        match counters.get_mut(&key) {
            Some(count) if *count > 1 => *count -= 1,
            Some(_) => {
                counters.remove(&key);
            }
            None => log::warn!("decrementing missing word pair counter {pair:?}"),
        }
    }

    fn get(&self, lang: Lang, time_index: u32, pair: WordPair) -> u32 {
        self.counters
            .lock()
            .get(&(lang, time_index, pair))
            .copied()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairs_are_unordered() {
        assert_eq!(WordPair::new(7, 3), WordPair::new(3, 7));
        assert_eq!(WordPair::single(5), WordPair { word1: 0, word2: 5 });
    }

    #[test]
    fn test_buckets() {
        assert_eq!(short_time_index(SHORT_PERIOD * 3 + 1), 3);
        assert_eq!(long_time_index(LONG_PERIOD - 1), 0);
    }

    #[test]
    fn test_counters_drop_at_zero() {
        let store = InMemoryWordPairStore::new();
        let pair = WordPair::new(1, 2);
        store.increment(Lang::NULL, 4, pair);
        store.increment(Lang::NULL, 4, pair);
        assert_eq!(store.get(Lang::NULL, 4, pair), 2);
        assert_eq!(store.get(Lang::NULL, 5, pair), 0);
        store.decrement(Lang::NULL, 4, pair);
        store.decrement(Lang::NULL, 4, pair);
        assert!(store.is_empty());
        store.decrement(Lang::NULL, 4, pair);
        assert_eq!(store.get(Lang::NULL, 4, pair), 0);
    }
}
