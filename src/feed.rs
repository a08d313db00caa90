//! Per-feed aggregates.

use std::collections::HashMap;

use crate::error::{IndexError, IndexResult};
use crate::index::Number;
use crate::positions::WordId;

/// Weight of the feed click-through rate in the feed search weight.
pub const FEED_RCTR_FACTOR: f32 = 10000.0 * 0.4;

/// Aggregate state of all indexed messages sharing a source URL.
#[derive(Debug, Default, Clone)]
pub struct FeedInfo {
    /// Messages of the feed with the pseudo ids of their feed-countable words.
    pub messages: HashMap<Number, Vec<WordId>>,
    /// Pseudo id to number of feed messages containing the word.
    pub words: HashMap<WordId, u32>,
    /// Sum of message impressions.
    pub impressions: u64,
    /// Sum of message clicks.
    pub clicks: u64,
    /// Derived relevance of the feed.
    pub search_weight: u32,
}

impl FeedInfo {
    /// Number of messages the feed has in the index.
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Recompute the search weight from clicks and impressions.
    pub fn calc_search_weight(&mut self, impression_respected_level: u32) {
        let respected = self.impressions.max(u64::from(impression_respected_level));
        self.search_weight = if respected > 0 {
            (FEED_RCTR_FACTOR * self.clicks.min(self.impressions) as f32 / respected as f32 + 0.5)
                as u32
        } else {
            0
        };
    }

    /// Register message `number` with its feed-countable words.
    pub fn add_message(&mut self, number: Number, words: Vec<WordId>) {
        for &word in &words {
            *self.words.entry(word).or_insert(0) += 1;
        }
        self.messages.insert(number, words);
    }

    /// Undo [`FeedInfo::add_message`].
    pub fn remove_message(&mut self, number: Number) -> IndexResult<()> {
        let words = self
            .messages
            .remove(&number)
            .ok_or_else(|| IndexError::corrupted(format!("message {number} not in its feed")))?;
        for word in words {
            let count = self.words.get_mut(&word).ok_or_else(|| {
                IndexError::corrupted(format!("feed word {word} of message {number} not counted"))
            })?;
            *count -= 1;
            if *count == 0 {
                self.words.remove(&word);
            }
        }
        Ok(())
    }
}
