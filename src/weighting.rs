//! Core word weighting.
//!
//! Every word of a message gets a weight out of its occurrence count, its
//! distance from the start of the text, its corpus frequency and a handful of
//! location and token type factors. The best ranked words become the core
//! words of the message. When a word pair store is configured, the ranking of
//! the selected core words is refined with co-occurrence statistics.

use std::collections::{BTreeMap, HashMap};

use crate::error::{IndexError, IndexResult};
use crate::index::SearchableMessageMap;
use crate::locale::Lang;
use crate::message::StoredMessage;
use crate::morphology::pseudo_id;
use crate::positions::{TokenType, WordId, WordPosition, WordPositions};
use crate::word_pair::{long_time_index, short_time_index, WordPair, WordPairStore};

/// Boost of words capitalized everywhere in the message.
pub const CAPITAL_WORD_FACTOR: f32 = 1.5;
/// Boost of proper names.
pub const PROPER_NAME_WORD_FACTOR: f32 = 1.5;
/// Factor of words found only in image alt texts.
pub const ALTERNATE_ONLY_WORD_FACTOR: f32 = 0.7;
/// Factor of words found only in keywords.
pub const META_INFO_WORD_FACTOR: f32 = 0.0;

/// Token type factors outside the title, indexed by token type.
pub const TOKEN_FACTOR: [f32; 16] = [
    0.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0,
];
/// Token type factors for words found in the title.
pub const TITLE_TOKEN_FACTOR: [f32; 16] = [
    0.0, 3.5, 4.5, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 3.5, 0.0,
];

/// Feed size from which in-feed frequency is blended into corpus frequency.
pub const MESSAGES_IN_FEED_THRESHOLD: usize = 500;
/// In-feed frequency, in percent, making a word a feed stop word.
pub const FEED_STOP_WORD_THRESHOLD: f32 = 91.0;
/// A message has either no core words or at least this many.
pub const CORE_WORD_MIN_NUMBER: usize = 2;
/// Words below this weight are not selected past the minimum count.
pub const CORE_WORD_MIN_WEIGHT: f32 = 0.001;
/// Distance after which position no longer lowers the absolute position weight.
pub const CORE_POS_THRESHOLD: u32 = 100;
/// Shift of the word uniqueness logarithm.
pub const WP_LOG_SHIFT: f64 = 0.5;

/// Weight of the message click-through rate in its search weight.
pub const RCTR_FACTOR: f32 = 10000.0 * 4.0;
/// Weight of each event member in the search weight.
pub const CAPACITY_FACTOR: f32 = 2.0;
/// Event size beyond which capacity stops adding weight.
pub const MAX_EVENT_SIZE: u32 = 10000;
/// Flat search weight bonus of messages with images.
pub const IMAGE_BONUS: u32 = 1000;

/// Search weight of `msg`: event capacity, click-through rate and image bonus.
///
/// Impressions below `impression_respected_level` count as that level.
pub fn message_search_weight(msg: &StoredMessage, impression_respected_level: u32) -> u32 {
    let capacity = msg.event_capacity.min(MAX_EVENT_SIZE);
    let mut weight = (CAPACITY_FACTOR * capacity as f32 + 0.5) as u32;

    let respected = msg.impressions.max(u64::from(impression_respected_level));
    if respected > 0 {
        let clicks = msg.clicks.min(msg.impressions);
        weight += (RCTR_FACTOR * clicks as f32 / respected as f32 + 0.5) as u32;
    }
    if msg.flags & StoredMessage::HAS_IMAGES != 0 {
        weight += IMAGE_BONUS;
    }
    weight
}

/// Where and how a word occurs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PositionFlags {
    /// Capitalized everywhere.
    pub capital: bool,
    /// Proper name word or known word.
    pub proper_name: bool,
    /// Occurs in the title.
    pub title: bool,
    /// Occurs in alt texts but not in title or description.
    pub alternate_only: bool,
    /// Occurs only in keywords.
    pub meta_info: bool,
}

impl PositionFlags {
    fn of(wp: &WordPositions) -> Self {
        let flags = wp.flags;
        let token_type = wp.token_type();
        PositionFlags {
            capital: flags & WordPositions::CAPITAL_WORD != 0,
            proper_name: matches!(token_type, TokenType::Word | TokenType::KnownWord)
                && flags & WordPositions::PROPER_NAME != 0,
            title: flags & WordPositions::TITLE != 0,
            alternate_only: flags & (WordPositions::TITLE | WordPositions::DESC) == 0
                && flags & WordPositions::ALT != 0,
            meta_info: flags & WordPositions::LOCATION_MASK == 0,
        }
    }
}

/// What is known about the word at one position.
#[derive(Clone, Debug, Default)]
pub struct PositionInfo {
    /// Word text.
    pub word: String,
    /// Occurrences of the word in the message.
    pub word_position_count: u16,
    /// Percent of same-language messages containing the word.
    pub word_frequency: f32,
    /// Chosen normal form, zero if none.
    pub norm_form: WordId,
    /// Occurrences of the normal form in the message.
    pub norm_form_position_count: u16,
    /// Percent of same-language messages containing the normal form.
    pub norm_form_frequency: f32,
    /// Language of the word or chosen normal form.
    pub lang: Lang,
    /// Token type of the word or chosen normal form.
    pub token_type: TokenType,
    /// Location and capitalization.
    pub flags: PositionFlags,
}

/// A ranked word of a message.
#[derive(Clone, Debug, Default)]
pub struct WordInfo {
    /// Word text.
    pub text: String,
    /// Normal form, zero if none.
    pub norm_form: WordId,
    /// Pseudo id of the text; feed statistics are keyed by it.
    pub pseudo_id: WordId,
    /// Language.
    pub lang: Lang,
    /// Token type, possibly [`TokenType::FeedStopWord`].
    pub token_type: TokenType,
    /// Whether the word counts towards feed word statistics.
    pub feed_countable: bool,
    /// Frequency based weight.
    pub cw_weight: f32,
    /// Word pair based weight.
    pub wp_weight: f32,
    /// Combined weight after word pair ranking.
    pub weight: f32,
    /// Location and capitalization.
    pub position_flags: PositionFlags,
}

impl WordInfo {
    /// Core word id: the normal form, or the pseudo id without one.
    pub fn id(&self) -> WordId {
        if self.norm_form != 0 {
            self.norm_form
        } else {
            self.pseudo_id
        }
    }
}

#[derive(Hash, PartialEq, Eq)]
enum WordKey {
    NormForm(WordId),
    Text(String),
}

/// Per-position and per-word results of [`SearchableMessageMap::calc_words_freq`].
#[derive(Clone, Debug, Default)]
pub struct WordsFreqInfo {
    /// Position to what is known about it.
    pub word_positions: BTreeMap<WordPosition, PositionInfo>,
    /// Distinct words, highest weight first.
    pub word_infos: Vec<WordInfo>,
}

impl SearchableMessageMap {
    /// Rank the words of an indexed message.
    ///
    /// `new_msg` tells whether the message is being inserted, so that feed
    /// statistics account for it before its words are counted there.
    pub fn calc_words_freq(&self, msg: &StoredMessage, new_msg: bool) -> IndexResult<WordsFreqInfo> {
        let feed = if msg.source_url().is_empty() {
            None
        } else {
            self.feeds.get(msg.source_url())
        };

        let message_count = self.lang_message_count(msg.lang);
        if message_count == 0 {
            return Err(IndexError::corrupted(format!(
                "no messages counted for language {}",
                msg.lang
            )));
        }
        let message_count = message_count as f32;
        let messages_in_feed = usize::from(new_msg) + feed.map_or(0, |f| f.messages.len());

        let mut result = WordsFreqInfo::default();
        let mut position_count: u32 = 0;

        for (word, wp) in msg.word_positions.iter() {
            let word_messages = self
                .words
                .get(word.as_str())
                .ok_or_else(|| IndexError::corrupted(format!("word `{word}` is not indexed")))?;
            let word_frequency =
                word_messages.lang_message_count(msg.lang) as f32 * 100.0 / message_count;
            let flags = PositionFlags::of(wp);

            for &pos in wp.positions(&msg.positions) {
                if pos < msg.keywords_pos && position_count < u32::from(pos) {
                    position_count = u32::from(pos);
                }
                let pi = result.word_positions.entry(pos).or_default();
                pi.word = word.clone();
                pi.word_position_count = wp.position_count();
                pi.word_frequency = word_frequency;
                pi.lang = wp.lang;
                pi.token_type = wp.token_type();
                pi.flags = flags;
            }
        }

        position_count += 1;
        let core_pos_threshold = position_count.min(CORE_POS_THRESHOLD);

        for (&id, wp) in msg.norm_form_positions.iter() {
            let word_messages = self
                .norm_forms
                .get(&id)
                .ok_or_else(|| IndexError::corrupted(format!("normal form {id} is not indexed")))?;
            let frequency =
                word_messages.lang_message_count(msg.lang) as f32 * 100.0 / message_count;
            let form_flags = PositionFlags::of(wp);

            for &pos in wp.positions(&msg.positions) {
                let pi = result.word_positions.entry(pos).or_default();

                // Several forms may claim a position: prefer the message
                // language, then the more frequent form.
                let prefer_lang =
                    !msg.lang.is_null() && wp.lang == msg.lang && pi.lang != msg.lang;
                let lang_compatible = msg.lang.is_null()
                    || wp.lang == msg.lang
                    || pi.lang.is_null()
                    || wp.lang == pi.lang;

                if prefer_lang || (frequency > pi.norm_form_frequency && lang_compatible) {
                    pi.norm_form_position_count = wp.position_count();
                    pi.norm_form_frequency = frequency;
                    pi.norm_form = id;
                    pi.lang = wp.lang;
                    pi.token_type = wp.token_type();
                    pi.flags.capital &= form_flags.capital;
                    pi.flags.proper_name = pi.flags.capital && form_flags.proper_name;
                    pi.flags.title |= form_flags.title;
                    pi.flags.alternate_only &= form_flags.alternate_only;
                    pi.flags.meta_info &= form_flags.meta_info;
                }
            }
        }

        let mut word_infos: HashMap<WordKey, WordInfo> = HashMap::new();

        for (&pos, pi) in &result.word_positions {
            let word_pseudo_id = pseudo_id(&pi.word);
            let feed_countable = pi.token_type != TokenType::StopWord && !pi.flags.meta_info;
            let mut token_type = pi.token_type;
            let mut in_feed_frequency = 0.0;

            if let Some(feed) = feed.filter(|_| messages_in_feed > 1) {
                let count = feed.words.get(&word_pseudo_id).copied().unwrap_or(0);
                in_feed_frequency = (count as f32 + f32::from(u8::from(new_msg))) * 100.0
                    / messages_in_feed as f32;
                if feed_countable && in_feed_frequency >= FEED_STOP_WORD_THRESHOLD {
                    token_type = TokenType::FeedStopWord;
                }
            }

            let mut frequency = if pi.norm_form_position_count > 0 {
                pi.norm_form_frequency
            } else {
                pi.word_frequency
            };
            if messages_in_feed >= MESSAGES_IN_FEED_THRESHOLD && feed_countable {
                frequency = (2.0 * frequency + in_feed_frequency) / 3.0;
            }
            let rounded_frequency = (((frequency * 10.0 + 0.5) as u64) as f32 / 10.0).max(0.1);

            let occurrence = if pi.norm_form_position_count > 0 {
                pi.norm_form_position_count
            } else {
                pi.word_position_count
            };

            let pos = u32::from(pos);
            let rel_position_weight = 1.0 - pos.min(position_count) as f32 / position_count as f32;
            let abs_position_weight =
                1.0 - pos.min(core_pos_threshold) as f32 / core_pos_threshold as f32;
            let position_weight = (rel_position_weight + abs_position_weight) / 2.0;

            let flags = pi.flags;
            let location_factor = if flags.alternate_only {
                ALTERNATE_ONLY_WORD_FACTOR
            } else if flags.meta_info {
                META_INFO_WORD_FACTOR
            } else {
                1.0
            };
            let table = if flags.title {
                &TITLE_TOKEN_FACTOR
            } else {
                &TOKEN_FACTOR
            };
            let cw_weight = f32::from(occurrence) * (position_weight + 1.0).powf(3.5)
                / rounded_frequency
                * if flags.capital { CAPITAL_WORD_FACTOR } else { 1.0 }
                * if flags.proper_name { PROPER_NAME_WORD_FACTOR } else { 1.0 }
                * location_factor
                * table[token_type.index()];

            let info = WordInfo {
                text: pi.word.clone(),
                norm_form: pi.norm_form,
                pseudo_id: word_pseudo_id,
                lang: pi.lang,
                token_type,
                feed_countable,
                cw_weight,
                wp_weight: 0.0,
                weight: 0.0,
                position_flags: flags,
            };
            let key = if info.norm_form != 0 {
                WordKey::NormForm(info.norm_form)
            } else {
                WordKey::Text(info.text.clone())
            };
            match word_infos.get(&key) {
                Some(existing) if existing.cw_weight >= info.cw_weight => {}
                _ => {
                    word_infos.insert(key, info);
                }
            }
        }

        let mut word_infos: Vec<WordInfo> = word_infos.into_values().collect();
        word_infos.sort_by(|a, b| {
            b.cw_weight
                .total_cmp(&a.cw_weight)
                .then_with(|| a.id().cmp(&b.id()))
                .then_with(|| a.text.cmp(&b.text))
        });
        result.word_infos = word_infos;
        Ok(result)
    }
}

fn mark_core_word(msg: &mut StoredMessage, wi: &WordInfo) -> IndexResult<()> {
    msg.word_positions
        .get_mut(wi.text.as_str())
        .ok_or_else(|| IndexError::corrupted(format!("ranked word `{}` not in message", wi.text)))?
        .flags |= WordPositions::CORE_WORD;
    if wi.norm_form != 0 {
        msg.norm_form_positions
            .get_mut(&wi.norm_form)
            .ok_or_else(|| {
                IndexError::corrupted(format!("ranked form {} not in message", wi.norm_form))
            })?
            .flags |= WordPositions::CORE_WORD;
    }
    Ok(())
}

fn clear_core_flags(msg: &mut StoredMessage) {
    for wp in msg.word_positions.values_mut() {
        wp.flags &= !WordPositions::CORE_WORD;
    }
    for wp in msg.norm_form_positions.values_mut() {
        wp.flags &= !WordPositions::CORE_WORD;
    }
}

/// Take the top `core_words_prc` percent of the ranked words as core words.
///
/// At most `max_core_words` are taken; words below [`CORE_WORD_MIN_WEIGHT`]
/// end the selection once [`CORE_WORD_MIN_NUMBER`] words were taken. When
/// fewer than that qualify the message gets no core words at all.
pub(crate) fn select_core_words(
    msg: &mut StoredMessage,
    word_infos: &[WordInfo],
    core_words_prc: u32,
    max_core_words: usize,
) -> IndexResult<()> {
    let watermark = ((core_words_prc as f32 * word_infos.len() as f32 / 100.0 + 0.5) as usize)
        .min(max_core_words);

    let mut core_words = Vec::with_capacity(watermark.max(CORE_WORD_MIN_NUMBER));
    for wi in word_infos {
        let taken = core_words.len();
        let wanted = taken < CORE_WORD_MIN_NUMBER
            || (taken < watermark && wi.cw_weight >= CORE_WORD_MIN_WEIGHT);
        if taken >= max_core_words || !wanted {
            break;
        }
        core_words.push(wi.id());
        mark_core_word(msg, wi)?;
    }

    if core_words.len() < CORE_WORD_MIN_NUMBER {
        core_words.clear();
        clear_core_flags(msg);
    }
    log::trace!("message {} core words {:?}", msg.id, core_words);
    msg.core_words = core_words;
    Ok(())
}

#[derive(Default)]
struct PairWeight {
    max: f32,
    sum: f32,
    count: u32,
    factor: Option<f32>,
}

impl PairWeight {
    fn absorb(&mut self, weight: f32) {
        self.max = self.max.max(weight);
        self.sum += weight;
        self.count += 1;
    }

    fn average(&self) -> f32 {
        if self.count > 0 {
            self.sum / self.count as f32
        } else {
            0.0
        }
    }
}

/// Refine the ranking of the core words of `msg` with word pair statistics.
///
/// Only the first `msg.core_words.len()` entries of `wfi.word_infos` are
/// re-ranked; the rest keep their order behind them.
pub(crate) fn calc_word_pairs_freq(
    store: &dyn WordPairStore,
    msg: &StoredMessage,
    wfi: &mut WordsFreqInfo,
) {
    let core = &msg.core_words;
    if msg.lang.is_null() || core.len() < 2 {
        return;
    }

    let lang = msg.lang;
    let short = short_time_index(msg.published);
    let long = long_time_index(msg.published);
    let short_count = |pair: WordPair| {
        store
            .get(lang, short, pair)
            .saturating_add(store.get(lang, short.wrapping_sub(1), pair))
    };
    let long_count = |pair: WordPair| {
        store
            .get(lang, long, pair)
            .saturating_add(store.get(lang, long.wrapping_sub(1), pair))
    };

    let mut weights: HashMap<WordId, PairWeight> = HashMap::new();
    let mut factor_max: f64 = 0.0;
    let mut factor_sum: f64 = 0.0;
    let mut factor_count = 0u32;

    for (i, &word) in core.iter().enumerate() {
        for &other in &core[i + 1..] {
            let pair = WordPair::new(word, other);
            let short_pairs = short_count(pair);
            let long_pairs = long_count(pair);
            if short_pairs > 1 && long_pairs > 0 {
                let short_pairs = f64::from(short_pairs);
                let weight = ((short_pairs + 0.72).ln() * short_pairs / f64::from(long_pairs)) as f32;
                weights.entry(word).or_default().absorb(weight);
                weights.entry(other).or_default().absorb(weight);
            }
        }

        let single = WordPair::single(word);
        let word_count = long_count(single).saturating_sub(short_count(single));
        let max_pairs_count = core
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != i)
            .map(|(_, &other)| {
                let pair = WordPair::new(word, other);
                long_count(pair).saturating_sub(short_count(pair))
            })
            .max()
            .unwrap_or(0);

        if let Some(weight) = weights.get_mut(&word) {
            weight.factor = if max_pairs_count > 0 {
                let factor =
                    (f64::from(word_count) / f64::from(max_pairs_count) + WP_LOG_SHIFT).ln();
                factor_max = factor_max.max(factor);
                factor_sum += factor;
                factor_count += 1;
                Some(factor as f32)
            } else {
                None
            };
        }
    }

    let np_factor = if factor_count > 0 {
        ((factor_sum / f64::from(factor_count) + factor_max) / 2.0) as f32
    } else {
        1.0
    };

    let mut max_wp_weight: f32 = 0.0;
    let mut min_wp_weight = f32::MAX;
    for wi in wfi.word_infos.iter_mut() {
        if let Some(weight) = weights.get(&wi.id()) {
            wi.wp_weight =
                (weight.average() + weight.max) / 2.0 * weight.factor.unwrap_or(np_factor);
            max_wp_weight = max_wp_weight.max(wi.wp_weight);
            min_wp_weight = min_wp_weight.min(wi.wp_weight);
        }
    }
    let avg_wp_weight = if max_wp_weight > 0.0 {
        (max_wp_weight + min_wp_weight) / 2.0
    } else {
        0.0
    };

    let core_words_size = core.len();
    let rest = wfi
        .word_infos
        .split_off(core_words_size.min(wfi.word_infos.len()));

    let mut ranked: Vec<WordInfo> = Vec::with_capacity(wfi.word_infos.len() + rest.len());
    let mut max_weight: f32 = 0.0;
    let mut min_weight = f32::MAX;
    for (pos, mut wi) in wfi.word_infos.drain(..).enumerate() {
        let rank = (core_words_size - pos) as f32 / core_words_size as f32;
        wi.weight = if max_wp_weight > 0.1 {
            wi.wp_weight + rank * max_wp_weight
        } else {
            rank
        };
        max_weight = max_weight.max(wi.weight);
        min_weight = min_weight.min(wi.weight);
        let at = ranked
            .iter()
            .position(|r| r.weight < wi.weight)
            .unwrap_or(ranked.len());
        ranked.insert(at, wi);
    }
    let avg_weight = if max_weight > 0.0 {
        (max_weight + min_weight) / 2.0
    } else {
        0.0
    };

    promote_proper_name(&mut ranked, core_words_size < 11, avg_wp_weight, avg_weight);

    ranked.extend(rest);
    wfi.word_infos = ranked;
}

fn promote_proper_name(ranked: &mut Vec<WordInfo>, short_msg: bool, avg_wp_weight: f32, avg_weight: f32) {
    let Some(first) = ranked.first() else {
        return;
    };
    if first.position_flags.proper_name {
        return;
    }

    let (first_weight, bcww, bwpw) = (first.weight, first.cw_weight, first.wp_weight);
    let in_title = ranked
        .iter()
        .skip(1)
        .position(|wi| wi.position_flags.proper_name && wi.position_flags.title);
    let competitive = || {
        ranked.iter().skip(1).position(|wi| {
            wi.position_flags.proper_name
                && (short_msg
                    || bcww <= wi.cw_weight
                    || bwpw <= wi.wp_weight
                    || wi.wp_weight >= avg_wp_weight
                    || wi.weight >= avg_weight)
        })
    };

    if let Some(at) = in_title.or_else(competitive) {
        let mut wi = ranked.remove(at + 1);
        wi.weight = (first_weight + 1.0).trunc();
        ranked.insert(0, wi);
    }
}

/// Re-rank the core words of `msg` with word pair statistics and rewrite
/// the already selected core word slots and flags accordingly.
pub(crate) fn sort_core_words(
    store: &dyn WordPairStore,
    msg: &mut StoredMessage,
    wfi: &mut WordsFreqInfo,
) -> IndexResult<()> {
    calc_word_pairs_freq(store, msg, wfi);
    clear_core_flags(msg);

    let core_words_size = msg.core_words.len();
    for (j, wi) in wfi.word_infos.iter().take(core_words_size).enumerate() {
        msg.core_words[j] = wi.id();
        mark_core_word(msg, wi)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::MessageId;
    use crate::message::StoredContent;
    use crate::word_pair::InMemoryWordPairStore;

    fn info(text: &str, cw_weight: f32) -> WordInfo {
        WordInfo {
            text: text.to_string(),
            pseudo_id: pseudo_id(text),
            cw_weight,
            ..Default::default()
        }
    }

    fn message(text: &str) -> StoredMessage {
        let mut msg = StoredMessage::new(MessageId::new(1), StoredContent::default());
        msg.break_down(text, "", &[], "", None).unwrap();
        msg
    }

    #[test]
    fn test_message_search_weight() {
        let mut msg = message("weight");
        assert_eq!(message_search_weight(&msg, 0), 0);
        msg.event_capacity = 20000;
        assert_eq!(message_search_weight(&msg, 0), 20000);
        msg.event_capacity = 0;
        msg.impressions = 4;
        msg.clicks = 9;
        assert_eq!(message_search_weight(&msg, 0), 40000);
        assert_eq!(message_search_weight(&msg, 8), 20000);
        msg.flags |= StoredMessage::HAS_IMAGES;
        assert_eq!(message_search_weight(&msg, 8), 21000);
    }

    #[test]
    fn test_core_words_all_or_nothing() {
        let mut msg = message("alpha beta gamma");
        let infos = [info("alpha", 5.0), info("beta", 0.0), info("gamma", 0.0)];
        select_core_words(&mut msg, &infos, 100, 10).unwrap();
        assert_eq!(msg.core_words, [pseudo_id("alpha"), pseudo_id("beta")]);
        assert!(msg.word_positions.get("beta").unwrap().is_core());
        assert!(!msg.word_positions.get("gamma").unwrap().is_core());

        let infos = [info("alpha", 5.0)];
        select_core_words(&mut msg, &infos, 100, 10).unwrap();
        assert!(msg.core_words.is_empty());
        assert!(!msg.word_positions.get("alpha").unwrap().is_core());
    }

    #[test]
    fn test_core_words_capped() {
        let mut msg = message("a b c d e f");
        let infos: Vec<_> = ["a", "b", "c", "d", "e", "f"]
            .iter()
            .map(|w| info(w, 1.0))
            .collect();
        select_core_words(&mut msg, &infos, 50, 10).unwrap();
        assert_eq!(msg.core_words.len(), 3);
        select_core_words(&mut msg, &infos, 100, 4).unwrap();
        assert_eq!(msg.core_words.len(), 4);
        select_core_words(&mut msg, &infos, 100, 1).unwrap();
        assert!(msg.core_words.is_empty());
    }

    #[test]
    fn test_proper_name_promoted_from_title() {
        let mut ranked = vec![info("first", 3.0), info("second", 2.0), info("name", 1.0)];
        ranked[0].weight = 2.4;
        ranked[2].position_flags.proper_name = true;
        ranked[2].position_flags.title = true;
        promote_proper_name(&mut ranked, false, 0.0, 100.0);
        assert_eq!(ranked[0].text, "name");
        assert_eq!(ranked[0].weight, 3.0);
        assert_eq!(ranked[1].text, "first");
    }

    #[test]
    fn test_pair_ranking_keeps_tail() {
        let eng = Lang::from_code("eng").unwrap();
        let store = InMemoryWordPairStore::new();
        let mut msg = message("x y z");
        msg.lang = eng;
        msg.published = 10 * crate::word_pair::LONG_PERIOD;
        let infos = vec![info("x", 3.0), info("y", 2.0), info("z", 1.0)];
        msg.core_words = vec![infos[0].id(), infos[1].id()];
        let mut wfi = WordsFreqInfo {
            word_infos: infos,
            ..Default::default()
        };
        sort_core_words(&store, &mut msg, &mut wfi).unwrap();
        let order: Vec<_> = wfi.word_infos.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(order, ["x", "y", "z"]);
        assert_eq!(wfi.word_infos[0].weight, 1.0);
        assert_eq!(wfi.word_infos[1].weight, 0.5);
        assert_eq!(msg.core_words, [pseudo_id("x"), pseudo_id("y")]);
        assert!(msg.word_positions.get("x").unwrap().is_core());
        assert!(!msg.word_positions.get("z").unwrap().is_core());
    }
}
