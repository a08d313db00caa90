//! The searchable message map: every indexed message plus the inverted
//! indexes and aggregates derived from them.
//!
//! Messages are addressed internally by a small recyclable [`Number`]. All
//! derived structures (words, normal forms, sites, feeds, events, categories,
//! language counts, dedup signatures) are updated together on insert and
//! remove, so that [`SearchableMessageMap::check_consistency`] holds between
//! any two calls.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap, HashSet};
use std::fmt;
use std::io::Write;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::category::{category_paths, tree_path, Category, LocaleCategoryCounter};
use crate::config::IndexConfig;
use crate::error::{IndexError, IndexErrorKind, IndexResult};
use crate::feed::FeedInfo;
use crate::id::{EventId, MessageId};
use crate::locale::{Country, Lang};
use crate::message::StoredMessage;
use crate::metrics::{MetricsSink, NoopMetrics, Operation, TimeMeasurement};
use crate::morphology::token_type;
use crate::positions::{WordId, WordPositions};
use crate::tokenizer::Signature;
use crate::weighting::{
    message_search_weight, select_core_words, sort_core_words, WordsFreqInfo,
};
use crate::word_pair::{long_time_index, short_time_index, WordPair, WordPairStore};

/// Small integer handle of a message inside one map.
pub type Number = u32;

/// Largest number ever handed out.
pub const NUMBER_MAX: Number = Number::MAX - 1;

/// Messages and capitalized occurrences of a word in one language.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LangCounter {
    /// Messages of the language containing the word.
    pub messages: u32,
    /// How many of them have the word capitalized.
    pub capitalized: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum MessageLangs {
    Single(Lang),
    Many(HashMap<Lang, LangCounter>),
}

/// Messages containing a word or normal form.
///
/// Per-language counters are kept only while the messages span more than one
/// language; otherwise the single language is remembered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WordMessages {
    messages: HashSet<Number>,
    capitalized: u32,
    langs: MessageLangs,
}

impl Default for WordMessages {
    fn default() -> Self {
        WordMessages {
            messages: HashSet::new(),
            capitalized: 0,
            langs: MessageLangs::Single(Lang::NULL),
        }
    }
}

impl WordMessages {
    /// Numbers of the messages.
    pub fn messages(&self) -> &HashSet<Number> {
        &self.messages
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether no message contains the word.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages with the word capitalized.
    pub fn capitalized(&self) -> u32 {
        self.capitalized
    }

    /// Whether the messages span more than one language.
    pub fn is_multilingual(&self) -> bool {
        matches!(self.langs, MessageLangs::Many(_))
    }

    fn add_message(&mut self, lang: Lang, capital: bool, number: Number, viewer: bool) {
        let capital = u32::from(capital);
        if !viewer && !self.messages.is_empty() {
            let split = match &mut self.langs {
                MessageLangs::Single(current) if *current != lang => {
                    let mut counters = HashMap::new();
                    counters.insert(
                        *current,
                        LangCounter {
                            messages: self.messages.len() as u32,
                            capitalized: self.capitalized,
                        },
                    );
                    counters.insert(
                        lang,
                        LangCounter {
                            messages: 1,
                            capitalized: capital,
                        },
                    );
                    Some(MessageLangs::Many(counters))
                }
                MessageLangs::Single(_) => None,
                MessageLangs::Many(counters) => {
                    let counter = counters.entry(lang).or_default();
                    counter.messages += 1;
                    counter.capitalized += capital;
                    None
                }
            };
            if let Some(langs) = split {
                self.langs = langs;
            }
        }
        if self.messages.is_empty() {
            self.langs = MessageLangs::Single(lang);
        }
        self.capitalized += capital;
        self.messages.insert(number);
    }

    fn remove_message(&mut self, lang: Lang, capital: bool, number: Number) -> IndexResult<()> {
        let collapse = match &mut self.langs {
            MessageLangs::Many(counters) => {
                let counter = counters.get_mut(&lang).ok_or_else(|| {
                    IndexError::corrupted(format!("no {lang} counter for message {number}"))
                })?;
                counter.messages = counter.messages.checked_sub(1).ok_or_else(|| {
                    IndexError::corrupted(format!("{lang} counter underflow"))
                })?;
                if counter.messages == 0 {
                    counters.remove(&lang);
                } else if capital {
                    counter.capitalized = counter.capitalized.checked_sub(1).ok_or_else(|| {
                        IndexError::corrupted(format!("{lang} capitalized counter underflow"))
                    })?;
                }
                if counters.len() == 1 {
                    counters.keys().next().copied()
                } else {
                    None
                }
            }
            MessageLangs::Single(_) => None,
        };
        if let Some(lang) = collapse {
            self.langs = MessageLangs::Single(lang);
        }

        if capital {
            self.capitalized = self
                .capitalized
                .checked_sub(1)
                .ok_or_else(|| IndexError::corrupted("capitalized counter underflow"))?;
        }
        if !self.messages.remove(&number) {
            return Err(IndexError::corrupted(format!(
                "message {number} not registered for word"
            )));
        }
        Ok(())
    }

    /// Messages of `lang` containing the word; all of them for a null language.
    pub fn lang_message_count(&self, lang: Lang) -> usize {
        if lang.is_null() || self.messages.is_empty() {
            return self.messages.len();
        }
        match &self.langs {
            MessageLangs::Single(current) if *current == lang => self.messages.len(),
            MessageLangs::Single(_) => 0,
            MessageLangs::Many(counters) => {
                counters.get(&lang).map_or(0, |c| c.messages as usize)
            }
        }
    }

    /// Whether the word is capitalized in more than one message and in at
    /// least 90 % of its messages of `lang`.
    pub fn proper_name(&self, lang: Lang) -> bool {
        let (messages, capitalized) = match &self.langs {
            MessageLangs::Many(counters) => counters
                .get(&lang)
                .map_or((self.messages.len(), self.capitalized), |c| {
                    (c.messages as usize, c.capitalized)
                }),
            MessageLangs::Single(_) => (self.messages.len(), self.capitalized),
        };
        messages > 0 && capitalized > 1 && capitalized as usize * 100 / messages >= 90
    }
}

/// Snapshot of the map sizes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MapStats {
    /// Indexed messages.
    pub messages: usize,
    /// Distinct words.
    pub words: usize,
    /// Distinct normal forms.
    pub norm_forms: usize,
    /// Sum of distinct words over messages.
    pub total_words: usize,
    /// Sum of distinct normal forms over messages.
    pub total_norm_forms: usize,
    /// Sum of word positions over messages.
    pub total_word_positions: usize,
    /// Sum of normal form positions over messages.
    pub total_norm_form_positions: usize,
    /// Distinct hostnames.
    pub sites: usize,
    /// Distinct source URLs.
    pub feeds: usize,
    /// Distinct events.
    pub events: usize,
    /// Languages with messages.
    pub languages: usize,
    /// Category nodes, root included.
    pub categories: usize,
    /// Recycled numbers waiting for reuse.
    pub free_numbers: usize,
}

impl fmt::Display for MapStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "messages: {}", self.messages)?;
        writeln!(
            f,
            "words: {} ({} refs, {} positions)",
            self.words, self.total_words, self.total_word_positions
        )?;
        writeln!(
            f,
            "norm forms: {} ({} refs, {} positions)",
            self.norm_forms, self.total_norm_forms, self.total_norm_form_positions
        )?;
        writeln!(f, "sites: {}", self.sites)?;
        writeln!(f, "feeds: {}", self.feeds)?;
        writeln!(f, "events: {}", self.events)?;
        writeln!(f, "languages: {}", self.languages)?;
        writeln!(f, "categories: {}", self.categories)?;
        writeln!(f, "free numbers: {}", self.free_numbers)
    }
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

fn tree_paths(id: MessageId, categories: &[String]) -> IndexResult<BTreeSet<String>> {
    categories
        .iter()
        .map(|category| {
            tree_path(category).ok_or_else(|| {
                IndexError::from(IndexErrorKind::InvalidCategory {
                    category: category.clone(),
                    id,
                })
            })
        })
        .collect()
}

fn count_nodes(category: &Category) -> usize {
    1 + category
        .children()
        .map(|(_, child)| count_nodes(child))
        .sum::<usize>()
}

fn update_word_pairs(store: &dyn WordPairStore, msg: &StoredMessage, increment: bool) {
    let core = &msg.core_words;
    if msg.lang.is_null() || core.len() < 2 {
        return;
    }
    let indexes = [long_time_index(msg.published), short_time_index(msg.published)];
    let mut update = |pair: WordPair| {
        for &index in &indexes {
            if increment {
                store.increment(msg.lang, index, pair);
            } else {
                store.decrement(msg.lang, index, pair);
            }
        }
    };
    for (i, &word) in core.iter().enumerate() {
        update(WordPair::single(word));
        for &other in &core[i + 1..] {
            update(WordPair::new(word, other));
        }
    }
}

/// In-memory index of messages.
pub struct SearchableMessageMap {
    config: IndexConfig,
    messages: HashMap<Number, StoredMessage>,
    id_to_number: HashMap<MessageId, Number>,
    free_numbers: BinaryHeap<Reverse<Number>>,
    next_number: Number,
    pub(crate) words: HashMap<String, WordMessages>,
    pub(crate) norm_forms: HashMap<WordId, WordMessages>,
    total_words: usize,
    total_norm_forms: usize,
    total_word_positions: usize,
    total_norm_form_positions: usize,
    sites: HashMap<String, HashSet<Number>>,
    pub(crate) feeds: HashMap<String, FeedInfo>,
    event_to_number: HashMap<EventId, HashSet<Number>>,
    lang_info: HashMap<Lang, usize>,
    signatures: HashSet<Signature>,
    url_signatures: HashSet<Signature>,
    root_category: Category,
    category_counter: LocaleCategoryCounter,
    word_pairs: Option<Arc<dyn WordPairStore>>,
    metrics: Arc<dyn MetricsSink>,
}

impl fmt::Debug for SearchableMessageMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchableMessageMap")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .field("word_pairs", &self.word_pairs.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for SearchableMessageMap {
    fn default() -> Self {
        Self::new(IndexConfig::default())
    }
}

impl SearchableMessageMap {
    /// Empty map without a word pair store.
    pub fn new(config: IndexConfig) -> Self {
        SearchableMessageMap {
            config,
            messages: HashMap::new(),
            id_to_number: HashMap::new(),
            free_numbers: BinaryHeap::new(),
            next_number: 0,
            words: HashMap::new(),
            norm_forms: HashMap::new(),
            total_words: 0,
            total_norm_forms: 0,
            total_word_positions: 0,
            total_norm_form_positions: 0,
            sites: HashMap::new(),
            feeds: HashMap::new(),
            event_to_number: HashMap::new(),
            lang_info: HashMap::new(),
            signatures: HashSet::new(),
            url_signatures: HashSet::new(),
            root_category: Category::default(),
            category_counter: LocaleCategoryCounter::default(),
            word_pairs: None,
            metrics: Arc::new(NoopMetrics),
        }
    }

    /// Use `store` for word pair statistics.
    pub fn with_word_pair_store(mut self, store: Arc<dyn WordPairStore>) -> Self {
        self.word_pairs = Some(store);
        self
    }

    /// Report operation timings to `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    /// The configuration the map was created with.
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Number of indexed messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the map holds no message.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Indexed messages by number.
    pub fn messages(&self) -> impl Iterator<Item = (Number, &StoredMessage)> + '_ {
        self.messages.iter().map(|(&number, msg)| (number, msg))
    }

    /// Dedup key of a message's content.
    ///
    /// Without duplicate suppression two feeds may carry the same text, so
    /// the source URL is folded into the signature.
    pub fn message_signature(&self, msg: &StoredMessage) -> Signature {
        if self.config.suppress_duplicates {
            return msg.signature;
        }
        let mut key = Vec::with_capacity(msg.source_url().len() + 1);
        key.push(b'|');
        key.extend_from_slice(msg.source_url().as_bytes());
        xxhash_rust::xxh3::xxh3_64_with_seed(&key, msg.signature)
    }

    fn assign_number(&mut self) -> IndexResult<Number> {
        if let Some(Reverse(number)) = self.free_numbers.pop() {
            return Ok(number);
        }
        if self.next_number > NUMBER_MAX {
            return Err(IndexErrorKind::NumbersExhausted.into());
        }
        let number = self.next_number;
        self.next_number += 1;
        Ok(number)
    }

    fn message_mut(&mut self, number: Number) -> IndexResult<&mut StoredMessage> {
        self.messages
            .get_mut(&number)
            .ok_or_else(|| IndexError::corrupted(format!("no message numbered {number}")))
    }

    fn number_of(&self, id: MessageId) -> IndexResult<Number> {
        self.id_to_number
            .get(&id)
            .copied()
            .ok_or_else(|| IndexErrorKind::MessageNotFound(id).into())
    }

    /// Index a copy of `msg`.
    ///
    /// Returns `Ok(None)` when the message is skipped as a duplicate: its id is
    /// already indexed, or (outside viewer mode) its content signature is, or
    /// (with duplicate suppression) its URL signature is.
    ///
    /// `core_words_prc` is the percentage of ranked words selected as core
    /// words, at most `max_core_words` (clamped to 255). With a zero
    /// percentage the core words carried by `msg` are kept.
    pub fn insert(
        &mut self,
        msg: &StoredMessage,
        core_words_prc: u32,
        max_core_words: usize,
    ) -> IndexResult<Option<&StoredMessage>> {
        let metrics = Arc::clone(&self.metrics);
        let _measurement = TimeMeasurement::new(metrics.as_ref(), Operation::Insert);

        if !msg.id.is_valid() {
            return Err(IndexErrorKind::InvalidMessageId(msg.id).into());
        }
        let paths = tree_paths(msg.id, &msg.categories)?;

        if self.id_to_number.contains_key(&msg.id) {
            log::debug!("message {} already indexed", msg.id);
            return Ok(None);
        }

        let viewer = self.config.viewer;
        let signature = if viewer { 0 } else { self.message_signature(msg) };
        if !viewer
            && (self.signatures.contains(&signature)
                || (self.config.suppress_duplicates
                    && self.url_signatures.contains(&msg.url_signature)))
        {
            log::debug!("message {} skipped as duplicate", msg.id);
            return Ok(None);
        }

        let max_core_words = max_core_words.min(usize::from(u8::MAX));
        let number = self.assign_number()?;
        self.id_to_number.insert(msg.id, number);

        if !viewer && !msg.lang.is_null() {
            *self.lang_info.entry(msg.lang).or_insert(0) += 1;
        }
        if !msg.event_id.is_null() {
            self.event_to_number
                .entry(msg.event_id)
                .or_default()
                .insert(number);
        }

        for (word, wp) in msg.word_positions.iter() {
            self.total_word_positions += usize::from(wp.position_count());
            self.words.entry(word.clone()).or_default().add_message(
                msg.lang,
                wp.flags & WordPositions::CAPITAL_WORD != 0,
                number,
                viewer,
            );
        }
        for (&id, wp) in msg.norm_form_positions.iter() {
            self.total_norm_form_positions += usize::from(wp.position_count());
            self.norm_forms.entry(id).or_default().add_message(
                msg.lang,
                wp.flags & WordPositions::CAPITAL_WORD != 0,
                number,
                viewer,
            );
        }
        self.total_words += msg.word_positions.len();
        self.total_norm_forms += msg.norm_form_positions.len();

        if !msg.hostname().is_empty() {
            self.sites
                .entry(msg.hostname().to_string())
                .or_default()
                .insert(number);
        }

        let mut message = msg.clone();
        message.category_paths.clear();
        self.messages.insert(number, message);
        self.add_categories(number, &paths)?;

        let mut wfi = WordsFreqInfo::default();
        if !viewer {
            if core_words_prc > 0 {
                self.mark_proper_names(number)?;
            }
            let message = self
                .messages
                .get(&number)
                .ok_or_else(|| IndexError::corrupted(format!("no message numbered {number}")))?;
            wfi = self.calc_words_freq(message, true)?;

            let message = self
                .messages
                .get_mut(&number)
                .ok_or_else(|| IndexError::corrupted(format!("no message numbered {number}")))?;
            if core_words_prc > 0 {
                select_core_words(message, &wfi.word_infos, core_words_prc, max_core_words)?;
            }
            if let Some(store) = &self.word_pairs {
                if !message.lang.is_null() && message.core_words.len() > 1 {
                    update_word_pairs(store.as_ref(), message, true);
                    if core_words_prc > 0 {
                        sort_core_words(store.as_ref(), message, &mut wfi)?;
                    }
                }
            }
        }

        if !msg.source_url().is_empty() {
            let words = if viewer {
                Vec::new()
            } else {
                wfi.word_infos
                    .iter()
                    .filter(|wi| wi.feed_countable)
                    .map(|wi| wi.pseudo_id)
                    .collect()
            };
            let feed = self.feeds.entry(msg.source_url().to_string()).or_default();
            feed.impressions += msg.impressions;
            feed.clicks += msg.clicks;
            feed.add_message(number, words);
        }

        if !viewer {
            self.signatures.insert(signature);
            if self.config.suppress_duplicates {
                self.url_signatures.insert(msg.url_signature);
            }
        }

        let level = self.config.impression_respected_level;
        let message = self.message_mut(number)?;
        if !viewer {
            if let Some(content) = &message.content {
                content.touch(now());
            }
        }
        message.search_weight = message_search_weight(message, level);
        if let Some(feed) = self.feeds.get_mut(msg.source_url()) {
            feed.calc_search_weight(level);
        }

        log::debug!("inserted message {} as number {number}", msg.id);
        Ok(self.messages.get(&number))
    }

    fn mark_proper_names(&mut self, number: Number) -> IndexResult<()> {
        let words = &self.words;
        let norm_forms = &self.norm_forms;
        let message = self
            .messages
            .get_mut(&number)
            .ok_or_else(|| IndexError::corrupted(format!("no message numbered {number}")))?;
        let lang = message.lang;

        for (word, wp) in message.word_positions.iter_mut() {
            wp.flags &= !(WordPositions::CORE_WORD | WordPositions::TOKEN_TYPE_MASK);
            let mut proper_name = wp.flags & WordPositions::SENTENCE_PROPER_NAME != 0;
            if !proper_name && wp.flags & WordPositions::CAPITAL_WORD != 0 {
                proper_name = words
                    .get(word.as_str())
                    .ok_or_else(|| IndexError::corrupted(format!("word `{word}` is not indexed")))?
                    .proper_name(lang);
            }
            if proper_name {
                wp.flags |= WordPositions::PROPER_NAME;
            } else {
                wp.flags &= !WordPositions::PROPER_NAME;
            }
            wp.set_token_type(token_type(word));
        }

        for (id, wp) in message.norm_form_positions.iter_mut() {
            wp.flags &= !WordPositions::CORE_WORD;
            let mut proper_name = wp.flags & WordPositions::SENTENCE_PROPER_NAME != 0;
            if !proper_name && wp.flags & WordPositions::CAPITAL_WORD != 0 {
                proper_name = norm_forms
                    .get(id)
                    .ok_or_else(|| IndexError::corrupted(format!("normal form {id} is not indexed")))?
                    .proper_name(lang);
            }
            if proper_name {
                wp.flags |= WordPositions::PROPER_NAME;
            } else {
                wp.flags &= !WordPositions::PROPER_NAME;
            }
        }
        Ok(())
    }

    fn add_categories(&mut self, number: Number, paths: &BTreeSet<String>) -> IndexResult<()> {
        let message = self
            .messages
            .get_mut(&number)
            .ok_or_else(|| IndexError::corrupted(format!("no message numbered {number}")))?;
        for path in paths {
            self.root_category.insert(path, number)?;
        }
        let expanded = category_paths(&message.categories);
        for path in &expanded {
            self.category_counter
                .increment(message.lang, message.country, path);
        }
        message.category_paths = expanded;
        Ok(())
    }

    fn remove_categories(&mut self, number: Number) -> IndexResult<()> {
        let message = self
            .messages
            .get_mut(&number)
            .ok_or_else(|| IndexError::corrupted(format!("no message numbered {number}")))?;
        let paths = tree_paths(message.id, &message.categories)?;
        for path in &paths {
            self.root_category.remove(path, number)?;
        }
        for path in &message.category_paths {
            self.category_counter
                .decrement(message.lang, message.country, path)?;
        }
        message.category_paths.clear();
        Ok(())
    }

    /// Remove message `id` and return it; `Ok(None)` if it is not indexed.
    pub fn remove(&mut self, id: MessageId) -> IndexResult<Option<StoredMessage>> {
        let metrics = Arc::clone(&self.metrics);
        let _measurement = TimeMeasurement::new(metrics.as_ref(), Operation::Remove);

        let Some(number) = self.id_to_number.remove(&id) else {
            log::debug!("message {id} not indexed, nothing to remove");
            return Ok(None);
        };
        self.free_numbers.push(Reverse(number));

        self.remove_categories(number)?;
        let msg = self
            .messages
            .remove(&number)
            .ok_or_else(|| IndexError::corrupted(format!("no message numbered {number}")))?;
        let viewer = self.config.viewer;

        if !viewer && !msg.lang.is_null() {
            if let Some(store) = &self.word_pairs {
                update_word_pairs(store.as_ref(), &msg, false);
            }
            let count = self.lang_info.get_mut(&msg.lang).ok_or_else(|| {
                IndexError::corrupted(format!("no message count for {}", msg.lang))
            })?;
            *count -= 1;
            if *count == 0 {
                self.lang_info.remove(&msg.lang);
            }
        }

        if !msg.source_url().is_empty() {
            let feed = self.feeds.get_mut(msg.source_url()).ok_or_else(|| {
                IndexError::corrupted(format!("no feed for {}", msg.source_url()))
            })?;
            feed.impressions = feed
                .impressions
                .checked_sub(msg.impressions)
                .ok_or_else(|| IndexError::corrupted("feed impressions underflow"))?;
            feed.clicks = feed
                .clicks
                .checked_sub(msg.clicks)
                .ok_or_else(|| IndexError::corrupted("feed clicks underflow"))?;
            feed.remove_message(number)?;
            if feed.messages.is_empty() {
                self.feeds.remove(msg.source_url());
            } else {
                feed.calc_search_weight(self.config.impression_respected_level);
            }
        }

        if !msg.event_id.is_null() {
            self.remove_from_event(msg.event_id, number)?;
        }

        if !viewer {
            let signature = self.message_signature(&msg);
            self.signatures.remove(&signature);
            if self.config.suppress_duplicates {
                self.url_signatures.remove(&msg.url_signature);
            }
        }

        for (word, wp) in msg.word_positions.iter() {
            let word_messages = self
                .words
                .get_mut(word.as_str())
                .ok_or_else(|| IndexError::corrupted(format!("word `{word}` is not indexed")))?;
            word_messages.remove_message(
                msg.lang,
                wp.flags & WordPositions::CAPITAL_WORD != 0,
                number,
            )?;
            if word_messages.is_empty() {
                self.words.remove(word.as_str());
            }
            self.total_word_positions -= usize::from(wp.position_count());
        }
        for (id, wp) in msg.norm_form_positions.iter() {
            let word_messages = self
                .norm_forms
                .get_mut(id)
                .ok_or_else(|| IndexError::corrupted(format!("normal form {id} is not indexed")))?;
            word_messages.remove_message(
                msg.lang,
                wp.flags & WordPositions::CAPITAL_WORD != 0,
                number,
            )?;
            if word_messages.is_empty() {
                self.norm_forms.remove(id);
            }
            self.total_norm_form_positions -= usize::from(wp.position_count());
        }
        self.total_words -= msg.word_positions.len();
        self.total_norm_forms -= msg.norm_form_positions.len();

        if !msg.hostname().is_empty() {
            let site = self.sites.get_mut(msg.hostname()).ok_or_else(|| {
                IndexError::corrupted(format!("no site for {}", msg.hostname()))
            })?;
            site.remove(&number);
            if site.is_empty() {
                self.sites.remove(msg.hostname());
            }
        }

        log::debug!("removed message {id} numbered {number}");
        Ok(Some(msg))
    }

    fn remove_from_event(&mut self, event_id: EventId, number: Number) -> IndexResult<()> {
        let numbers = self
            .event_to_number
            .get_mut(&event_id)
            .ok_or_else(|| IndexError::corrupted(format!("no event {}", event_id.0)))?;
        numbers.remove(&number);
        if numbers.is_empty() {
            self.event_to_number.remove(&event_id);
        }
        Ok(())
    }

    /// Move message `id` into event `event_id`; a null event ungroups it.
    pub fn set_event_id(&mut self, id: MessageId, event_id: EventId) -> IndexResult<()> {
        let number = self.number_of(id)?;
        let message = self.message_mut(number)?;
        let previous = std::mem::replace(&mut message.event_id, event_id);
        if previous == event_id {
            return Ok(());
        }
        if !previous.is_null() {
            self.remove_from_event(previous, number)?;
        }
        if !event_id.is_null() {
            self.event_to_number
                .entry(event_id)
                .or_default()
                .insert(number);
        }
        Ok(())
    }

    /// Replace the categories of message `id`.
    pub fn set_categories(&mut self, id: MessageId, categories: Vec<String>) -> IndexResult<()> {
        let number = self.number_of(id)?;
        let paths = tree_paths(id, &categories)?;
        self.remove_categories(number)?;
        self.message_mut(number)?.categories = categories;
        self.add_categories(number, &paths)
    }

    /// Add one category to message `id`; a category it already has is ignored.
    pub fn add_category(&mut self, id: MessageId, category: &str) -> IndexResult<()> {
        let number = self.number_of(id)?;
        let message = self.message_mut(number)?;
        if message.categories.iter().any(|c| c == category) {
            return Ok(());
        }
        let mut categories = message.categories.clone();
        categories.push(category.to_string());
        self.set_categories(id, categories)
    }

    /// Set the impressions of message `id`, updating its feed totals and weights.
    pub fn set_impressions(&mut self, id: MessageId, impressions: u64) -> IndexResult<()> {
        self.update_counters(id, |msg| &mut msg.impressions, |feed| &mut feed.impressions, impressions)
    }

    /// Set the clicks of message `id`, updating its feed totals and weights.
    pub fn set_clicks(&mut self, id: MessageId, clicks: u64) -> IndexResult<()> {
        self.update_counters(id, |msg| &mut msg.clicks, |feed| &mut feed.clicks, clicks)
    }

    fn update_counters(
        &mut self,
        id: MessageId,
        message_counter: fn(&mut StoredMessage) -> &mut u64,
        feed_counter: fn(&mut FeedInfo) -> &mut u64,
        value: u64,
    ) -> IndexResult<()> {
        let number = self.number_of(id)?;
        let level = self.config.impression_respected_level;
        let message = self
            .messages
            .get_mut(&number)
            .ok_or_else(|| IndexError::corrupted(format!("no message numbered {number}")))?;
        let previous = std::mem::replace(message_counter(message), value);
        message.search_weight = message_search_weight(message, level);

        if !message.source_url().is_empty() {
            let feed = self.feeds.get_mut(message.source_url()).ok_or_else(|| {
                IndexError::corrupted(format!("no feed for {}", message.source_url()))
            })?;
            let total = feed_counter(feed);
            *total = total
                .checked_sub(previous)
                .ok_or_else(|| IndexError::corrupted("feed counter underflow"))?
                + value;
            feed.calc_search_weight(level);
        }
        Ok(())
    }

    /// Indexed message with the given id.
    pub fn find(&self, id: MessageId) -> Option<&StoredMessage> {
        self.id_to_number
            .get(&id)
            .and_then(|number| self.messages.get(number))
    }

    /// Number assigned to message `id`.
    pub fn number(&self, id: MessageId) -> Option<Number> {
        self.id_to_number.get(&id).copied()
    }

    /// Indexed message with the given number.
    pub fn message_by_number(&self, number: Number) -> Option<&StoredMessage> {
        self.messages.get(&number)
    }

    /// Category node at `path`, e.g. `"World/Europe/"`; `""` is the root.
    pub fn find_category(&self, path: &str) -> Option<&Category> {
        let path = path.strip_prefix('/').unwrap_or(path).to_lowercase();
        self.root_category.find(&path)
    }

    /// Root of the category trie.
    pub fn root_category(&self) -> &Category {
        &self.root_category
    }

    /// Messages of `lang`/`country` under category path `path` (e.g. `"/world/"`).
    /// Null language or country match any.
    pub fn category_message_count(&self, lang: Lang, country: Country, path: &str) -> u32 {
        self.category_counter.count(lang, country, path)
    }

    /// Messages from host `hostname`.
    pub fn site_messages(&self, hostname: &str) -> Option<&HashSet<Number>> {
        self.sites.get(hostname)
    }

    /// Aggregate of the feed at `source_url`.
    pub fn feed(&self, source_url: &str) -> Option<&FeedInfo> {
        self.feeds.get(source_url)
    }

    /// Search weight of the feed `msg` came from.
    pub fn feed_search_weight(&self, msg: &StoredMessage) -> Option<u32> {
        self.feeds.get(msg.source_url()).map(|feed| feed.search_weight)
    }

    /// Messages grouped into `event_id`.
    pub fn event_messages(&self, event_id: EventId) -> Option<&HashSet<Number>> {
        self.event_to_number.get(&event_id)
    }

    /// Messages containing lower-cased `word`.
    pub fn word_messages(&self, word: &str) -> Option<&WordMessages> {
        self.words.get(word)
    }

    /// Messages containing normal form `id`.
    pub fn norm_form_messages(&self, id: WordId) -> Option<&WordMessages> {
        self.norm_forms.get(&id)
    }

    /// Messages of `lang`; all messages for a null language.
    pub fn lang_message_count(&self, lang: Lang) -> usize {
        if lang.is_null() {
            self.messages.len()
        } else {
            self.lang_info.get(&lang).copied().unwrap_or(0)
        }
    }

    /// Current sizes.
    pub fn stats(&self) -> MapStats {
        MapStats {
            messages: self.messages.len(),
            words: self.words.len(),
            norm_forms: self.norm_forms.len(),
            total_words: self.total_words,
            total_norm_forms: self.total_norm_forms,
            total_word_positions: self.total_word_positions,
            total_norm_form_positions: self.total_norm_form_positions,
            sites: self.sites.len(),
            feeds: self.feeds.len(),
            events: self.event_to_number.len(),
            languages: self.lang_info.len(),
            categories: count_nodes(&self.root_category),
            free_numbers: self.free_numbers.len(),
        }
    }

    /// Verify that every derived structure agrees with the indexed messages.
    pub fn check_consistency(&self) -> IndexResult<()> {
        let fail = |what: String| Err(IndexError::corrupted(what));
        let messages = self.messages.len();

        if self.id_to_number.len() != messages {
            return fail(format!(
                "{} ids for {messages} messages",
                self.id_to_number.len()
            ));
        }
        if let Some((id, _)) = self
            .id_to_number
            .iter()
            .find(|&(id, &number)| self.messages.get(&number).map(|m| m.id) != Some(*id))
        {
            return fail(format!("id {id} maps to a foreign message"));
        }
        if self.event_to_number.len() > messages {
            return fail(format!(
                "{} events for {messages} messages",
                self.event_to_number.len()
            ));
        }
        for (event, numbers) in &self.event_to_number {
            if numbers.is_empty() || numbers.iter().any(|n| !self.messages.contains_key(n)) {
                return fail(format!("event {} lists unknown messages", event.0));
            }
        }
        if !self.config.viewer {
            if self.signatures.len() != messages {
                return fail(format!(
                    "{} signatures for {messages} messages",
                    self.signatures.len()
                ));
            }
            if self.config.suppress_duplicates && self.url_signatures.len() != messages {
                return fail(format!(
                    "{} url signatures for {messages} messages",
                    self.url_signatures.len()
                ));
            }
        }

        let with_host = self
            .messages
            .values()
            .filter(|m| !m.hostname().is_empty())
            .count();
        let site_total: usize = self.sites.values().map(HashSet::len).sum();
        if site_total != with_host {
            return fail(format!("{site_total} site entries for {with_host} messages"));
        }

        let with_feed = self
            .messages
            .values()
            .filter(|m| !m.source_url().is_empty())
            .count();
        let feed_total: usize = self.feeds.values().map(FeedInfo::message_count).sum();
        if feed_total != with_feed {
            return fail(format!("{feed_total} feed entries for {with_feed} messages"));
        }

        let word_total: usize = self.words.values().map(WordMessages::len).sum();
        if word_total != self.total_words {
            return fail(format!(
                "{word_total} word entries, {} expected",
                self.total_words
            ));
        }
        let form_total: usize = self.norm_forms.values().map(WordMessages::len).sum();
        if form_total != self.total_norm_forms {
            return fail(format!(
                "{form_total} normal form entries, {} expected",
                self.total_norm_forms
            ));
        }

        if self.root_category.messages().len() > messages {
            return fail("category root lists unknown messages".to_string());
        }
        Ok(())
    }

    /// Write the map statistics to `out`, then verify consistency.
    pub fn dump(&self, out: &mut impl Write) -> IndexResult<()> {
        write!(out, "{}", self.stats())?;
        self.check_consistency()
    }
}
