//! Per-message positional word storage.
//!
//! Every distinct word (and normal form) of a message owns a [`WordPositions`]
//! record: flags, a language and an `(offset, count)` slice into one flat
//! position array shared by the whole message.

use std::borrow::Borrow;
use std::ops::Range;

use crate::locale::Lang;

/// Position of a word inside a message.
pub type WordPosition = u16;

/// Largest position a message can address; also "end of text" for assembly windows.
pub const WORD_POSITION_MAX: WordPosition = WordPosition::MAX;

/// Morphological normal form id, or a pseudo id for words unknown to the dictionary.
pub type WordId = u32;

/// Classification of a token.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TokenType {
    /// Not classified.
    #[default]
    Undefined = 0,
    /// Letters only.
    Word = 1,
    /// Digits and number punctuation.
    Number = 2,
    /// Mix of letters and digits.
    Surrogate = 3,
    /// Word present in almost every message of its feed.
    FeedStopWord = 0xD,
    /// Word known to the dictionary.
    KnownWord = 0xE,
    /// Dictionary stop word.
    StopWord = 0xF,
}

impl TokenType {
    /// Decode a 4-bit token type tag. Unknown tags decode as [`TokenType::Undefined`].
    pub fn from_bits(bits: u16) -> Self {
        match bits {
            1 => TokenType::Word,
            2 => TokenType::Number,
            3 => TokenType::Surrogate,
            0xD => TokenType::FeedStopWord,
            0xE => TokenType::KnownWord,
            0xF => TokenType::StopWord,
            _ => TokenType::Undefined,
        }
    }

    /// Index into the weighting tables.
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Flags, language and position slice of one word within one message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WordPositions {
    /// Location, capitalization, core word, token type and proper name bits.
    pub flags: u16,
    /// Language of the word.
    pub lang: Lang,
    offset: u16,
    count: u16,
}

impl WordPositions {
    /// Word occurs in the title.
    pub const TITLE: u16 = 0x1;
    /// Word occurs in the description.
    pub const DESC: u16 = 0x2;
    /// Word occurs in an image alt text.
    pub const ALT: u16 = 0x4;
    /// All location bits.
    pub const LOCATION_MASK: u16 = Self::TITLE | Self::DESC | Self::ALT;
    /// Word was selected as a core word.
    pub const CORE_WORD: u16 = 0x20;
    /// Every occurrence of the word is capitalized.
    pub const CAPITAL_WORD: u16 = 0x40;
    /// Token type bits.
    pub const TOKEN_TYPE_MASK: u16 = 0x780;
    const TOKEN_TYPE_SHIFT: u16 = 7;
    /// Word is a proper name according to corpus statistics.
    pub const PROPER_NAME: u16 = 0x800;
    /// Word is capitalized somewhere other than at a sentence start.
    pub const SENTENCE_PROPER_NAME: u16 = 0x1000;

    /// Positions record referring to `positions[offset..offset + count]`.
    pub fn new(flags: u16, lang: Lang, offset: u16, count: u16) -> Self {
        WordPositions {
            flags,
            lang,
            offset,
            count,
        }
    }

    /// First index of the slice in the shared position array.
    pub fn offset(&self) -> u16 {
        self.offset
    }

    /// Number of positions.
    pub fn position_count(&self) -> u16 {
        self.count
    }

    /// Index range into the shared position array.
    pub fn range(&self) -> Range<usize> {
        let start = usize::from(self.offset);
        start..start + usize::from(self.count)
    }

    /// Resolve the positions of this word.
    ///
    /// Returns an empty slice if the record does not fit into `positions`.
    pub fn positions<'a>(&self, positions: &'a [WordPosition]) -> &'a [WordPosition] {
        positions.get(self.range()).unwrap_or(&[])
    }

    /// Token type stored in the flags.
    pub fn token_type(&self) -> TokenType {
        TokenType::from_bits((self.flags & Self::TOKEN_TYPE_MASK) >> Self::TOKEN_TYPE_SHIFT)
    }

    /// Replace the token type stored in the flags.
    pub fn set_token_type(&mut self, token_type: TokenType) {
        self.flags = (self.flags & !Self::TOKEN_TYPE_MASK)
            | ((token_type as u16) << Self::TOKEN_TYPE_SHIFT);
    }

    /// Whether the word was selected as a core word.
    pub fn is_core(&self) -> bool {
        self.flags & Self::CORE_WORD != 0
    }
}

/// Sorted map from a key (word text or normal form id) to its [`WordPositions`].
///
/// Kept as a sorted vector: messages carry a few hundred entries at most and
/// the order doubles as the serialization order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WordPositionMap<K> {
    entries: Vec<(K, WordPositions)>,
}

impl<K> Default for WordPositionMap<K> {
    fn default() -> Self {
        WordPositionMap {
            entries: Vec::new(),
        }
    }
}

impl<K: Ord> WordPositionMap<K> {
    /// Empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn search<Q>(&self, key: &Q) -> Result<usize, usize>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.entries.binary_search_by(|(k, _)| k.borrow().cmp(key))
    }

    /// Look up the record of `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<&WordPositions>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.search(key).ok().map(|i| &self.entries[i].1)
    }

    /// Look up the record of `key` for modification.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut WordPositions>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match self.search(key) {
            Ok(i) => Some(&mut self.entries[i].1),
            Err(_) => None,
        }
    }

    /// Insert or replace the record of `key`.
    pub fn insert(&mut self, key: K, value: WordPositions) {
        match self.search(&key) {
            Ok(i) => self.entries[i].1 = value,
            Err(i) => self.entries.insert(i, (key, value)),
        }
    }

    /// Iterate in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &WordPositions)> + '_ {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Iterate in key order with mutable records.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&K, &mut WordPositions)> + '_ {
        self.entries.iter_mut().map(|(k, v)| (&*k, v))
    }

    /// Iterate over the records only.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut WordPositions> + '_ {
        self.entries.iter_mut().map(|(_, v)| v)
    }
}

impl<K: Ord> FromIterator<(K, WordPositions)> for WordPositionMap<K> {
    fn from_iter<I: IntoIterator<Item = (K, WordPositions)>>(iter: I) -> Self {
        let mut entries: Vec<_> = iter.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries.dedup_by(|a, b| a.0 == b.0);
        WordPositionMap { entries }
    }
}

/// Word text to positions.
pub type MessageWordPositions = WordPositionMap<String>;

/// Normal form id to positions.
pub type NormFormPositions = WordPositionMap<WordId>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_type_bits() {
        let mut wp = WordPositions::new(WordPositions::TITLE | WordPositions::CAPITAL_WORD, Lang::NULL, 0, 0);
        assert_eq!(wp.token_type(), TokenType::Undefined);
        wp.set_token_type(TokenType::KnownWord);
        assert_eq!(wp.token_type(), TokenType::KnownWord);
        assert_eq!(wp.flags & WordPositions::TOKEN_TYPE_MASK, 0x700);
        wp.set_token_type(TokenType::Number);
        assert_eq!(wp.token_type(), TokenType::Number);
        assert_eq!(
            wp.flags & !WordPositions::TOKEN_TYPE_MASK,
            WordPositions::TITLE | WordPositions::CAPITAL_WORD
        );
    }

    #[test]
    fn test_slices_resolve_into_shared_array() {
        let positions = [0, 4, 1, 2, 3];
        let first = WordPositions::new(0, Lang::NULL, 0, 2);
        let second = WordPositions::new(0, Lang::NULL, 2, 3);
        assert_eq!(first.positions(&positions), &[0, 4]);
        assert_eq!(second.positions(&positions), &[1, 2, 3]);
        let broken = WordPositions::new(0, Lang::NULL, 4, 3);
        assert!(broken.positions(&positions).is_empty());
    }

    #[test]
    fn test_map_stays_sorted() {
        let mut map = MessageWordPositions::new();
        for word in ["pear", "apple", "zebra", "kiwi"] {
            map.insert(word.to_string(), WordPositions::default());
        }
        let keys: Vec<_> = map.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["apple", "kiwi", "pear", "zebra"]);
        assert!(map.get("kiwi").is_some());
        assert!(map.get("plum").is_none());
        map.get_mut("pear").unwrap().flags = WordPositions::DESC;
        assert_eq!(map.get("pear").unwrap().flags, WordPositions::DESC);
    }
}
