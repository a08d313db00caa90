//! Splitting raw text into indexed words and the complements needed to rebuild it.

use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};

use xxhash_rust::xxh3::Xxh3;

use crate::chars::{self, END_OF_SENTENCE, STOP, WORD_EDGE};
use crate::error::{IndexErrorKind, IndexResult};
use crate::positions::{MessageWordPositions, WordPosition, WordPositions, WORD_POSITION_MAX};

/// Content signature used for duplicate detection.
pub type Signature = u64;

/// Character offsets of whitespace an external segmenter inserted between words.
pub type SegmentationMarkers = BTreeSet<usize>;

/// Role of a non-indexed text fragment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ComplementType {
    /// Never filled in; not stored.
    #[default]
    Undefined = 0,
    /// Punctuation standing on its own.
    Standalone = 1,
    /// Original spelling of an indexed (lower-cased) word.
    Replacement = 2,
    /// Text glued to the front of the following word.
    Prefix = 3,
    /// Text glued to the end of the preceding word.
    Suffix = 4,
    /// Soft break: the words around it are written without a space.
    Segmentation = 5,
}

impl ComplementType {
    /// Decode a serialized tag.
    pub fn from_u8(tag: u8) -> Option<Self> {
        Some(match tag {
            0 => ComplementType::Undefined,
            1 => ComplementType::Standalone,
            2 => ComplementType::Replacement,
            3 => ComplementType::Prefix,
            4 => ComplementType::Suffix,
            5 => ComplementType::Segmentation,
            _ => return None,
        })
    }
}

/// A text fragment attached to a word position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WordComplement {
    /// Position of the word the fragment belongs to.
    pub position: WordPosition,
    /// How the fragment is spliced in.
    pub kind: ComplementType,
    /// Literal text; empty for segmentation markers.
    pub text: String,
}

#[derive(Debug)]
struct PendingComplement {
    position: u32,
    kind: ComplementType,
    text: String,
}

impl PendingComplement {
    fn new(position: u32) -> Self {
        PendingComplement {
            position,
            kind: ComplementType::Undefined,
            text: String::new(),
        }
    }
}

#[derive(Debug)]
struct ScratchWord {
    positions: Vec<u32>,
    flags: u16,
}

/// Running checksum over lower-cased words.
#[derive(Default)]
pub struct SignatureBuilder {
    hasher: Xxh3,
    fed: bool,
}

impl SignatureBuilder {
    /// Start an empty checksum.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold bytes into the checksum.
    pub fn update(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
        self.fed = true;
    }

    /// Throw away everything folded so far.
    pub fn restart(&mut self) {
        self.hasher.reset();
        self.fed = false;
    }

    /// Current value; zero if nothing was folded in.
    pub fn finish(&self) -> Signature {
        if self.fed {
            self.hasher.digest()
        } else {
            0
        }
    }
}

/// Result of tokenizing every section of a message.
#[derive(Debug, Default)]
pub struct TokenizedText {
    /// Distinct lower-cased words with their slices into `positions`.
    pub word_positions: MessageWordPositions,
    /// Flat position array.
    pub positions: Vec<WordPosition>,
    /// Complements in creation order, which is position order.
    pub complements: Vec<WordComplement>,
}

/// Accumulates words and complements over consecutive sections of one message.
///
/// Positions keep growing across [`Tokenizer::parse_text`] calls so every
/// section occupies its own position range.
#[derive(Debug, Default)]
pub struct Tokenizer {
    position: u32,
    words: HashMap<String, ScratchWord>,
    complements: Vec<PendingComplement>,
}

impl Tokenizer {
    /// Tokenizer starting at position 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// The next free position.
    pub fn position(&self) -> u32 {
        self.position
    }

    /// Leave one position unused, separating sections.
    pub fn skip_position(&mut self) {
        self.position += 1;
    }

    /// Number of distinct words seen so far.
    pub fn distinct_words(&self) -> usize {
        self.words.len()
    }

    /// Tokenize `text`, tagging its words with `flags`.
    ///
    /// Words are folded into `signature` when one is given. `segmentation`
    /// holds character offsets of whitespace that must be rebuilt as a soft break.
    pub fn parse_text(
        &mut self,
        text: &str,
        flags: u16,
        mut signature: Option<&mut SignatureBuilder>,
        segmentation: Option<&SegmentationMarkers>,
    ) {
        let text: Vec<char> = text.chars().collect();
        let mut word = Vec::new();
        let mut end_of_sentence = true;

        for (i, &ch) in text.iter().enumerate() {
            if !chars::is_space(ch) {
                word.push(ch);
                continue;
            }

            self.push_word(&mut word, flags, &mut end_of_sentence, signature.as_deref_mut());

            if segmentation.is_some_and(|markers| markers.contains(&i))
                && self.can_segment(&text, i)
            {
                self.complements.push(PendingComplement {
                    position: self.position,
                    kind: ComplementType::Segmentation,
                    text: String::new(),
                });
            }
        }

        self.push_word(&mut word, flags, &mut end_of_sentence, signature);
    }

    fn can_segment(&self, text: &[char], i: usize) -> bool {
        if let Some(last) = self.complements.last() {
            if last.position == self.position && last.kind == ComplementType::Segmentation {
                return false;
            }
        }
        i > 0 && i + 1 < text.len() && !chars::is_space(text[i - 1]) && !chars::is_space(text[i + 1])
    }

    fn add_complement(&mut self, complement: &mut PendingComplement) {
        if complement.kind != ComplementType::Undefined {
            self.complements.push(PendingComplement {
                position: complement.position,
                kind: complement.kind,
                text: std::mem::take(&mut complement.text),
            });
        }
        complement.kind = ComplementType::Undefined;
        complement.text.clear();
    }

    fn push_word(
        &mut self,
        word: &mut Vec<char>,
        flags: u16,
        end_of_sentence: &mut bool,
        signature: Option<&mut SignatureBuilder>,
    ) {
        if word.is_empty() {
            return;
        }
        for ch in word.iter_mut() {
            *ch = chars::normalize_quote(*ch);
        }

        let mut chars: &[char] = &word[..];
        let is_edge = |ch: &&char| chars::category(**ch) & WORD_EDGE != 0;

        let start = chars.iter().take_while(is_edge).count();
        let (stops, eos) = scan_edge(&chars[..start]);
        if stops {
            self.position += 1;
        }

        let mut complement = PendingComplement::new(self.position);

        if start > 0 {
            complement.kind = ComplementType::Standalone;
            complement.text = chars[..start].iter().collect();
            chars = &chars[start..];

            if chars.is_empty() {
                self.add_complement(&mut complement);
                if eos {
                    *end_of_sentence = true;
                }
                word.clear();
                return;
            }

            complement.kind = ComplementType::Prefix;
        }

        // The leading scan stopped on a non-edge character, so the core is never empty.
        let end = chars.len() - chars.iter().rev().take_while(is_edge).count();
        let (trailing_stops, eos) = scan_edge(&chars[end..]);

        if end < chars.len() {
            self.add_complement(&mut complement);
            complement.kind = ComplementType::Suffix;
            complement.text = chars[end..].iter().collect();
            chars = &chars[..end];
        }

        let text: String = chars.iter().collect();
        let lower = text.to_lowercase();

        let mut word_flags = flags;
        if text.chars().next() != lower.chars().next() {
            word_flags |= WordPositions::CAPITAL_WORD;
            if !*end_of_sentence {
                word_flags |= WordPositions::SENTENCE_PROPER_NAME;
            }
        }
        *end_of_sentence = eos;

        if lower != text {
            if complement.kind == ComplementType::Suffix {
                let mut replacement = PendingComplement {
                    position: complement.position,
                    kind: ComplementType::Replacement,
                    text,
                };
                self.add_complement(&mut replacement);
                self.add_complement(&mut complement);
            } else {
                self.add_complement(&mut complement);
                complement.kind = ComplementType::Replacement;
                complement.text = text;
                self.add_complement(&mut complement);
            }
        }
        self.add_complement(&mut complement);

        if let Some(signature) = signature {
            signature.update(lower.as_bytes());
            signature.update(b" ");
        }

        let position = self.position;
        self.position += 1;

        match self.words.entry(lower) {
            Entry::Vacant(entry) => {
                entry.insert(ScratchWord {
                    positions: vec![position],
                    flags: word_flags,
                });
            }
            Entry::Occupied(entry) => {
                let scratch = entry.into_mut();
                scratch.positions.push(position);

                let reset = word_flags & WordPositions::CAPITAL_WORD == 0
                    || scratch.flags & WordPositions::CAPITAL_WORD == 0;
                scratch.flags |= word_flags;
                if reset {
                    scratch.flags &= !WordPositions::CAPITAL_WORD;
                }
                if scratch.flags & WordPositions::CAPITAL_WORD == 0 {
                    scratch.flags &= !WordPositions::SENTENCE_PROPER_NAME;
                }
            }
        }

        if trailing_stops {
            self.position += 1;
        }
        word.clear();
    }

    /// Flatten the scratch words into one position array.
    ///
    /// Fails when the text used more positions than a [`WordPosition`] can hold.
    pub fn finish(self) -> IndexResult<TokenizedText> {
        if self.position > u32::from(WORD_POSITION_MAX) {
            return Err(IndexErrorKind::PositionLimitExceeded.into());
        }

        let mut words: Vec<_> = self.words.into_iter().collect();
        words.sort_by(|a, b| a.0.cmp(&b.0));

        let mut positions = Vec::new();
        let mut word_positions = Vec::with_capacity(words.len());
        for (word, scratch) in words {
            let offset = to_position(positions.len())?;
            let count = to_position(scratch.positions.len())?;
            for position in scratch.positions {
                positions.push(to_position(position as usize)?);
            }
            word_positions.push((
                word,
                WordPositions::new(scratch.flags, Default::default(), offset, count),
            ));
        }

        let complements = self
            .complements
            .into_iter()
            .map(|c| {
                Ok(WordComplement {
                    position: to_position(c.position as usize)?,
                    kind: c.kind,
                    text: c.text,
                })
            })
            .collect::<IndexResult<Vec<_>>>()?;

        log::trace!(
            "tokenized {} distinct words, {} positions, {} complements",
            word_positions.len(),
            positions.len(),
            complements.len()
        );

        Ok(TokenizedText {
            word_positions: word_positions.into_iter().collect(),
            positions,
            complements,
        })
    }
}

fn scan_edge(edge: &[char]) -> (bool, bool) {
    edge.iter().fold((false, false), |(stops, eos), &ch| {
        let category = chars::category(ch);
        (stops || category & STOP != 0, eos || category & END_OF_SENTENCE != 0)
    })
}

pub(crate) fn to_position(value: usize) -> IndexResult<WordPosition> {
    WordPosition::try_from(value).map_err(|_| IndexErrorKind::PositionLimitExceeded.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(text: &str) -> TokenizedText {
        let mut tokenizer = Tokenizer::new();
        tokenizer.parse_text(text, WordPositions::TITLE, None, None);
        tokenizer.finish().unwrap()
    }

    fn positions_of(t: &TokenizedText, word: &str) -> Vec<WordPosition> {
        t.word_positions.get(word).unwrap().positions(&t.positions).to_vec()
    }

    #[test]
    fn test_words_lowercased_with_positions() {
        let t = tokenize("the cat saw the dog");
        assert_eq!(t.word_positions.len(), 4);
        assert_eq!(positions_of(&t, "the"), [0, 3]);
        assert_eq!(positions_of(&t, "dog"), [4]);
        assert!(t.complements.is_empty());
    }

    #[test]
    fn test_stops_leave_a_gap() {
        let t = tokenize("one, two. three");
        assert_eq!(positions_of(&t, "one"), [0]);
        assert_eq!(positions_of(&t, "two"), [2]);
        assert_eq!(positions_of(&t, "three"), [4]);
        let kinds: Vec<_> = t.complements.iter().map(|c| (c.position, c.kind, c.text.as_str())).collect();
        assert_eq!(
            kinds,
            [(0, ComplementType::Suffix, ","), (2, ComplementType::Suffix, ".")]
        );
    }

    #[test]
    fn test_capitalization_lost_when_any_occurrence_is_lowercase() {
        let t = tokenize("He said Apple and apple and Apple");
        let apple = t.word_positions.get("apple").unwrap();
        assert_eq!(apple.flags & WordPositions::CAPITAL_WORD, 0);
        assert_eq!(apple.flags & WordPositions::SENTENCE_PROPER_NAME, 0);
        assert_eq!(apple.flags & WordPositions::TITLE, WordPositions::TITLE);
    }

    #[test]
    fn test_sentence_start_is_not_a_proper_name() {
        let t = tokenize("Rain fell on Paris. Rain stopped");
        let rain = t.word_positions.get("rain").unwrap();
        assert_ne!(rain.flags & WordPositions::CAPITAL_WORD, 0);
        assert_eq!(rain.flags & WordPositions::SENTENCE_PROPER_NAME, 0);
        let paris = t.word_positions.get("paris").unwrap();
        assert_ne!(paris.flags & WordPositions::SENTENCE_PROPER_NAME, 0);
    }

    #[test]
    fn test_prefix_replacement_suffix_order() {
        let t = tokenize("(Hello)");
        let kinds: Vec<_> = t.complements.iter().map(|c| (c.kind, c.text.as_str())).collect();
        assert_eq!(
            kinds,
            [
                (ComplementType::Prefix, "("),
                (ComplementType::Replacement, "Hello"),
                (ComplementType::Suffix, ")"),
            ]
        );
        assert!(t.complements.iter().all(|c| c.position == 0));
    }

    #[test]
    fn test_standalone_punctuation() {
        let t = tokenize("a - b");
        assert_eq!(positions_of(&t, "b"), [2]);
        assert_eq!(t.complements.len(), 1);
        assert_eq!(t.complements[0].kind, ComplementType::Standalone);
        assert_eq!(t.complements[0].position, 2);
    }

    #[test]
    fn test_segmentation_markers() {
        let mut tokenizer = Tokenizer::new();
        let markers: SegmentationMarkers = [2, 5, 8].into_iter().collect();
        // offsets 2 and 5 are inner spaces; 8 is the double space
        tokenizer.parse_text("ab cd ef  gh", 0, None, Some(&markers));
        let t = tokenizer.finish().unwrap();
        let segs: Vec<_> = t
            .complements
            .iter()
            .filter(|c| c.kind == ComplementType::Segmentation)
            .map(|c| c.position)
            .collect();
        assert_eq!(segs, [1, 2]);
    }

    #[test]
    fn test_signature_depends_on_words() {
        let sign = |text: &str| {
            let mut tokenizer = Tokenizer::new();
            let mut signature = SignatureBuilder::new();
            tokenizer.parse_text(text, 0, Some(&mut signature), None);
            signature.finish()
        };
        assert_eq!(sign("Big News"), sign("big news"));
        assert_ne!(sign("big news"), sign("big views"));
        assert_eq!(sign(""), 0);
    }
}
