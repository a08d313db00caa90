//! The morphology collaborator: normal forms, stop words, token classes.

use std::collections::HashMap;

use crate::locale::Lang;
use crate::positions::{TokenType, WordId};

/// One normal form a word may stand for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WordForm {
    /// Normal form id.
    pub id: WordId,
    /// Language the form belongs to.
    pub lang: Lang,
    /// Whether the form is a stop word in its language.
    pub is_stop_word: bool,
}

/// Normalization result for one word.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WordNormalization {
    /// Detected language of the word.
    pub lang: Lang,
    /// Candidate normal forms, possibly none.
    pub forms: Vec<WordForm>,
}

/// Source of normal forms.
pub trait Morphology {
    /// Normalize `words` written in `lang`; returns one entry per word, in order.
    fn normalize(&self, words: &[&str], lang: Lang) -> Vec<WordNormalization>;
}

/// Classify a word by the characters it is made of.
pub fn token_type(word: &str) -> TokenType {
    let mut letters = false;
    let mut digits = false;
    let mut other = false;
    for ch in word.chars() {
        if ch.is_alphabetic() {
            letters = true;
        } else if ch.is_numeric() {
            digits = true;
        } else if !matches!(ch, '\'' | '-' | '.' | ',' | ':' | '/') {
            other = true;
        }
    }
    match (letters, digits, other) {
        (true, false, false) => TokenType::Word,
        (false, true, false) => TokenType::Number,
        (true, true, false) => TokenType::Surrogate,
        _ => TokenType::Undefined,
    }
}

/// Stable id for a word that has no dictionary normal form.
///
/// Pseudo ids always have the top bit set, so they are never zero.
pub fn pseudo_id(word: &str) -> WordId {
    crc32fast::hash(word.as_bytes()) | 0x8000_0000
}

/// Morphology backed by an explicit word list.
///
/// Words not in the list come back without forms.
#[derive(Clone, Debug, Default)]
pub struct DictionaryMorphology {
    words: HashMap<String, (Lang, Vec<WordForm>)>,
}

impl DictionaryMorphology {
    /// Empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `form` as a normal form of `word`.
    pub fn add_form(&mut self, word: &str, form: WordForm) -> &mut Self {
        let entry = self
            .words
            .entry(word.to_lowercase())
            .or_insert_with(|| (form.lang, Vec::new()));
        if !entry.1.contains(&form) {
            entry.1.push(form);
        }
        self
    }

    /// Register `word` as a regular word with normal form `id`.
    pub fn add_word(&mut self, word: &str, id: WordId, lang: Lang) -> &mut Self {
        self.add_form(
            word,
            WordForm {
                id,
                lang,
                is_stop_word: false,
            },
        )
    }

    /// Register `word` as a stop word with normal form `id`.
    pub fn add_stop_word(&mut self, word: &str, id: WordId, lang: Lang) -> &mut Self {
        self.add_form(
            word,
            WordForm {
                id,
                lang,
                is_stop_word: true,
            },
        )
    }
}

impl Morphology for DictionaryMorphology {
    fn normalize(&self, words: &[&str], lang: Lang) -> Vec<WordNormalization> {
        words
            .iter()
            .map(|word| match self.words.get(*word) {
                Some((word_lang, forms)) => WordNormalization {
                    lang: *word_lang,
                    forms: forms.clone(),
                },
                None => WordNormalization {
                    lang,
                    forms: Vec::new(),
                },
            })
            .collect()
    }
}
