//! `newsindex` keeps an in-memory searchable index of news messages.
//!
//! A message is first broken down ([`StoredMessage::break_down`]) into a
//! compact positional word index: every distinct word and normal form owns a
//! slice of one flat position array, and the punctuation, case and spacing
//! needed to reproduce the literal text are kept aside as complements, so that
//! [`StoredMessage::assemble`] can rebuild any window of the text.
//!
//! Broken down messages are inserted into a [`SearchableMessageMap`], which
//! maintains the inverted indexes (words, normal forms, sites, feeds, events,
//! categories) and ranks the words of every message to select its core words.
//!
//! Messages serialize to a versioned little-endian binary format with
//! [`StoredMessage::write_broken_down`] and [`StoredMessage::read_broken_down`].

pub mod assemble;
pub mod category;
pub mod chars;
pub mod config;
pub mod error;
pub mod feed;
pub mod id;
pub mod index;
pub mod locale;
pub mod message;
pub mod metrics;
pub mod morphology;
pub mod positions;
pub mod read;
pub mod tokenizer;
pub mod weighting;
pub mod word_pair;
pub mod write;

pub use crate::assemble::{DefaultMessageBuilder, MessageBuilder};
pub use crate::config::IndexConfig;
pub use crate::error::{IndexError, IndexErrorKind, IndexResult};
pub use crate::id::{EventId, MessageId};
pub use crate::index::{MapStats, Number, SearchableMessageMap, WordMessages};
pub use crate::locale::{Country, Lang};
pub use crate::message::{RawImage, SegmentationInfo, StoredContent, StoredMessage};
pub use crate::morphology::{DictionaryMorphology, Morphology};
pub use crate::positions::{TokenType, WordId, WordPosition, WordPositions};
pub use crate::word_pair::{InMemoryWordPairStore, WordPairStore};
