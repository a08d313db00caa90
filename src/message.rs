//! Messages as stored in the index.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{IndexError, IndexErrorKind, IndexResult};
use crate::id::{EventId, MessageId};
use crate::locale::{Country, Lang};
use crate::morphology::Morphology;
use crate::positions::{
    MessageWordPositions, NormFormPositions, TokenType, WordId, WordPosition, WordPositions,
};
use crate::tokenizer::{
    to_position, SegmentationMarkers, Signature, SignatureBuilder, Tokenizer, WordComplement,
};

/// Image thumbnail blob.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImageThumb {
    /// Width in pixels.
    pub width: u16,
    /// Height in pixels.
    pub height: u16,
    /// Encoded image data.
    pub data: Vec<u8>,
}

/// Image as it comes with a fetched message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawImage {
    /// Image URL.
    pub src: String,
    /// Width in pixels.
    pub width: u16,
    /// Height in pixels.
    pub height: u16,
    /// Alternative text; gets indexed.
    pub alt: String,
    /// Thumbnails.
    pub thumbs: Vec<ImageThumb>,
}

/// Image of a broken down message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Image {
    /// Image URL.
    pub src: String,
    /// Width in pixels.
    pub width: u16,
    /// Height in pixels.
    pub height: u16,
    /// First position of the alt text words.
    pub alt_base: WordPosition,
    /// Thumbnails.
    pub thumbs: Vec<ImageThumb>,
}

/// Segmentation markers for every section of a message.
#[derive(Clone, Debug, Default)]
pub struct SegmentationInfo {
    /// Markers in the title.
    pub title: SegmentationMarkers,
    /// Markers in the description.
    pub description: SegmentationMarkers,
    /// Markers in each image alt text.
    pub images: Vec<SegmentationMarkers>,
}

/// Literal text material of a message that is not part of the word index.
#[derive(Debug, Default)]
pub struct StoredContent {
    /// Message URL.
    pub url: String,
    /// Fragments needed to rebuild the original text.
    pub word_complements: Vec<WordComplement>,
    /// Images with their alt text ranges.
    pub images: Vec<Image>,
    timestamp: AtomicU64,
}

impl Clone for StoredContent {
    fn clone(&self) -> Self {
        StoredContent {
            url: self.url.clone(),
            word_complements: self.word_complements.clone(),
            images: self.images.clone(),
            timestamp: AtomicU64::new(self.timestamp()),
        }
    }
}

impl StoredContent {
    /// Content block of the message at `url`.
    pub fn new(url: impl Into<String>) -> Self {
        StoredContent {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Last time the content was used by the index, in seconds.
    pub fn timestamp(&self) -> u64 {
        self.timestamp.load(Ordering::Relaxed)
    }

    /// Record a use of the content.
    pub fn touch(&self, now: u64) {
        self.timestamp.store(now, Ordering::Relaxed);
    }
}

/// A message together with its positional word index.
#[derive(Clone, Debug, Default)]
pub struct StoredMessage {
    /// Identity.
    pub id: MessageId,
    /// Event the message is grouped into; zero for none.
    pub event_id: EventId,
    /// Number of messages in the message's event.
    pub event_capacity: u32,
    /// Content signature computed by [`StoredMessage::break_down`].
    pub signature: Signature,
    /// Signature of the message URL.
    pub url_signature: Signature,
    /// `HAS_IMAGES` / `HAS_THUMBS`.
    pub flags: u32,
    /// Publication time, seconds since the epoch.
    pub published: u64,
    /// Fetch time.
    pub fetched: u64,
    /// Last visit time.
    pub visited: u64,
    /// Times shown.
    pub impressions: u64,
    /// Times clicked.
    pub clicks: u64,
    /// Language.
    pub lang: Lang,
    /// Country.
    pub country: Country,
    /// Assigned categories, each starting with '/'.
    pub categories: Vec<String>,
    /// Every '/'-terminated prefix of every category. Maintained by the index.
    pub category_paths: Vec<String>,
    /// Relevance score. Maintained by the index.
    pub search_weight: u32,
    /// Literal text material, shared between copies.
    pub content: Option<Arc<StoredContent>>,
    /// First position of the description.
    pub description_pos: WordPosition,
    /// First position of the image alt texts.
    pub img_alt_pos: WordPosition,
    /// First position of the keywords.
    pub keywords_pos: WordPosition,
    /// Distinct lower-cased words.
    pub word_positions: MessageWordPositions,
    /// Normal forms of the words.
    pub norm_form_positions: NormFormPositions,
    /// Flat array all positions records point into.
    pub positions: Vec<WordPosition>,
    /// Representative normal form ids, most relevant first.
    pub core_words: Vec<WordId>,
    source_url: String,
    hostname: String,
}

impl StoredMessage {
    /// Message carries images.
    pub const HAS_IMAGES: u32 = 0x1;
    /// Some image carries thumbnails.
    pub const HAS_THUMBS: u32 = 0x2;

    /// Empty message with the given id and content block.
    pub fn new(id: MessageId, content: StoredContent) -> Self {
        StoredMessage {
            id,
            content: Some(Arc::new(content)),
            ..Default::default()
        }
    }

    /// URL of the feed the message came from.
    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// Host part of the source URL; empty when unknown.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Set the source URL and derive the hostname from it.
    pub fn set_source_url(&mut self, url: &str) {
        self.source_url = url.to_string();
        self.hostname = hostname_of(url);
    }

    /// Hash of the content URL, usable as [`StoredMessage::url_signature`].
    pub fn compute_url_signature(&self) -> Signature {
        match &self.content {
            Some(content) if !content.url.is_empty() => {
                let mut signature = SignatureBuilder::new();
                signature.update(content.url.as_bytes());
                signature.finish()
            }
            _ => 0,
        }
    }

    /// One past the highest position used by any word.
    pub fn position_count(&self) -> u32 {
        self.positions.iter().map(|&p| u32::from(p) + 1).max().unwrap_or(0)
    }

    /// Tokenize the message text into the positional word index.
    ///
    /// Sections are laid out as title, description, image alt texts, keywords.
    /// Replaces all previous positional data and content complements; normal
    /// forms must be set again afterwards.
    pub fn break_down(
        &mut self,
        title: &str,
        description: &str,
        images: &[RawImage],
        keywords: &str,
        segmentation: Option<&SegmentationInfo>,
    ) -> IndexResult<()> {
        let content = self
            .content
            .as_ref()
            .ok_or(IndexError::from(IndexErrorKind::NoContent))?;

        let mut tokenizer = Tokenizer::new();
        let mut signature = SignatureBuilder::new();

        tokenizer.parse_text(
            title,
            WordPositions::TITLE,
            Some(&mut signature),
            segmentation.map(|s| &s.title),
        );
        tokenizer.skip_position();
        let description_pos = tokenizer.position();

        tokenizer.parse_text(
            description,
            WordPositions::DESC,
            Some(&mut signature),
            segmentation.map(|s| &s.description),
        );
        tokenizer.skip_position();
        let img_alt_pos = tokenizer.position();

        if tokenizer.distinct_words() > 1 {
            signature.update(b"A");
        } else {
            signature.restart();
            let url = if content.url.is_empty() {
                &self.source_url
            } else {
                &content.url
            };
            if !url.is_empty() {
                signature.update(url.as_bytes());
                signature.update(b"L");
            }
        }

        let mut flags = self.flags & !(Self::HAS_IMAGES | Self::HAS_THUMBS);
        let mut alt_bases = Vec::with_capacity(images.len());
        for (i, image) in images.iter().enumerate() {
            alt_bases.push(tokenizer.position());
            let image_markers = segmentation.and_then(|s| s.images.get(i));
            tokenizer.parse_text(&image.alt, WordPositions::ALT, None, image_markers);
            tokenizer.skip_position();
            if !image.thumbs.is_empty() {
                flags |= Self::HAS_THUMBS;
            }
        }
        if !images.is_empty() {
            flags |= Self::HAS_IMAGES;
        }

        let keywords_pos = tokenizer.position();
        tokenizer.parse_text(keywords, 0, Some(&mut signature), None);

        let text = tokenizer.finish()?;
        let stored_images = images
            .iter()
            .zip(alt_bases)
            .map(|(image, alt_base)| {
                Ok(Image {
                    src: image.src.clone(),
                    width: image.width,
                    height: image.height,
                    alt_base: to_position(alt_base as usize)?,
                    thumbs: image.thumbs.clone(),
                })
            })
            .collect::<IndexResult<Vec<_>>>()?;
        let description_pos = to_position(description_pos as usize)?;
        let img_alt_pos = to_position(img_alt_pos as usize)?;
        let keywords_pos = to_position(keywords_pos as usize)?;

        if let Some(content) = self.content.as_mut() {
            let content = Arc::make_mut(content);
            content.word_complements = text.complements;
            content.images = stored_images;
        }

        self.flags = flags;
        self.signature = signature.finish();
        self.description_pos = description_pos;
        self.img_alt_pos = img_alt_pos;
        self.keywords_pos = keywords_pos;
        self.word_positions = text.word_positions;
        self.positions = text.positions;
        self.norm_form_positions.clear();
        self.core_words.clear();
        Ok(())
    }

    /// Attach normal forms to the broken down words.
    ///
    /// Normal form positions are appended to the shared position array behind
    /// the word positions. Also sets the language and token type of every word.
    pub fn set_normal_forms(&mut self, morphology: &dyn Morphology) -> IndexResult<()> {
        let words: Vec<&str> = self.word_positions.iter().map(|(w, _)| w.as_str()).collect();
        let normalized = morphology.normalize(&words, self.lang);
        if normalized.len() != words.len() {
            return Err(IndexError::malformed(format!(
                "morphology returned {} results for {} words",
                normalized.len(),
                words.len()
            )));
        }

        struct FormAccumulator {
            flags: u16,
            lang: Lang,
            token_type: TokenType,
            positions: Vec<WordPosition>,
        }

        const INHERITED: u16 = WordPositions::LOCATION_MASK
            | WordPositions::CAPITAL_WORD
            | WordPositions::SENTENCE_PROPER_NAME
            | WordPositions::PROPER_NAME;
        const CAPITAL_BOUND: u16 = WordPositions::CAPITAL_WORD
            | WordPositions::SENTENCE_PROPER_NAME
            | WordPositions::PROPER_NAME;

        let mut forms: BTreeMap<WordId, FormAccumulator> = BTreeMap::new();
        for ((_, word), norm) in self.word_positions.iter().zip(&normalized) {
            let flags = word.flags & INHERITED;
            let positions = word.positions(&self.positions);
            for form in &norm.forms {
                let token_type = if form.is_stop_word {
                    TokenType::StopWord
                } else {
                    TokenType::KnownWord
                };
                let acc = forms.entry(form.id).or_insert_with(|| FormAccumulator {
                    flags,
                    lang: form.lang,
                    token_type,
                    positions: Vec::new(),
                });
                if !acc.positions.is_empty() {
                    let reset = flags & WordPositions::CAPITAL_WORD == 0
                        || acc.flags & WordPositions::CAPITAL_WORD == 0;
                    acc.flags |= flags;
                    if reset {
                        acc.flags &= !CAPITAL_BOUND;
                    }
                }
                acc.lang = form.lang;
                acc.token_type = token_type;
                acc.positions.extend_from_slice(positions);
            }
        }

        let word_end = self
            .word_positions
            .iter()
            .map(|(_, wp)| wp.range().end)
            .max()
            .unwrap_or(0);
        let total = word_end + forms.values().map(|f| f.positions.len()).sum::<usize>();
        to_position(total)?;

        for ((_, word), norm) in self.word_positions.iter_mut().zip(&normalized) {
            word.lang = norm.lang;
        }

        self.positions.truncate(word_end);
        let mut norm_form_positions = Vec::with_capacity(forms.len());
        for (id, mut acc) in forms {
            acc.positions.sort_unstable();
            let offset = to_position(self.positions.len())?;
            let count = to_position(acc.positions.len())?;
            self.positions.extend_from_slice(&acc.positions);
            let mut wp = WordPositions::new(acc.flags, acc.lang, offset, count);
            wp.set_token_type(acc.token_type);
            norm_form_positions.push((id, wp));
        }
        self.norm_form_positions = norm_form_positions.into_iter().collect();
        Ok(())
    }
}

fn hostname_of(url: &str) -> String {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    let host = if host.starts_with('[') {
        host.split_once(']').map_or(host, |(h, _)| h).trim_start_matches('[')
    } else {
        host.split(':').next().unwrap_or_default()
    };
    host.to_ascii_lowercase()
}
