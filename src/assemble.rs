//! Rebuilding literal text out of indexed words and their complements.

use crate::error::{IndexError, IndexErrorKind, IndexResult};
use crate::message::StoredMessage;
use crate::positions::{WordPosition, WORD_POSITION_MAX};
use crate::tokenizer::ComplementType;

/// Receiver of reconstructed text.
///
/// Every callback returns `false` to stop the reconstruction.
pub trait MessageBuilder {
    /// An indexed word at `position`, in its original spelling.
    fn word(&mut self, text: &str, position: WordPosition) -> bool;
    /// Text between words: spaces and punctuation.
    fn interword(&mut self, text: &str) -> bool;
    /// A soft break between words written without a space.
    fn segmentation(&mut self) -> bool;
}

/// Builder writing XML-escaped text into a string.
#[derive(Debug)]
pub struct DefaultMessageBuilder<'a> {
    output: &'a mut String,
    max_length: Option<usize>,
    length: usize,
}

impl<'a> DefaultMessageBuilder<'a> {
    /// Builder appending to `output` without a length limit.
    pub fn new(output: &'a mut String) -> Self {
        DefaultMessageBuilder {
            output,
            max_length: None,
            length: 0,
        }
    }

    /// Builder that stops once `max_length` characters of text were written.
    pub fn with_max_length(output: &'a mut String, max_length: usize) -> Self {
        DefaultMessageBuilder {
            output,
            max_length: Some(max_length),
            length: 0,
        }
    }

    /// Characters of unescaped text written so far.
    pub fn length(&self) -> usize {
        self.length
    }

    fn append(&mut self, text: &str) -> bool {
        xml_encode(text, self.output);
        match self.max_length {
            Some(max_length) => {
                self.length += text.chars().count();
                self.length < max_length
            }
            None => true,
        }
    }
}

impl MessageBuilder for DefaultMessageBuilder<'_> {
    fn word(&mut self, text: &str, _position: WordPosition) -> bool {
        self.append(text)
    }

    fn interword(&mut self, text: &str) -> bool {
        self.append(text)
    }

    fn segmentation(&mut self) -> bool {
        true
    }
}

fn xml_encode(text: &str, output: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' => output.push_str("&quot;"),
            '\'' => output.push_str("&#39;"),
            _ => output.push(ch),
        }
    }
}

impl StoredMessage {
    /// Rebuild the text of positions `[min_pos, max_pos)` into `builder`.
    ///
    /// Returns `Ok(false)` when the builder asked to stop.
    pub fn assemble(
        &self,
        builder: &mut dyn MessageBuilder,
        min_pos: WordPosition,
        max_pos: WordPosition,
    ) -> IndexResult<bool> {
        let content = self
            .content
            .as_ref()
            .ok_or(IndexError::from(IndexErrorKind::NoContent))?;
        let complements = &content.word_complements;

        let mut words: Vec<Option<&str>> = Vec::new();
        for (word, wp) in self.word_positions.iter() {
            for &position in wp.positions(&self.positions) {
                if position < min_pos || position >= max_pos {
                    continue;
                }
                let slot = usize::from(position - min_pos);
                if slot >= words.len() {
                    words.resize(slot + 1, None);
                }
                words[slot] = Some(word.as_str());
            }
        }

        let mut j = complements
            .iter()
            .position(|c| c.position >= min_pos)
            .unwrap_or(complements.len());
        let mut write_space = false;

        for (i, word) in words.iter().enumerate() {
            // i < max_pos - min_pos, so this can't overflow
            let real_pos = min_pos + i as WordPosition;
            let mut replaced = false;
            let mut suffix = false;

            while let Some(complement) = complements.get(j) {
                if complement.position > real_pos {
                    break;
                }
                match complement.kind {
                    ComplementType::Segmentation => {
                        if !builder.segmentation() {
                            return Ok(false);
                        }
                        write_space = false;
                    }
                    ComplementType::Standalone => {
                        if (write_space && !builder.interword(" "))
                            || !builder.interword(&complement.text)
                        {
                            return Ok(false);
                        }
                        write_space = true;
                    }
                    ComplementType::Replacement => {
                        if (write_space && !builder.interword(" "))
                            || !builder.word(&complement.text, complement.position)
                        {
                            return Ok(false);
                        }
                        write_space = true;
                        replaced = true;
                    }
                    ComplementType::Prefix => {
                        if (write_space && !builder.interword(" "))
                            || !builder.interword(&complement.text)
                        {
                            return Ok(false);
                        }
                        write_space = false;
                    }
                    ComplementType::Suffix => {
                        suffix = true;
                        break;
                    }
                    ComplementType::Undefined => {}
                }
                j += 1;
            }

            if !replaced {
                if let Some(word) = word {
                    if (write_space && !builder.interword(" ")) || !builder.word(word, real_pos) {
                        return Ok(false);
                    }
                    write_space = true;
                }
            }

            if suffix {
                if !builder.interword(&complements[j].text) {
                    return Ok(false);
                }
                j += 1;
                write_space = true;
            }
        }

        while let Some(complement) = complements.get(j) {
            if complement.position >= max_pos {
                break;
            }
            match complement.kind {
                ComplementType::Segmentation => {
                    if !builder.segmentation() {
                        return Ok(false);
                    }
                    write_space = false;
                }
                ComplementType::Standalone => {
                    if (write_space && !builder.interword(" "))
                        || !builder.interword(&complement.text)
                    {
                        return Ok(false);
                    }
                    write_space = true;
                }
                ComplementType::Suffix => {
                    if !builder.interword(&complement.text) {
                        return Ok(false);
                    }
                }
                _ => {}
            }
            j += 1;
        }

        Ok(true)
    }

    /// Rebuild the title.
    pub fn assemble_title(&self, builder: &mut dyn MessageBuilder) -> IndexResult<bool> {
        self.assemble(builder, 0, self.description_pos)
    }

    /// Rebuild the description.
    pub fn assemble_description(&self, builder: &mut dyn MessageBuilder) -> IndexResult<bool> {
        self.assemble(builder, self.description_pos, self.img_alt_pos)
    }

    /// Rebuild the alt text of image `index`.
    pub fn assemble_image_alt(
        &self,
        builder: &mut dyn MessageBuilder,
        index: usize,
    ) -> IndexResult<bool> {
        let content = self
            .content
            .as_ref()
            .ok_or(IndexError::from(IndexErrorKind::NoContent))?;
        let images = &content.images;
        let image = images.get(index).ok_or(IndexErrorKind::ImageOutOfRange {
            index,
            count: images.len(),
        })?;
        let end = images
            .get(index + 1)
            .map_or(self.keywords_pos, |next| next.alt_base);
        self.assemble(builder, image.alt_base, end)
    }

    /// Rebuild the keywords.
    pub fn assemble_keywords(&self, builder: &mut dyn MessageBuilder) -> IndexResult<bool> {
        self.assemble(builder, self.keywords_pos, WORD_POSITION_MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::MessageId;
    use crate::message::{RawImage, StoredContent};

    fn broken_down(title: &str, description: &str, images: &[RawImage], keywords: &str) -> StoredMessage {
        let mut msg = StoredMessage::new(MessageId::new(1), StoredContent::new("http://t.test/"));
        msg.break_down(title, description, images, keywords, None).unwrap();
        msg
    }

    fn text_of(f: impl FnOnce(&mut dyn MessageBuilder) -> IndexResult<bool>) -> String {
        let mut out = String::new();
        let mut builder = DefaultMessageBuilder::new(&mut out);
        assert!(f(&mut builder).unwrap());
        out
    }

    #[test]
    fn test_sections_rebuilt() {
        let images = [
            RawImage { alt: "First image.".into(), ..Default::default() },
            RawImage { alt: "Second (one)".into(), ..Default::default() },
        ];
        let msg = broken_down("Hello, World!", "It's a \"test\" - really.", &images, "Key words");
        assert_eq!(text_of(|b| msg.assemble_title(b)), "Hello, World!");
        assert_eq!(
            text_of(|b| msg.assemble_description(b)),
            "It&#39;s a &quot;test&quot; - really."
        );
        assert_eq!(text_of(|b| msg.assemble_image_alt(b, 0)), "First image.");
        assert_eq!(text_of(|b| msg.assemble_image_alt(b, 1)), "Second (one)");
        assert_eq!(text_of(|b| msg.assemble_keywords(b)), "Key words");
    }

    #[test]
    fn test_missing_image_is_an_error() {
        let msg = broken_down("a b", "", &[], "");
        let mut out = String::new();
        let err = msg
            .assemble_image_alt(&mut DefaultMessageBuilder::new(&mut out), 0)
            .unwrap_err();
        assert!(matches!(err.kind(), IndexErrorKind::ImageOutOfRange { index: 0, count: 0 }));
    }

    #[test]
    fn test_window_inside_section() {
        let msg = broken_down("one two three four", "", &[], "");
        let mut out = String::new();
        assert!(msg.assemble(&mut DefaultMessageBuilder::new(&mut out), 1, 3).unwrap());
        assert_eq!(out, "two three");
    }

    #[test]
    fn test_builder_stop_aborts() {
        let msg = broken_down("alpha beta gamma delta", "", &[], "");
        let mut out = String::new();
        let mut builder = DefaultMessageBuilder::with_max_length(&mut out, 8);
        assert!(!msg.assemble_title(&mut builder).unwrap());
        assert_eq!(out, "alpha beta");
    }

    #[test]
    fn test_segmentation_suppresses_space() {
        use crate::message::SegmentationInfo;
        let mut msg = StoredMessage::new(MessageId::new(1), StoredContent::default());
        let segmentation = SegmentationInfo {
            title: [2].into_iter().collect(),
            ..Default::default()
        };
        msg.break_down("ab cd", "", &[], "", Some(&segmentation)).unwrap();
        assert_eq!(text_of(|b| msg.assemble_title(b)), "abcd");
    }
}
