//! Binary encoding of broken down messages and content blocks.

use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};

use crate::error::{IndexError, IndexErrorKind, IndexResult};
use crate::message::StoredMessage;
use crate::positions::{WordPositionMap, WordPositions};

/// Current version of the broken down message layout.
pub const BROKEN_DOWN_VERSION: u16 = 5;

/// Current version of the content block layout.
pub const CONTENT_VERSION: u16 = 2;

/// Writer for the binary message layouts.
///
/// All integers are little-endian. Strings are a `u32` byte length followed
/// by UTF-8 bytes. Arrays are prefixed with a `u16` element count, except the
/// core word list which has a `u8` count.
pub(crate) struct MessageWriter<W> {
    writer: W,
}

impl<W: Write> MessageWriter<W> {
    pub(crate) fn new(writer: W) -> Self {
        MessageWriter { writer }
    }

    pub(crate) fn write_u8(&mut self, value: u8) -> IndexResult<()> {
        self.writer.write_u8(value)?;
        Ok(())
    }

    pub(crate) fn write_u16(&mut self, value: u16) -> IndexResult<()> {
        self.writer.write_u16::<LittleEndian>(value)?;
        Ok(())
    }

    pub(crate) fn write_u32(&mut self, value: u32) -> IndexResult<()> {
        self.writer.write_u32::<LittleEndian>(value)?;
        Ok(())
    }

    pub(crate) fn write_count(&mut self, count: usize) -> IndexResult<()> {
        let count = u16::try_from(count).map_err(|_| IndexErrorKind::PositionLimitExceeded)?;
        self.write_u16(count)
    }

    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) -> IndexResult<()> {
        let len = u32::try_from(bytes.len())
            .map_err(|_| IndexError::malformed("string longer than 4GiB"))?;
        self.write_u32(len)?;
        self.writer.write_all(bytes)?;
        Ok(())
    }

    pub(crate) fn write_string(&mut self, text: &str) -> IndexResult<()> {
        self.write_bytes(text.as_bytes())
    }

    fn write_word_positions(&mut self, wp: &WordPositions) -> IndexResult<()> {
        self.write_u16(wp.flags)?;
        self.write_u16(wp.lang.raw())?;
        self.write_u16(wp.offset())?;
        self.write_u16(wp.position_count())
    }

    fn write_map<K>(
        &mut self,
        map: &WordPositionMap<K>,
        mut write_key: impl FnMut(&mut Self, &K) -> IndexResult<()>,
    ) -> IndexResult<()>
    where
        K: Ord,
    {
        self.write_count(map.len())?;
        for (key, wp) in map.iter() {
            write_key(self, key)?;
            self.write_word_positions(wp)?;
        }
        Ok(())
    }
}

impl StoredMessage {
    /// Serialize the positional word index of the message.
    ///
    /// Layout: version, source URL, section positions, word entries,
    /// normal form entries, position array, core words.
    pub fn write_broken_down<W: Write>(&self, writer: W) -> IndexResult<()> {
        let mut w = MessageWriter::new(writer);
        w.write_u16(BROKEN_DOWN_VERSION)?;
        w.write_string(self.source_url())?;
        w.write_u16(self.description_pos)?;
        w.write_u16(self.img_alt_pos)?;
        w.write_u16(self.keywords_pos)?;

        w.write_map(&self.word_positions, |w, word| w.write_string(word))?;
        w.write_map(&self.norm_form_positions, |w, id| w.write_u32(*id))?;

        w.write_count(self.positions.len())?;
        for &position in &self.positions {
            w.write_u16(position)?;
        }

        let core_count = u8::try_from(self.core_words.len())
            .map_err(|_| IndexError::malformed("more than 255 core words"))?;
        w.write_u8(core_count)?;
        for &id in &self.core_words {
            w.write_u32(id)?;
        }
        Ok(())
    }

    /// Serialize the content block: complements and images.
    pub fn write_content<W: Write>(&self, writer: W) -> IndexResult<()> {
        let content = self.content.as_ref().ok_or(IndexErrorKind::NoContent)?;
        let mut w = MessageWriter::new(writer);
        w.write_u16(CONTENT_VERSION)?;
        w.write_string(&content.url)?;

        w.write_count(content.word_complements.len())?;
        for complement in &content.word_complements {
            w.write_u16(complement.position)?;
            w.write_u8(complement.kind as u8)?;
            w.write_string(&complement.text)?;
        }

        w.write_count(content.images.len())?;
        for image in &content.images {
            w.write_string(&image.src)?;
            w.write_u16(image.width)?;
            w.write_u16(image.height)?;
            w.write_u16(image.alt_base)?;
            w.write_count(image.thumbs.len())?;
            for thumb in &image.thumbs {
                w.write_u16(thumb.width)?;
                w.write_u16(thumb.height)?;
                w.write_bytes(&thumb.data)?;
            }
        }
        Ok(())
    }
}
