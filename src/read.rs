//! Decoding of broken down messages and content blocks.

use std::io::{self, Read};
use std::sync::Arc;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::{IndexError, IndexErrorKind, IndexResult};
use crate::locale::Lang;
use crate::message::{Image, ImageThumb, StoredContent, StoredMessage};
use crate::positions::{WordPosition, WordPositionMap, WordPositions};
use crate::tokenizer::{ComplementType, WordComplement};
use crate::write::{BROKEN_DOWN_VERSION, CONTENT_VERSION};

/// Reader for the layouts produced by [`crate::write`], including the
/// legacy word positions records of versions 1 and 2.
struct MessageReader<R> {
    reader: R,
}

impl<R: Read> MessageReader<R> {
    fn new(reader: R) -> Self {
        MessageReader { reader }
    }

    fn read_u8(&mut self) -> IndexResult<u8> {
        Ok(self.reader.read_u8()?)
    }

    fn read_u16(&mut self) -> IndexResult<u16> {
        Ok(self.reader.read_u16::<LittleEndian>()?)
    }

    fn read_u32(&mut self) -> IndexResult<u32> {
        Ok(self.reader.read_u32::<LittleEndian>()?)
    }

    fn read_bytes(&mut self) -> IndexResult<Vec<u8>> {
        let len = u64::from(self.read_u32()?);
        let mut bytes = Vec::new();
        (&mut self.reader).take(len).read_to_end(&mut bytes)?;
        if bytes.len() as u64 != len {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }
        Ok(bytes)
    }

    fn read_string(&mut self) -> IndexResult<String> {
        String::from_utf8(self.read_bytes()?).map_err(|_| IndexError::malformed("string is not UTF-8"))
    }

    /// Decode one positions record as laid out by `version`.
    fn read_word_positions(&mut self, version: u16) -> IndexResult<WordPositions> {
        let flags = if version < 3 {
            u16::from(self.read_u8()?)
        } else {
            self.read_u16()?
        };
        let lang = if version < 2 {
            Lang::NULL
        } else {
            Lang::from_raw(self.read_u16()?)
        };
        let offset = self.read_u16()?;
        let count = self.read_u16()?;
        Ok(WordPositions::new(flags, lang, offset, count))
    }

    fn read_map<K: Ord>(
        &mut self,
        version: u16,
        mut read_key: impl FnMut(&mut Self) -> IndexResult<K>,
    ) -> IndexResult<WordPositionMap<K>> {
        let count = self.read_u16()?;
        let mut entries = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            let key = read_key(self)?;
            entries.push((key, self.read_word_positions(version)?));
        }
        Ok(entries.into_iter().collect())
    }
}

fn check_ranges<K: Ord>(map: &WordPositionMap<K>, len: usize) -> IndexResult<()> {
    if map.iter().any(|(_, wp)| wp.range().end > len) {
        return Err(IndexError::malformed("positions record points past the position array"));
    }
    Ok(())
}

impl StoredMessage {
    /// Restore the positional word index written by [`StoredMessage::write_broken_down`].
    ///
    /// Versions 1 to 5 are accepted; versions before 5 carry no section
    /// positions and get them reset to zero. Returns the version read.
    pub fn read_broken_down<R: Read>(&mut self, reader: R) -> IndexResult<u16> {
        let mut r = MessageReader::new(reader);
        let version = r.read_u16()?;
        if version == 0 || version > BROKEN_DOWN_VERSION {
            return Err(IndexErrorKind::UnsupportedVersion(version).into());
        }

        let source_url = r.read_string()?;
        let (description_pos, img_alt_pos, keywords_pos) = if version >= 5 {
            (r.read_u16()?, r.read_u16()?, r.read_u16()?)
        } else {
            (0, 0, 0)
        };

        let word_positions = r.read_map(version, |r| r.read_string())?;
        let norm_form_positions = r.read_map(version, |r| r.read_u32())?;

        let count = r.read_u16()?;
        let positions = (0..count)
            .map(|_| r.read_u16())
            .collect::<IndexResult<Vec<WordPosition>>>()?;

        let core_count = r.read_u8()?;
        let core_words = (0..core_count)
            .map(|_| r.read_u32())
            .collect::<IndexResult<Vec<_>>>()?;

        check_ranges(&word_positions, positions.len())?;
        check_ranges(&norm_form_positions, positions.len())?;

        self.set_source_url(&source_url);
        self.description_pos = description_pos;
        self.img_alt_pos = img_alt_pos;
        self.keywords_pos = keywords_pos;
        self.word_positions = word_positions;
        self.norm_form_positions = norm_form_positions;
        self.positions = positions;
        self.core_words = core_words;
        Ok(version)
    }

    /// Restore the content block written by [`StoredMessage::write_content`].
    ///
    /// Version 1 blocks carry no thumbnails.
    pub fn read_content<R: Read>(&mut self, reader: R) -> IndexResult<()> {
        let mut r = MessageReader::new(reader);
        let version = r.read_u16()?;
        if version == 0 || version > CONTENT_VERSION {
            return Err(IndexErrorKind::UnsupportedVersion(version).into());
        }

        let mut content = StoredContent::new(r.read_string()?);

        let count = r.read_u16()?;
        for _ in 0..count {
            let position = r.read_u16()?;
            let tag = r.read_u8()?;
            let kind = ComplementType::from_u8(tag)
                .ok_or_else(|| IndexError::malformed(format!("unknown complement type {tag}")))?;
            let text = r.read_string()?;
            content.word_complements.push(WordComplement {
                position,
                kind,
                text,
            });
        }

        let count = r.read_u16()?;
        for _ in 0..count {
            let mut image = Image {
                src: r.read_string()?,
                width: r.read_u16()?,
                height: r.read_u16()?,
                alt_base: r.read_u16()?,
                thumbs: Vec::new(),
            };
            if version >= 2 {
                let thumbs = r.read_u16()?;
                for _ in 0..thumbs {
                    image.thumbs.push(ImageThumb {
                        width: r.read_u16()?,
                        height: r.read_u16()?,
                        data: r.read_bytes()?,
                    });
                }
            }
            content.images.push(image);
        }

        self.content = Some(Arc::new(content));
        Ok(())
    }
}
