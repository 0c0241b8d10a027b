//! QFF font container.
//!
//! Same block framing as QGF. After the 25-byte font descriptor come an
//! optional ASCII glyph table (0x20..=0x7E), an optional Unicode glyph table,
//! a palette for palette formats, and one data block holding every glyph
//! packed back to back. A glyph entry is a 24-bit `(offset << 6) | width`.

use crate::codec::Compression;
use crate::error::{PainterError, QgfError};
use crate::pool::{Handle, SlotPool};
use crate::qgf::{read_array, u24_le, BlockHeader, FrameFlags, ImageFormat, BLOCK_HEADER_SIZE};
use crate::stream::{Stream, StreamSeek};

pub const QFF_MAGIC: u32 = 0x0046_4651;
pub const QFF_VERSION: u8 = 0x01;

pub const FONT_DESCRIPTOR_TYPE_ID: u8 = 0x00;
pub const ASCII_GLYPH_TABLE_TYPE_ID: u8 = 0x01;
pub const UNICODE_GLYPH_TABLE_TYPE_ID: u8 = 0x02;
pub const FONT_PALETTE_TYPE_ID: u8 = 0x03;
pub const FONT_DATA_TYPE_ID: u8 = 0x04;

pub const FONT_DESCRIPTOR_SIZE: u32 = 25;

pub const ASCII_FIRST: u32 = 0x20;
pub const ASCII_LAST: u32 = 0x7E;
pub const ASCII_GLYPH_COUNT: u32 = ASCII_LAST - ASCII_FIRST + 1;
const ASCII_ENTRY_SIZE: u32 = 3;
const UNICODE_ENTRY_SIZE: u32 = 6;

pub const MAX_GLYPH_WIDTH: u8 = 0x3F;
pub const MAX_GLYPH_OFFSET: u32 = (1 << 18) - 1;

/// Font-wide properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontDescriptor {
    pub total_file_size: u32,
    pub line_height: u8,
    pub has_ascii_table: bool,
    pub num_unicode_glyphs: u16,
    pub format: ImageFormat,
    pub flags: FrameFlags,
    pub compression: Compression,
    pub transparency_index: u8,
}

impl FontDescriptor {
    pub fn read<S: Stream + ?Sized>(stream: &mut S) -> Result<Self, QgfError> {
        let header = BlockHeader::read(stream)?;
        header.validate(FONT_DESCRIPTOR_TYPE_ID, Some(FONT_DESCRIPTOR_SIZE - BLOCK_HEADER_SIZE))?;

        let b: [u8; 20] = read_array(stream)?;
        if u24_le([b[0], b[1], b[2]]) != QFF_MAGIC {
            return Err(QgfError::BadMagic);
        }
        if b[3] != QFF_VERSION {
            return Err(QgfError::BadVersion);
        }
        let total_file_size = u32::from_le_bytes([b[4], b[5], b[6], b[7]]);
        if u32::from_le_bytes([b[8], b[9], b[10], b[11]]) != !total_file_size {
            return Err(QgfError::BadTotalSize);
        }

        Ok(Self {
            total_file_size,
            line_height: b[12],
            has_ascii_table: b[13] != 0,
            num_unicode_glyphs: u16::from_le_bytes([b[14], b[15]]),
            format: ImageFormat::try_from(b[16])?,
            flags: FrameFlags::from_bits_retain(b[17]),
            compression: Compression::try_from(b[18])?,
            transparency_index: b[19],
        })
    }

    pub fn to_bytes(&self) -> [u8; FONT_DESCRIPTOR_SIZE as usize] {
        let mut out = [0u8; FONT_DESCRIPTOR_SIZE as usize];
        out[..5].copy_from_slice(
            &BlockHeader::new(
                FONT_DESCRIPTOR_TYPE_ID,
                FONT_DESCRIPTOR_SIZE - BLOCK_HEADER_SIZE,
            )
            .to_bytes(),
        );
        out[5..8].copy_from_slice(&QFF_MAGIC.to_le_bytes()[..3]);
        out[8] = QFF_VERSION;
        out[9..13].copy_from_slice(&self.total_file_size.to_le_bytes());
        out[13..17].copy_from_slice(&(!self.total_file_size).to_le_bytes());
        out[17] = self.line_height;
        out[18] = u8::from(self.has_ascii_table);
        out[19..21].copy_from_slice(&self.num_unicode_glyphs.to_le_bytes());
        out[21] = self.format as u8;
        out[22] = self.flags.bits();
        out[23] = self.compression as u8;
        out[24] = self.transparency_index;
        out
    }
}

/// Resolved glyph: width in pixels and offset into the data block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    pub width: u8,
    pub offset: u32,
}

impl Glyph {
    fn from_entry(value: u32) -> Option<Self> {
        let width = (value & u32::from(MAX_GLYPH_WIDTH)) as u8;
        // Zero-width entries mark code points the font does not carry.
        (width != 0).then_some(Self {
            width,
            offset: value >> 6,
        })
    }

    pub fn to_entry(self) -> u32 {
        (self.offset << 6) | u32::from(self.width & MAX_GLYPH_WIDTH)
    }
}

/// Block positions discovered during validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontLayout {
    pub descriptor: FontDescriptor,
    pub ascii_table_offset: Option<u32>,
    pub unicode_table_offset: Option<u32>,
    pub palette_offset: Option<u32>,
    pub data_offset: u32,
    pub data_length: u32,
}

/// Read the descriptor only and return the declared file size.
pub fn get_total_size<S: Stream + ?Sized>(stream: &mut S) -> Result<u32, QgfError> {
    stream.set_pos(0);
    FontDescriptor::read(stream).map(|d| d.total_file_size)
}

/// Validate every block in order, failing on the first mismatch.
pub fn validate_stream<S: Stream + ?Sized>(stream: &mut S) -> Result<FontLayout, QgfError> {
    stream.set_pos(0);
    let descriptor = FontDescriptor::read(stream)?;

    let ascii_table_offset = if descriptor.has_ascii_table {
        let header = BlockHeader::read(stream)?;
        header.validate(ASCII_GLYPH_TABLE_TYPE_ID, Some(ASCII_GLYPH_COUNT * ASCII_ENTRY_SIZE))?;
        let at = stream.tell();
        stream.skip(header.length);
        Some(at)
    } else {
        None
    };

    let unicode_table_offset = if descriptor.num_unicode_glyphs > 0 {
        let header = BlockHeader::read(stream)?;
        header.validate(
            UNICODE_GLYPH_TABLE_TYPE_ID,
            Some(u32::from(descriptor.num_unicode_glyphs) * UNICODE_ENTRY_SIZE),
        )?;
        let at = stream.tell();
        stream.skip(header.length);
        Some(at)
    } else {
        None
    };

    let palette_offset = if descriptor.format.has_palette() {
        let header = BlockHeader::read(stream)?;
        header.validate(FONT_PALETTE_TYPE_ID, Some(descriptor.format.palette_length()))?;
        let at = stream.tell();
        stream.skip(header.length);
        Some(at)
    } else {
        None
    };

    let header = BlockHeader::read(stream)?;
    header.validate(FONT_DATA_TYPE_ID, None)?;
    let data_offset = stream.tell();

    stream.seek(StreamSeek::End(0));
    if descriptor.total_file_size > stream.tell() {
        return Err(QgfError::BadTotalSize);
    }

    Ok(FontLayout {
        descriptor,
        ascii_table_offset,
        unicode_table_offset,
        palette_offset,
        data_offset,
        data_length: header.length,
    })
}

/// A validated font.
#[derive(Debug)]
pub struct QffFont<S> {
    stream: S,
    layout: FontLayout,
}

impl<S: Stream> QffFont<S> {
    pub fn load(mut stream: S) -> Result<Self, QgfError> {
        let layout = validate_stream(&mut stream)?;
        log::debug!(
            "qff: loaded font, line height {}, {} unicode glyph(s)",
            layout.descriptor.line_height,
            layout.descriptor.num_unicode_glyphs
        );
        Ok(Self { stream, layout })
    }

    pub fn layout(&self) -> &FontLayout {
        &self.layout
    }

    pub fn line_height(&self) -> u8 {
        self.layout.descriptor.line_height
    }

    pub fn descriptor(&self) -> &FontDescriptor {
        &self.layout.descriptor
    }

    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Validate `stream` into a free slot of `pool`.
    pub fn load_into<const N: usize>(
        pool: &mut SlotPool<Self, N>,
        stream: S,
    ) -> Result<Handle, PainterError> {
        pool.reserve()?;
        let handle = pool.insert(Self::load(stream)?)?;
        log::debug!("qff: font in slot {}", handle.index());
        Ok(handle)
    }

    pub fn close<const N: usize>(
        pool: &mut SlotPool<Self, N>,
        handle: Handle,
    ) -> Result<S, PainterError> {
        Ok(pool.remove(handle)?.into_inner())
    }

    /// Split borrow for drawing: the stream plus a copy of the layout.
    pub fn parts(&mut self) -> (&mut S, FontLayout) {
        (&mut self.stream, self.layout)
    }

    /// Fast-path lookup for printable ASCII.
    pub fn ascii_glyph(&mut self, code_point: u32) -> Result<Option<Glyph>, QgfError> {
        let Some(table) = self.layout.ascii_table_offset else {
            return Ok(None);
        };
        if !(ASCII_FIRST..=ASCII_LAST).contains(&code_point) {
            return Ok(None);
        }
        self.stream.set_pos(table + (code_point - ASCII_FIRST) * ASCII_ENTRY_SIZE);
        let entry: [u8; 3] = read_array(&mut self.stream)?;
        Ok(Glyph::from_entry(u24_le(entry)))
    }

    /// Entry `index` of the Unicode table as `(code point, glyph)`.
    pub fn unicode_entry(&mut self, index: u16) -> Result<Option<(u32, Option<Glyph>)>, QgfError> {
        let Some(table) = self.layout.unicode_table_offset else {
            return Ok(None);
        };
        if index >= self.layout.descriptor.num_unicode_glyphs {
            return Ok(None);
        }
        self.stream.set_pos(table + u32::from(index) * UNICODE_ENTRY_SIZE);
        let e: [u8; 6] = read_array(&mut self.stream)?;
        Ok(Some((u24_le([e[0], e[1], e[2]]), Glyph::from_entry(u24_le([e[3], e[4], e[5]])))))
    }

    /// Linear scan of the Unicode table.
    pub fn unicode_glyph(&mut self, code_point: u32) -> Result<Option<Glyph>, QgfError> {
        let Some(table) = self.layout.unicode_table_offset else {
            return Ok(None);
        };
        self.stream.set_pos(table);
        for _ in 0..self.layout.descriptor.num_unicode_glyphs {
            let e: [u8; 6] = read_array(&mut self.stream)?;
            if u24_le([e[0], e[1], e[2]]) == code_point {
                return Ok(Glyph::from_entry(u24_le([e[3], e[4], e[5]])));
            }
        }
        Ok(None)
    }
}

#[cfg(feature = "alloc")]
mod encode {
    use super::{
        FontDescriptor, Glyph, ASCII_FIRST, ASCII_GLYPH_COUNT, ASCII_GLYPH_TABLE_TYPE_ID,
        ASCII_LAST, FONT_DATA_TYPE_ID, FONT_DESCRIPTOR_SIZE, FONT_PALETTE_TYPE_ID, MAX_GLYPH_OFFSET,
        MAX_GLYPH_WIDTH, UNICODE_GLYPH_TABLE_TYPE_ID,
    };
    use crate::codec::{pack_indices, rle_encode, Compression};
    use crate::color::Hsv888;
    use crate::error::QgfError;
    use crate::qgf::{BlockHeader, FrameFlags, ImageFormat};
    use alloc::vec::Vec;

    /// Builds QFF files glyph by glyph.
    ///
    /// Each glyph is packed (and compressed) on its own so a decoder can start
    /// at any glyph offset.
    #[derive(Debug, Clone)]
    pub struct QffEncoder {
        line_height: u8,
        format: ImageFormat,
        compression: Compression,
        palette: Vec<Hsv888>,
        ascii: [u32; ASCII_GLYPH_COUNT as usize],
        has_ascii: bool,
        unicode: Vec<(u32, u32)>,
        data: Vec<u8>,
    }

    impl QffEncoder {
        pub fn new(line_height: u8, format: ImageFormat, compression: Compression) -> Self {
            Self {
                line_height,
                format,
                compression,
                palette: Vec::new(),
                ascii: [0; ASCII_GLYPH_COUNT as usize],
                has_ascii: false,
                unicode: Vec::new(),
                data: Vec::new(),
            }
        }

        pub fn set_palette(&mut self, palette: &[Hsv888]) -> Result<&mut Self, QgfError> {
            if palette.len() as u32 * 3 != self.format.palette_length() {
                return Err(QgfError::BadLength);
            }
            self.palette = palette.to_vec();
            Ok(self)
        }

        /// Add a glyph of `width` pixels; `pixels` holds `width * line_height` indices.
        pub fn add_glyph(
            &mut self,
            code_point: char,
            width: u8,
            pixels: &[u8],
        ) -> Result<&mut Self, QgfError> {
            if width == 0 || width > MAX_GLYPH_WIDTH {
                return Err(QgfError::BadLength);
            }
            if pixels.len() != usize::from(width) * usize::from(self.line_height) {
                return Err(QgfError::BadLength);
            }
            let offset = self.data.len() as u32;
            if offset > MAX_GLYPH_OFFSET {
                return Err(QgfError::BadLength);
            }

            let packed = pack_indices(pixels, self.format.bpp())?;
            match self.compression {
                Compression::None => self.data.extend_from_slice(&packed),
                Compression::Rle => self.data.extend_from_slice(&rle_encode(&packed)),
            }

            let entry = Glyph { width, offset }.to_entry();
            let cp = u32::from(code_point);
            if (ASCII_FIRST..=ASCII_LAST).contains(&cp) {
                self.ascii[(cp - ASCII_FIRST) as usize] = entry;
                self.has_ascii = true;
            } else if let Some(slot) = self.unicode.iter_mut().find(|(c, _)| *c == cp) {
                slot.1 = entry;
            } else {
                self.unicode.push((cp, entry));
            }
            Ok(self)
        }

        pub fn finish(&self) -> Result<Vec<u8>, QgfError> {
            let num_unicode = u16::try_from(self.unicode.len()).map_err(|_| QgfError::BadLength)?;
            if self.format.has_palette()
                && self.palette.len() as u32 * 3 != self.format.palette_length()
            {
                return Err(QgfError::BadLength);
            }

            let mut body = Vec::new();
            if self.has_ascii {
                body.extend_from_slice(
                    &BlockHeader::new(ASCII_GLYPH_TABLE_TYPE_ID, ASCII_GLYPH_COUNT * 3).to_bytes(),
                );
                for entry in &self.ascii {
                    body.extend_from_slice(&entry.to_le_bytes()[..3]);
                }
            }
            if num_unicode > 0 {
                body.extend_from_slice(
                    &BlockHeader::new(
                        UNICODE_GLYPH_TABLE_TYPE_ID,
                        u32::from(num_unicode) * 6,
                    )
                    .to_bytes(),
                );
                for (cp, entry) in &self.unicode {
                    body.extend_from_slice(&cp.to_le_bytes()[..3]);
                    body.extend_from_slice(&entry.to_le_bytes()[..3]);
                }
            }
            if self.format.has_palette() {
                body.extend_from_slice(
                    &BlockHeader::new(
                        FONT_PALETTE_TYPE_ID,
                        self.format.palette_length(),
                    )
                    .to_bytes(),
                );
                for c in &self.palette {
                    body.extend_from_slice(&[c.h, c.s, c.v]);
                }
            }
            body.extend_from_slice(
                &BlockHeader::new(FONT_DATA_TYPE_ID, self.data.len() as u32).to_bytes(),
            );
            body.extend_from_slice(&self.data);

            let descriptor = FontDescriptor {
                total_file_size: FONT_DESCRIPTOR_SIZE + body.len() as u32,
                line_height: self.line_height,
                has_ascii_table: self.has_ascii,
                num_unicode_glyphs: num_unicode,
                format: self.format,
                flags: FrameFlags::empty(),
                compression: self.compression,
                transparency_index: 0,
            };

            let mut out = Vec::with_capacity(descriptor.total_file_size as usize);
            out.extend_from_slice(&descriptor.to_bytes());
            out.extend_from_slice(&body);
            Ok(out)
        }
    }
}

#[cfg(feature = "alloc")]
pub use encode::QffEncoder;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MemoryStream;

    #[test]
    fn test_glyph_entry_packing() {
        let g = Glyph { width: 7, offset: 300 };
        assert_eq!(g.to_entry(), (300 << 6) | 7);
        assert_eq!(Glyph::from_entry(g.to_entry()), Some(g));
        assert_eq!(Glyph::from_entry(300 << 6), None);
    }

    #[test]
    fn test_descriptor_layout() {
        let d = FontDescriptor {
            total_file_size: 99,
            line_height: 8,
            has_ascii_table: true,
            num_unicode_glyphs: 2,
            format: ImageFormat::Grayscale1Bpp,
            flags: FrameFlags::empty(),
            compression: Compression::Rle,
            transparency_index: 0,
        };
        let bytes = d.to_bytes();
        assert_eq!(&bytes[5..9], &[0x51, 0x46, 0x46, 0x01]);
        assert_eq!(FontDescriptor::read(&mut MemoryStream::new(&bytes)), Ok(d));
    }

    #[test]
    fn test_qgf_magic_rejected() {
        let d = FontDescriptor {
            total_file_size: 25,
            line_height: 8,
            has_ascii_table: false,
            num_unicode_glyphs: 0,
            format: ImageFormat::Grayscale1Bpp,
            flags: FrameFlags::empty(),
            compression: Compression::None,
            transparency_index: 0,
        };
        let mut bytes = d.to_bytes();
        bytes[7] = 0x47;
        assert_eq!(get_total_size(&mut MemoryStream::new(&bytes)), Err(QgfError::BadMagic));
    }
}
