//! QGF graphics container: parsing, validation and (with `alloc`) encoding.
//!
//! Layout, all little-endian and byte-packed:
//!
//! ```text
//! 0   graphics descriptor  (23 bytes)
//! 23  frame offsets header (5 bytes) + frame_count * u32
//! ..  per frame: frame descriptor, [delta], [palette], data
//! ```
//!
//! Every block starts with `{type_id, !type_id, length:u24}`.

use bitflags::bitflags;

use crate::codec::Compression;
use crate::error::{PainterError, QgfError};
use crate::pool::{Handle, SlotPool};
use crate::stream::Stream;

pub const BLOCK_HEADER_SIZE: u32 = 5;

pub const QGF_MAGIC: u32 = 0x0046_4751;
pub const QGF_VERSION: u8 = 0x01;

pub const GRAPHICS_DESCRIPTOR_TYPE_ID: u8 = 0x00;
pub const FRAME_OFFSETS_TYPE_ID: u8 = 0x01;
pub const FRAME_DESCRIPTOR_TYPE_ID: u8 = 0x02;
pub const PALETTE_DESCRIPTOR_TYPE_ID: u8 = 0x03;
pub const DELTA_DESCRIPTOR_TYPE_ID: u8 = 0x04;
pub const DATA_DESCRIPTOR_TYPE_ID: u8 = 0x05;

pub const GRAPHICS_DESCRIPTOR_SIZE: u32 = 23;
pub const FRAME_DESCRIPTOR_SIZE: u32 = 11;
pub const DELTA_DESCRIPTOR_SIZE: u32 = 13;

/// First frame offset entry, right after the descriptor and offsets header.
pub const FRAME_OFFSETS_START: u32 = GRAPHICS_DESCRIPTOR_SIZE + BLOCK_HEADER_SIZE;

pub(crate) fn read_array<S: Stream + ?Sized, const N: usize>(
    stream: &mut S,
) -> Result<[u8; N], QgfError> {
    let mut buf = [0u8; N];
    if stream.read(&mut buf) == N {
        Ok(buf)
    } else {
        Err(QgfError::Truncated)
    }
}

pub(crate) fn u24_le(b: [u8; 3]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], 0])
}

/// Common 5-byte block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub type_id: u8,
    pub neg_type_id: u8,
    /// 24 significant bits.
    pub length: u32,
}

impl BlockHeader {
    pub const fn new(type_id: u8, length: u32) -> Self {
        Self {
            type_id,
            neg_type_id: !type_id,
            length: length & 0x00FF_FFFF,
        }
    }

    pub fn parse(bytes: [u8; 5]) -> Self {
        Self {
            type_id: bytes[0],
            neg_type_id: bytes[1],
            length: u24_le([bytes[2], bytes[3], bytes[4]]),
        }
    }

    pub fn to_bytes(&self) -> [u8; 5] {
        let len = self.length.to_le_bytes();
        [self.type_id, self.neg_type_id, len[0], len[1], len[2]]
    }

    pub fn read<S: Stream + ?Sized>(stream: &mut S) -> Result<Self, QgfError> {
        read_array(stream).map(Self::parse)
    }

    /// Check type, negated type and, when given, the exact payload length.
    pub fn validate(
        &self,
        expected_type: u8,
        expected_length: Option<u32>,
    ) -> Result<(), QgfError> {
        validate_block_header(self, expected_type, expected_length)
    }
}

/// Fails unless the header carries `expected_type` and its negation, and
/// (when `expected_length` is set) declares exactly that payload length.
pub fn validate_block_header(
    header: &BlockHeader,
    expected_type: u8,
    expected_length: Option<u32>,
) -> Result<(), QgfError> {
    if header.type_id != expected_type || header.neg_type_id != !expected_type {
        return Err(QgfError::BadBlockHeader);
    }
    match expected_length {
        Some(len) if header.length != len => Err(QgfError::BadLength),
        _ => Ok(()),
    }
}

/// Frame pixel formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ImageFormat {
    Grayscale1Bpp = 0x00,
    Grayscale2Bpp = 0x01,
    Grayscale4Bpp = 0x02,
    Grayscale8Bpp = 0x03,
    Palette1Bpp = 0x04,
    Palette2Bpp = 0x05,
    Palette4Bpp = 0x06,
    Palette8Bpp = 0x07,
}

impl ImageFormat {
    pub const fn bpp(self) -> u8 {
        1 << (self as u8 & 0x03)
    }

    pub const fn has_palette(self) -> bool {
        self as u8 >= Self::Palette1Bpp as u8
    }

    /// Palette block payload length for this format, zero for grayscale.
    pub const fn palette_length(self) -> u32 {
        if self.has_palette() {
            (1u32 << self.bpp()) * 3
        } else {
            0
        }
    }
}

impl TryFrom<u8> for ImageFormat {
    type Error = QgfError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0x00 => Self::Grayscale1Bpp,
            0x01 => Self::Grayscale2Bpp,
            0x02 => Self::Grayscale4Bpp,
            0x03 => Self::Grayscale8Bpp,
            0x04 => Self::Palette1Bpp,
            0x05 => Self::Palette2Bpp,
            0x06 => Self::Palette4Bpp,
            0x07 => Self::Palette8Bpp,
            _ => return Err(QgfError::UnsupportedFormat),
        })
    }
}

bitflags! {
    /// Frame descriptor flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FrameFlags: u8 {
        const TRANSPARENT = 0x01;
        const DELTA = 0x02;
    }
}

/// Top-level image descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphicsDescriptor {
    pub total_file_size: u32,
    pub width: u16,
    pub height: u16,
    pub frame_count: u16,
}

impl GraphicsDescriptor {
    /// Read and check the descriptor at the current position.
    pub fn read<S: Stream + ?Sized>(stream: &mut S) -> Result<Self, QgfError> {
        let header = BlockHeader::read(stream)?;
        header.validate(
            GRAPHICS_DESCRIPTOR_TYPE_ID,
            Some(GRAPHICS_DESCRIPTOR_SIZE - BLOCK_HEADER_SIZE),
        )?;

        let b: [u8; 18] = read_array(stream)?;
        if u24_le([b[0], b[1], b[2]]) != QGF_MAGIC {
            return Err(QgfError::BadMagic);
        }
        if b[3] != QGF_VERSION {
            return Err(QgfError::BadVersion);
        }
        let total_file_size = u32::from_le_bytes([b[4], b[5], b[6], b[7]]);
        let neg_total_file_size = u32::from_le_bytes([b[8], b[9], b[10], b[11]]);
        if neg_total_file_size != !total_file_size {
            return Err(QgfError::BadTotalSize);
        }

        Ok(Self {
            total_file_size,
            width: u16::from_le_bytes([b[12], b[13]]),
            height: u16::from_le_bytes([b[14], b[15]]),
            frame_count: u16::from_le_bytes([b[16], b[17]]),
        })
    }

    pub fn to_bytes(&self) -> [u8; GRAPHICS_DESCRIPTOR_SIZE as usize] {
        let mut out = [0u8; GRAPHICS_DESCRIPTOR_SIZE as usize];
        out[..5].copy_from_slice(
            &BlockHeader::new(
                GRAPHICS_DESCRIPTOR_TYPE_ID,
                GRAPHICS_DESCRIPTOR_SIZE - BLOCK_HEADER_SIZE,
            )
            .to_bytes(),
        );
        out[5..8].copy_from_slice(&QGF_MAGIC.to_le_bytes()[..3]);
        out[8] = QGF_VERSION;
        out[9..13].copy_from_slice(&self.total_file_size.to_le_bytes());
        out[13..17].copy_from_slice(&(!self.total_file_size).to_le_bytes());
        out[17..19].copy_from_slice(&self.width.to_le_bytes());
        out[19..21].copy_from_slice(&self.height.to_le_bytes());
        out[21..23].copy_from_slice(&self.frame_count.to_le_bytes());
        out
    }
}

/// Sub-rectangle of a delta frame, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeltaRect {
    pub left: u16,
    pub top: u16,
    pub right: u16,
    pub bottom: u16,
}

impl DeltaRect {
    pub fn width(&self) -> u32 {
        u32::from(self.right.saturating_sub(self.left)) + 1
    }

    pub fn height(&self) -> u32 {
        u32::from(self.bottom.saturating_sub(self.top)) + 1
    }
}

/// Everything needed to draw one frame, with stream offsets of its payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    pub format: ImageFormat,
    pub bpp: u8,
    pub has_palette: bool,
    pub is_delta: bool,
    pub is_transparent: bool,
    pub compression: Compression,
    pub transparency_index: u8,
    /// Milliseconds.
    pub delay: u16,
    pub delta: Option<DeltaRect>,
    pub palette_offset: Option<u32>,
    pub data_offset: u32,
    pub data_length: u32,
}

/// Read the descriptor only and return the declared file size.
pub fn get_total_size<S: Stream + ?Sized>(stream: &mut S) -> Result<u32, QgfError> {
    stream.set_pos(0);
    GraphicsDescriptor::read(stream).map(|d| d.total_file_size)
}

/// Parse and check frame `frame`, leaving the stream past its data header.
pub fn read_frame_info<S: Stream + ?Sized>(
    stream: &mut S,
    descriptor: &GraphicsDescriptor,
    frame: u16,
) -> Result<FrameInfo, QgfError> {
    if frame >= descriptor.frame_count {
        return Err(QgfError::FrameOutOfRange);
    }

    stream.set_pos(FRAME_OFFSETS_START + u32::from(frame) * 4);
    let offset = u32::from_le_bytes(read_array(stream)?);
    stream.set_pos(offset);

    let header = BlockHeader::read(stream)?;
    header.validate(FRAME_DESCRIPTOR_TYPE_ID, Some(FRAME_DESCRIPTOR_SIZE - BLOCK_HEADER_SIZE))?;
    let b: [u8; 6] = read_array(stream)?;
    let [format, flags, compression, transparency_index, d0, d1] = b;

    let format = ImageFormat::try_from(format)?;
    let flags = FrameFlags::from_bits_retain(flags);
    let compression = Compression::try_from(compression)?;

    let delta = if flags.contains(FrameFlags::DELTA) {
        let header = BlockHeader::read(stream)?;
        header.validate(DELTA_DESCRIPTOR_TYPE_ID, Some(DELTA_DESCRIPTOR_SIZE - BLOCK_HEADER_SIZE))?;
        let b: [u8; 8] = read_array(stream)?;
        Some(DeltaRect {
            left: u16::from_le_bytes([b[0], b[1]]),
            top: u16::from_le_bytes([b[2], b[3]]),
            right: u16::from_le_bytes([b[4], b[5]]),
            bottom: u16::from_le_bytes([b[6], b[7]]),
        })
    } else {
        None
    };

    let palette_offset = if format.has_palette() {
        let header = BlockHeader::read(stream)?;
        header.validate(PALETTE_DESCRIPTOR_TYPE_ID, Some(format.palette_length()))?;
        let at = stream.tell();
        stream.skip(header.length);
        Some(at)
    } else {
        None
    };

    let header = BlockHeader::read(stream)?;
    header.validate(DATA_DESCRIPTOR_TYPE_ID, None)?;

    Ok(FrameInfo {
        format,
        bpp: format.bpp(),
        has_palette: format.has_palette(),
        is_delta: delta.is_some(),
        is_transparent: flags.contains(FrameFlags::TRANSPARENT),
        compression,
        transparency_index,
        delay: u16::from_le_bytes([d0, d1]),
        delta,
        palette_offset,
        data_offset: stream.tell(),
        data_length: header.length,
    })
}

/// Validate the whole container, failing on the first bad block.
pub fn validate_stream<S: Stream + ?Sized>(
    stream: &mut S,
) -> Result<GraphicsDescriptor, QgfError> {
    stream.set_pos(0);
    let descriptor = GraphicsDescriptor::read(stream)?;
    if descriptor.frame_count == 0 {
        return Err(QgfError::NoFrames);
    }

    let offsets = BlockHeader::read(stream)?;
    offsets.validate(FRAME_OFFSETS_TYPE_ID, Some(u32::from(descriptor.frame_count) * 4))?;

    for frame in 0..descriptor.frame_count {
        read_frame_info(stream, &descriptor, frame)?;
    }

    stream.seek(crate::stream::StreamSeek::End(0));
    if descriptor.total_file_size > stream.tell() {
        return Err(QgfError::BadTotalSize);
    }
    Ok(descriptor)
}

/// A validated image with its geometry cached.
#[derive(Debug)]
pub struct QgfImage<S> {
    stream: S,
    descriptor: GraphicsDescriptor,
}

impl<S: Stream> QgfImage<S> {
    pub fn load(mut stream: S) -> Result<Self, QgfError> {
        let descriptor = validate_stream(&mut stream)?;
        log::debug!(
            "qgf: loaded {}x{} image, {} frame(s)",
            descriptor.width,
            descriptor.height,
            descriptor.frame_count
        );
        Ok(Self { stream, descriptor })
    }

    pub fn width(&self) -> u16 {
        self.descriptor.width
    }

    pub fn height(&self) -> u16 {
        self.descriptor.height
    }

    pub fn frame_count(&self) -> u16 {
        self.descriptor.frame_count
    }

    pub fn descriptor(&self) -> &GraphicsDescriptor {
        &self.descriptor
    }

    pub fn frame_info(&mut self, frame: u16) -> Result<FrameInfo, QgfError> {
        read_frame_info(&mut self.stream, &self.descriptor, frame)
    }

    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Validate `stream` into a free slot of `pool`.
    ///
    /// A full pool is reported before the stream is read.
    pub fn load_into<const N: usize>(
        pool: &mut SlotPool<Self, N>,
        stream: S,
    ) -> Result<Handle, PainterError> {
        pool.reserve()?;
        let handle = pool.insert(Self::load(stream)?)?;
        log::debug!("qgf: image in slot {}", handle.index());
        Ok(handle)
    }

    /// Free the slot and hand the stream back.
    pub fn close<const N: usize>(
        pool: &mut SlotPool<Self, N>,
        handle: Handle,
    ) -> Result<S, PainterError> {
        Ok(pool.remove(handle)?.into_inner())
    }
}

#[cfg(feature = "alloc")]
mod encode {
    use super::{
        BlockHeader, DeltaRect, FrameFlags, GraphicsDescriptor, ImageFormat, BLOCK_HEADER_SIZE,
        DATA_DESCRIPTOR_TYPE_ID, DELTA_DESCRIPTOR_SIZE, DELTA_DESCRIPTOR_TYPE_ID,
        FRAME_DESCRIPTOR_SIZE, FRAME_DESCRIPTOR_TYPE_ID, FRAME_OFFSETS_TYPE_ID,
        GRAPHICS_DESCRIPTOR_SIZE, PALETTE_DESCRIPTOR_TYPE_ID,
    };
    use crate::codec::{pack_indices, rle_encode, Compression};
    use crate::color::Hsv888;
    use crate::error::QgfError;
    use alloc::vec::Vec;

    /// Source material for one frame.
    #[derive(Debug, Clone, Copy)]
    pub struct FrameSpec<'a> {
        pub format: ImageFormat,
        pub compression: Compression,
        pub delay: u16,
        pub transparency_index: Option<u8>,
        pub delta: Option<DeltaRect>,
        /// Exactly `1 << bpp` entries for palette formats, empty otherwise.
        pub palette: &'a [Hsv888],
        /// One palette index (or grey level) per pixel, row-major.
        pub pixels: &'a [u8],
    }

    #[derive(Debug, Clone)]
    struct EncodedFrame {
        format: ImageFormat,
        flags: FrameFlags,
        compression: Compression,
        transparency_index: u8,
        delay: u16,
        delta: Option<DeltaRect>,
        palette: Vec<u8>,
        data: Vec<u8>,
    }

    impl EncodedFrame {
        fn size(&self) -> u32 {
            let mut size = FRAME_DESCRIPTOR_SIZE + BLOCK_HEADER_SIZE + self.data.len() as u32;
            if self.delta.is_some() {
                size += DELTA_DESCRIPTOR_SIZE;
            }
            if self.format.has_palette() {
                size += BLOCK_HEADER_SIZE + self.palette.len() as u32;
            }
            size
        }
    }

    /// Builds well-formed QGF files.
    #[derive(Debug, Clone)]
    pub struct QgfEncoder {
        width: u16,
        height: u16,
        frames: Vec<EncodedFrame>,
    }

    impl QgfEncoder {
        pub fn new(width: u16, height: u16) -> Self {
            Self {
                width,
                height,
                frames: Vec::new(),
            }
        }

        pub fn add_frame(&mut self, spec: &FrameSpec<'_>) -> Result<&mut Self, QgfError> {
            let expected_pixels = match spec.delta {
                Some(rect) => rect.width() * rect.height(),
                None => u32::from(self.width) * u32::from(self.height),
            };
            if spec.pixels.len() as u32 != expected_pixels {
                return Err(QgfError::BadLength);
            }
            if spec.palette.len() as u32 * 3 != spec.format.palette_length() {
                return Err(QgfError::BadLength);
            }

            let packed = pack_indices(spec.pixels, spec.format.bpp())?;
            let data = match spec.compression {
                Compression::None => packed,
                Compression::Rle => rle_encode(&packed),
            };

            let mut flags = FrameFlags::empty();
            flags.set(FrameFlags::DELTA, spec.delta.is_some());
            flags.set(FrameFlags::TRANSPARENT, spec.transparency_index.is_some());

            self.frames.push(EncodedFrame {
                format: spec.format,
                flags,
                compression: spec.compression,
                transparency_index: spec.transparency_index.unwrap_or(0),
                delay: spec.delay,
                delta: spec.delta,
                palette: spec.palette.iter().flat_map(|c| [c.h, c.s, c.v]).collect(),
                data,
            });
            Ok(self)
        }

        pub fn finish(&self) -> Vec<u8> {
            let frame_count = self.frames.len() as u32;
            let mut offset = GRAPHICS_DESCRIPTOR_SIZE + BLOCK_HEADER_SIZE + frame_count * 4;
            let offsets: Vec<u32> = self
                .frames
                .iter()
                .map(|frame| {
                    let at = offset;
                    offset += frame.size();
                    at
                })
                .collect();
            let total_file_size = offset;

            let mut out = Vec::with_capacity(total_file_size as usize);
            let descriptor = GraphicsDescriptor {
                total_file_size,
                width: self.width,
                height: self.height,
                frame_count: frame_count as u16,
            };
            out.extend_from_slice(&descriptor.to_bytes());
            out.extend_from_slice(
                &BlockHeader::new(FRAME_OFFSETS_TYPE_ID, frame_count * 4).to_bytes(),
            );
            for at in &offsets {
                out.extend_from_slice(&at.to_le_bytes());
            }

            for frame in &self.frames {
                out.extend_from_slice(
                    &BlockHeader::new(
                        FRAME_DESCRIPTOR_TYPE_ID,
                        FRAME_DESCRIPTOR_SIZE - BLOCK_HEADER_SIZE,
                    )
                    .to_bytes(),
                );
                out.extend_from_slice(&[
                    frame.format as u8,
                    frame.flags.bits(),
                    frame.compression as u8,
                    frame.transparency_index,
                ]);
                out.extend_from_slice(&frame.delay.to_le_bytes());

                if let Some(rect) = frame.delta {
                    out.extend_from_slice(
                        &BlockHeader::new(
                            DELTA_DESCRIPTOR_TYPE_ID,
                            DELTA_DESCRIPTOR_SIZE - BLOCK_HEADER_SIZE,
                        )
                        .to_bytes(),
                    );
                    for v in [rect.left, rect.top, rect.right, rect.bottom] {
                        out.extend_from_slice(&v.to_le_bytes());
                    }
                }

                if frame.format.has_palette() {
                    out.extend_from_slice(
                        &BlockHeader::new(
                            PALETTE_DESCRIPTOR_TYPE_ID,
                            frame.palette.len() as u32,
                        )
                        .to_bytes(),
                    );
                    out.extend_from_slice(&frame.palette);
                }

                out.extend_from_slice(
                    &BlockHeader::new(DATA_DESCRIPTOR_TYPE_ID, frame.data.len() as u32).to_bytes(),
                );
                out.extend_from_slice(&frame.data);
            }
            out
        }
    }
}

#[cfg(feature = "alloc")]
pub use encode::{FrameSpec, QgfEncoder};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MemoryStream;

    #[test]
    fn test_block_header_roundtrip_bytes() {
        let h = BlockHeader::new(0x03, 0x01_0203);
        assert_eq!(h.to_bytes(), [0x03, 0xFC, 0x03, 0x02, 0x01]);
        assert_eq!(BlockHeader::parse(h.to_bytes()), h);
    }

    #[test]
    fn test_validate_block_header() {
        let h = BlockHeader::new(0x05, 12);
        assert_eq!(h.validate(0x05, None), Ok(()));
        assert_eq!(h.validate(0x05, Some(12)), Ok(()));
        assert_eq!(h.validate(0x05, Some(11)), Err(QgfError::BadLength));
        assert_eq!(h.validate(0x04, None), Err(QgfError::BadBlockHeader));

        let corrupt = BlockHeader {
            neg_type_id: 0x00,
            ..h
        };
        assert_eq!(corrupt.validate(0x05, None), Err(QgfError::BadBlockHeader));
    }

    #[test]
    fn test_format_table() {
        assert_eq!(ImageFormat::Grayscale1Bpp.bpp(), 1);
        assert_eq!(ImageFormat::Grayscale8Bpp.bpp(), 8);
        assert_eq!(ImageFormat::Palette2Bpp.bpp(), 2);
        assert!(ImageFormat::Palette1Bpp.has_palette());
        assert!(!ImageFormat::Grayscale4Bpp.has_palette());
        assert_eq!(ImageFormat::Palette4Bpp.palette_length(), 48);
        assert_eq!(ImageFormat::try_from(0x08), Err(QgfError::UnsupportedFormat));
    }

    #[test]
    fn test_descriptor_layout() {
        let d = GraphicsDescriptor {
            total_file_size: 0x100,
            width: 3,
            height: 4,
            frame_count: 1,
        };
        let bytes = d.to_bytes();
        assert_eq!(bytes.len(), 23);
        assert_eq!(&bytes[5..9], &[0x51, 0x47, 0x46, 0x01]);
        assert_eq!(GraphicsDescriptor::read(&mut MemoryStream::new(&bytes)), Ok(d));

        let mut bad = bytes;
        bad[13] ^= 0x01;
        assert_eq!(
            GraphicsDescriptor::read(&mut MemoryStream::new(&bad)),
            Err(QgfError::BadTotalSize)
        );
        let mut bad = bytes;
        bad[8] = 2;
        assert_eq!(
            GraphicsDescriptor::read(&mut MemoryStream::new(&bad)),
            Err(QgfError::BadVersion)
        );
        let mut bad = bytes;
        bad[5] = 0;
        assert_eq!(GraphicsDescriptor::read(&mut MemoryStream::new(&bad)), Err(QgfError::BadMagic));
    }

    #[test]
    fn test_zero_frames_rejected() {
        let d = GraphicsDescriptor {
            total_file_size: GRAPHICS_DESCRIPTOR_SIZE + BLOCK_HEADER_SIZE,
            width: 1,
            height: 1,
            frame_count: 0,
        };
        let mut bytes = [0u8; 28];
        bytes[..23].copy_from_slice(&d.to_bytes());
        bytes[23..].copy_from_slice(&BlockHeader::new(FRAME_OFFSETS_TYPE_ID, 0).to_bytes());
        assert_eq!(validate_stream(&mut MemoryStream::new(&bytes)), Err(QgfError::NoFrames));
    }

    #[test]
    fn test_truncated_descriptor() {
        let bytes = [0x00u8, 0xFF, 18, 0, 0, 0x51];
        assert_eq!(get_total_size(&mut MemoryStream::new(&bytes)), Err(QgfError::Truncated));
    }
}
