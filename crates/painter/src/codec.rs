//! Byte input decoders and the indexed-pixel decode pipeline.
//!
//! Pixel data flows as: stream -> [`ByteSource`] (raw or RLE) -> unpacked
//! palette index -> sink callback, which is normally the device's pixel
//! appender filling the transmit buffer.

use crate::color::{Hsv888, PixelColor};
use crate::error::{PainterError, QgfError};
use crate::palette::PaletteCache;
use crate::stream::Stream;

/// Pixel data compression scheme, as stored in frame and font descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Compression {
    None = 0x00,
    Rle = 0x01,
}

impl TryFrom<u8> for Compression {
    type Error = QgfError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Self::None),
            0x01 => Ok(Self::Rle),
            _ => Err(QgfError::UnsupportedCompression),
        }
    }
}

/// Pull-based source of (decompressed) pixel data bytes.
pub trait ByteSource {
    fn next_byte(&mut self) -> Result<u8, QgfError>;
}

/// Passes stream bytes through unchanged.
#[derive(Debug)]
pub struct UncompressedInput<S> {
    stream: S,
}

impl<S: Stream> UncompressedInput<S> {
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }
}

impl<S: Stream> ByteSource for UncompressedInput<S> {
    fn next_byte(&mut self) -> Result<u8, QgfError> {
        self.stream.get().ok_or(QgfError::Truncated)
    }
}

/// Where the RLE decoder is within the marker/run structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RleMode {
    /// Next stream byte is a run marker.
    MarkerByte,
    /// Returning the same byte `remain` more times.
    RepeatingRun,
    /// Returning the next `remain` stream bytes verbatim.
    NonRepeatingRun,
}

/// Run-length decoder.
///
/// Marker `1..=127` repeats the following byte that many times; marker
/// `128..=255` is followed by `marker - 127` literal bytes. Marker 0 is
/// rejected as corrupt.
#[derive(Debug)]
pub struct RleInput<S> {
    stream: S,
    mode: RleMode,
    remain: u8,
    value: u8,
}

impl<S: Stream> RleInput<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            mode: RleMode::MarkerByte,
            remain: 0,
            value: 0,
        }
    }

    pub fn mode(&self) -> RleMode {
        self.mode
    }

    pub fn remain(&self) -> u8 {
        self.remain
    }

    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Drop any partially consumed run.
    pub fn reset(&mut self) {
        self.mode = RleMode::MarkerByte;
        self.remain = 0;
    }
}

impl<S: Stream> ByteSource for RleInput<S> {
    fn next_byte(&mut self) -> Result<u8, QgfError> {
        if self.mode == RleMode::MarkerByte {
            let marker = self.stream.get().ok_or(QgfError::Truncated)?;
            if marker == 0 {
                return Err(QgfError::CorruptRle);
            }
            if marker >= 128 {
                self.mode = RleMode::NonRepeatingRun;
                self.remain = marker - 127;
            } else {
                self.mode = RleMode::RepeatingRun;
                self.remain = marker;
                self.value = self.stream.get().ok_or(QgfError::Truncated)?;
            }
        }

        let c = if self.mode == RleMode::NonRepeatingRun {
            self.stream.get().ok_or(QgfError::Truncated)?
        } else {
            self.value
        };

        self.remain -= 1;
        if self.remain == 0 {
            self.mode = RleMode::MarkerByte;
        }
        Ok(c)
    }
}

/// Either input decoder, selected by a descriptor's compression byte.
#[derive(Debug)]
pub enum PixelInput<S> {
    Uncompressed(UncompressedInput<S>),
    Rle(RleInput<S>),
}

impl<S: Stream> PixelInput<S> {
    pub fn new(compression: Compression, stream: S) -> Self {
        match compression {
            Compression::None => Self::Uncompressed(UncompressedInput::new(stream)),
            Compression::Rle => Self::Rle(RleInput::new(stream)),
        }
    }

    /// Reposition at `offset` with fresh decoder state.
    pub fn restart_at(&mut self, offset: u32) {
        match self {
            Self::Uncompressed(input) => input.stream_mut().set_pos(offset),
            Self::Rle(input) => {
                input.reset();
                input.stream_mut().set_pos(offset);
            }
        }
    }
}

impl<S: Stream> ByteSource for PixelInput<S> {
    fn next_byte(&mut self) -> Result<u8, QgfError> {
        match self {
            Self::Uncompressed(input) => input.next_byte(),
            Self::Rle(input) => input.next_byte(),
        }
    }
}

/// Indexed pixels packed into one byte at `bpp` bits each.
pub fn pixels_per_byte(bpp: u8) -> Result<u32, QgfError> {
    match bpp {
        1 | 2 | 4 | 8 => Ok(u32::from(8 / bpp)),
        _ => Err(QgfError::UnsupportedFormat),
    }
}

/// Unpack `pixel_count` indices (LSB first) and hand each to `sink`.
///
/// A final partial byte only yields the pixels still owed.
pub fn decode_palette<B, F>(
    pixel_count: u32,
    bpp: u8,
    input: &mut B,
    palette: &[PixelColor],
    mut sink: F,
) -> Result<(), PainterError>
where
    B: ByteSource + ?Sized,
    F: FnMut(&[PixelColor], u8) -> Result<(), PainterError>,
{
    let ppb = pixels_per_byte(bpp)?;
    let mask = ((1u16 << bpp) - 1) as u8;

    let mut remaining = pixel_count;
    while remaining > 0 {
        let byte = input.next_byte()?;
        let loop_pixels = remaining.min(ppb);
        for k in 0..loop_pixels {
            let index = (byte >> (k * u32::from(bpp))) & mask;
            sink(palette, index)?;
        }
        remaining -= loop_pixels;
    }
    Ok(())
}

/// Consumer of decoded pixels that also owns the native palette conversion.
pub trait PixelSink {
    /// Turn freshly interpolated HSV entries into native pixels.
    fn convert_palette(&mut self, palette: &mut [PixelColor]) -> Result<(), PainterError>;
    fn push(&mut self, palette: &[PixelColor], index: u8) -> Result<(), PainterError>;
}

/// Decode indexed data against a `fg`/`bg` ramp of `1 << bpp` entries.
///
/// The sink only converts the palette when the ramp was regenerated; a
/// failed conversion drops the memo so the next call starts over.
pub fn decode_recolor<B, K>(
    cache: &mut PaletteCache,
    pixel_count: u32,
    bpp: u8,
    input: &mut B,
    fg: Hsv888,
    bg: Hsv888,
    sink: &mut K,
) -> Result<(), PainterError>
where
    B: ByteSource + ?Sized,
    K: PixelSink + ?Sized,
{
    pixels_per_byte(bpp)?;
    if cache.interpolate(fg, bg, 1usize << bpp)? {
        if let Err(e) = sink.convert_palette(cache.entries_mut()) {
            cache.invalidate();
            return Err(e);
        }
    }
    decode_palette(pixel_count, bpp, input, cache.entries(), |palette, index| {
        sink.push(palette, index)
    })
}

/// Recolor decode with a white-on-black ramp.
pub fn decode_grayscale<B, K>(
    cache: &mut PaletteCache,
    pixel_count: u32,
    bpp: u8,
    input: &mut B,
    sink: &mut K,
) -> Result<(), PainterError>
where
    B: ByteSource + ?Sized,
    K: PixelSink + ?Sized,
{
    decode_recolor(cache, pixel_count, bpp, input, Hsv888::WHITE, Hsv888::BLACK, sink)
}

#[cfg(feature = "alloc")]
mod encode {
    use super::pixels_per_byte;
    use crate::error::QgfError;
    use alloc::vec::Vec;

    /// Longest run either marker form can express here.
    pub const MAX_RUN: usize = 127;
    /// Longest literal stretch (marker 255).
    pub const MAX_LITERAL: usize = 128;

    /// Pack palette indices LSB first at `bpp` bits each.
    pub fn pack_indices(indices: &[u8], bpp: u8) -> Result<Vec<u8>, QgfError> {
        let ppb = pixels_per_byte(bpp)? as usize;
        let mask = ((1u16 << bpp) - 1) as u8;
        Ok(indices
            .chunks(ppb)
            .map(|chunk| {
                chunk
                    .iter()
                    .enumerate()
                    .fold(0u8, |acc, (k, &idx)| acc | ((idx & mask) << (k * bpp as usize)))
            })
            .collect())
    }

    /// Encode with repeat runs for three or more equal bytes, literals otherwise.
    pub fn rle_encode(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(data.len() + data.len() / MAX_LITERAL + 1);
        let mut literal_start = 0;
        let mut i = 0;

        while i < data.len() {
            let run = data[i..].iter().take(MAX_RUN).take_while(|&&b| b == data[i]).count();
            if run >= 3 {
                flush_literals(&mut out, &data[literal_start..i]);
                out.push(run as u8);
                out.push(data[i]);
                i += run;
                literal_start = i;
            } else {
                i += 1;
                if i - literal_start == MAX_LITERAL {
                    flush_literals(&mut out, &data[literal_start..i]);
                    literal_start = i;
                }
            }
        }
        flush_literals(&mut out, &data[literal_start..]);
        out
    }

    fn flush_literals(out: &mut Vec<u8>, literals: &[u8]) {
        if !literals.is_empty() {
            out.push((literals.len() + 127) as u8);
            out.extend_from_slice(literals);
        }
    }

    /// Decode a complete RLE buffer; used by tooling.
    pub fn rle_decode(data: &[u8]) -> Result<Vec<u8>, QgfError> {
        let mut out = Vec::new();
        let mut i = 0;
        while i < data.len() {
            let marker = data[i];
            i += 1;
            match marker {
                0 => return Err(QgfError::CorruptRle),
                1..=127 => {
                    let value = *data.get(i).ok_or(QgfError::Truncated)?;
                    i += 1;
                    out.extend(core::iter::repeat(value).take(marker as usize));
                }
                _ => {
                    let count = usize::from(marker - 127);
                    let literals = data.get(i..i + count).ok_or(QgfError::Truncated)?;
                    out.extend_from_slice(literals);
                    i += count;
                }
            }
        }
        Ok(out)
    }
}

#[cfg(feature = "alloc")]
pub use encode::{pack_indices, rle_decode, rle_encode, MAX_LITERAL, MAX_RUN};

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::stream::MemoryStream;
    use std::vec::Vec;

    fn drain<B: ByteSource>(input: &mut B, n: usize) -> Result<Vec<u8>, QgfError> {
        (0..n).map(|_| input.next_byte()).collect()
    }

    #[test]
    fn test_rle_repeat_and_literal() {
        // 3 x 0xAA, then literals 1 2
        let data = [3u8, 0xAA, 129, 1, 2];
        let mut input = RleInput::new(MemoryStream::new(&data));
        assert_eq!(drain(&mut input, 5), Ok(std::vec![0xAA, 0xAA, 0xAA, 1, 2]));
        assert_eq!(input.mode(), RleMode::MarkerByte);
    }

    #[test]
    fn test_rle_state_spans_calls() {
        let data = [4u8, 7];
        let mut input = RleInput::new(MemoryStream::new(&data));
        assert_eq!(input.next_byte(), Ok(7));
        assert_eq!(input.mode(), RleMode::RepeatingRun);
        assert_eq!(input.remain(), 3);
    }

    #[test]
    fn test_rle_marker_zero_is_corrupt() {
        let data = [0u8, 1];
        let mut input = RleInput::new(MemoryStream::new(&data));
        assert_eq!(input.next_byte(), Err(QgfError::CorruptRle));
    }

    #[test]
    fn test_rle_truncated() {
        let data = [130u8, 1];
        let mut input = RleInput::new(MemoryStream::new(&data));
        assert_eq!(input.next_byte(), Ok(1));
        assert_eq!(input.next_byte(), Err(QgfError::Truncated));
    }

    #[test]
    fn test_decode_palette_partial_final_byte() {
        // 2bpp, 5 pixels: 0b11_10_01_00, then 0b??_??_??_10
        let data = [0b1110_0100u8, 0b1111_1110];
        let mut input = UncompressedInput::new(MemoryStream::new(&data));
        let mut out = Vec::new();
        decode_palette(5, 2, &mut input, &[], |_, idx| {
            out.push(idx);
            Ok(())
        })
        .unwrap();
        assert_eq!(out, [0, 1, 2, 3, 2]);
    }

    #[test]
    fn test_decode_palette_rejects_bad_bpp() {
        let mut input = UncompressedInput::new(MemoryStream::new(&[0u8]));
        let r = decode_palette(1, 3, &mut input, &[], |_, _| Ok(()));
        assert_eq!(r, Err(PainterError::Format(QgfError::UnsupportedFormat)));
    }

    #[derive(Default)]
    struct MonoSink {
        converted: usize,
        seen: Vec<PixelColor>,
    }

    impl PixelSink for MonoSink {
        fn convert_palette(&mut self, palette: &mut [PixelColor]) -> Result<(), PainterError> {
            self.converted += 1;
            for e in palette.iter_mut() {
                *e = PixelColor::Mono(e.as_hsv().map_or(0, |h| h.v));
            }
            Ok(())
        }

        fn push(&mut self, palette: &[PixelColor], index: u8) -> Result<(), PainterError> {
            self.seen.push(palette[index as usize]);
            Ok(())
        }
    }

    #[test]
    fn test_recolor_converts_only_on_regenerate() {
        let mut cache = PaletteCache::new();
        let mut sink = MonoSink::default();
        let data = [0b10u8, 0b01];
        for _ in 0..2 {
            let mut input = UncompressedInput::new(MemoryStream::new(&data));
            decode_grayscale(&mut cache, 2, 1, &mut input, &mut sink).unwrap();
        }
        // 1bpp: bit0 of 0b10 is 0 (black), bit0 of 0b01 is 1 (white)
        assert_eq!(
            sink.seen,
            [PixelColor::Mono(0), PixelColor::Mono(255), PixelColor::Mono(0), PixelColor::Mono(255)]
        );
        assert_eq!(sink.converted, 1);
    }

    #[test]
    fn test_pixel_input_restart() {
        let data = [5u8, 9, 2, 3];
        let mut input = PixelInput::new(Compression::Rle, MemoryStream::new(&data));
        assert_eq!(input.next_byte(), Ok(9));
        input.restart_at(2);
        assert_eq!(input.next_byte(), Ok(3));
        assert_eq!(input.next_byte(), Ok(3));
        assert_eq!(Compression::try_from(2), Err(QgfError::UnsupportedCompression));
    }

    #[cfg(feature = "alloc")]
    #[test]
    fn test_rle_encode_run_boundaries() {
        let mut data = std::vec![1u8; 127];
        data.extend([2u8; 128]);
        data.push(3);
        let encoded = rle_encode(&data);
        assert_eq!(&encoded[..2], &[127, 1]);
        assert_eq!(rle_decode(&encoded), Ok(data));
    }

    #[cfg(feature = "alloc")]
    #[test]
    fn test_pack_indices_lsb_first() {
        assert_eq!(pack_indices(&[1, 0, 1, 1, 0, 0, 0, 0, 1], 1), Ok(std::vec![0b0000_1101, 0b1]));
        assert_eq!(pack_indices(&[0xA, 0x5], 4), Ok(std::vec![0x5A]));
    }
}
