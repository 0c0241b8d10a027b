//! Text layout over QFF fonts.
//!
//! Glyphs are drawn left to right along one baseline-free row: each glyph is
//! its own `width x line_height` viewport at the pen position, and the pen
//! advances by the glyph width. There is no kerning and no line wrapping.

use crate::codec::{decode_palette, decode_recolor, PixelInput, PixelSink};
use crate::color::Hsv888;
use crate::comms::PainterComms;
use crate::device::PainterDevice;
use crate::driver::PainterDriver;
use crate::error::PainterError;
use crate::image::{load_palette, placed_rect};
use crate::qff::{Glyph, QffFont};
use crate::stream::{BoundedStream, Stream};

/// Find the glyph for one code point: the ASCII table first, then the
/// Unicode table.
pub fn resolve_glyph<S: Stream>(
    font: &mut QffFont<S>,
    code_point: char,
) -> Result<Glyph, PainterError> {
    let cp = u32::from(code_point);
    if let Some(glyph) = font.ascii_glyph(cp)? {
        return Ok(glyph);
    }
    #[cfg(feature = "unicode")]
    if let Some(glyph) = font.unicode_glyph(cp)? {
        return Ok(glyph);
    }
    log::debug!("text: no glyph for U+{cp:04X}");
    Err(PainterError::MissingGlyph)
}

/// Resolve every code point of `text` in order and hand it to `handler`.
///
/// Stops at the first missing glyph or handler error.
pub fn iterate_code_points<S, F>(
    font: &mut QffFont<S>,
    text: &str,
    mut handler: F,
) -> Result<(), PainterError>
where
    S: Stream,
    F: FnMut(&mut QffFont<S>, char, Glyph) -> Result<(), PainterError>,
{
    for ch in text.chars() {
        let glyph = resolve_glyph(font, ch)?;
        handler(font, ch, glyph)?;
    }
    Ok(())
}

/// Total advance of `text` in pixels.
pub fn text_width<S: Stream>(font: &mut QffFont<S>, text: &str) -> Result<u32, PainterError> {
    let mut width = 0u32;
    iterate_code_points(font, text, |_, _, glyph| {
        width += u32::from(glyph.width);
        Ok(())
    })?;
    Ok(width)
}

impl<D: PainterDriver, C: PainterComms, const BUF: usize> PainterDevice<D, C, BUF> {
    /// Draw `text` with its top-left corner at `(x, y)`, white on black for
    /// grayscale fonts. Returns the horizontal advance.
    pub fn drawtext<S: Stream>(
        &mut self,
        x: u16,
        y: u16,
        font: &mut QffFont<S>,
        text: &str,
    ) -> Result<u32, PainterError> {
        self.drawtext_recolor(x, y, font, text, Hsv888::WHITE, Hsv888::BLACK)
    }

    pub fn drawtext_recolor<S: Stream>(
        &mut self,
        x: u16,
        y: u16,
        font: &mut QffFont<S>,
        text: &str,
        fg: Hsv888,
        bg: Hsv888,
    ) -> Result<u32, PainterError> {
        self.bracket("drawtext", |dev| dev.drawtext_impl(x, y, font, text, fg, bg))
    }

    fn drawtext_impl<S: Stream>(
        &mut self,
        x: u16,
        y: u16,
        font: &mut QffFont<S>,
        text: &str,
        fg: Hsv888,
        bg: Hsv888,
    ) -> Result<u32, PainterError> {
        let layout = *font.layout();
        let desc = layout.descriptor;
        let bpp = desc.format.bpp();
        let height = u32::from(desc.line_height);

        let (mut appender, cache) = self.decode_parts();
        if let Some(offset) = layout.palette_offset {
            load_palette(font.stream_mut(), offset, desc.format.palette_length(), cache)?;
            appender.convert(cache.entries_mut())?;
        }

        let mut pen = u32::from(x);
        iterate_code_points(font, text, |font, _, glyph| {
            let width = u32::from(glyph.width);
            if height > 0 {
                let (left, top, right, bottom) = placed_rect(pen, u32::from(y), width, height)?;
                appender.reset();
                appender.viewport(left, top, right, bottom)?;

                let data =
                    BoundedStream::new(font.stream_mut(), layout.data_offset, layout.data_length);
                let mut input = PixelInput::new(desc.compression, data);
                input.restart_at(layout.data_offset + glyph.offset);
                let pixel_count = width * height;
                if layout.palette_offset.is_some() {
                    decode_palette(pixel_count, bpp, &mut input, cache.entries(), |palette, index| {
                        appender.push(palette, index)
                    })?;
                } else {
                    decode_recolor(cache, pixel_count, bpp, &mut input, fg, bg, &mut appender)?;
                }
                appender.flush()?;
            }
            pen += width;
            Ok(())
        })?;

        Ok(pen - u32::from(x))
    }
}
