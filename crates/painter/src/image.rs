//! Image drawing and frame-by-frame animation.

use crate::codec::{decode_palette, decode_recolor, PixelInput, PixelSink};
use crate::color::Hsv888;
use crate::comms::PainterComms;
use crate::device::PainterDevice;
use crate::driver::PainterDriver;
use crate::error::{PainterError, QgfError};
use crate::palette::{PaletteCache, PALETTE_CAPACITY};
use crate::qgf::{FrameInfo, QgfImage};
use crate::stream::{BoundedStream, Stream};

/// Load `length` bytes of HSV triplets at `offset` into the cache.
pub(crate) fn load_palette<S: Stream + ?Sized>(
    stream: &mut S,
    offset: u32,
    length: u32,
    cache: &mut PaletteCache,
) -> Result<(), PainterError> {
    let mut triplets = [0u8; PALETTE_CAPACITY * 3];
    let bytes = triplets.get_mut(..length as usize).ok_or(PainterError::PaletteTooLarge)?;
    stream.set_pos(offset);
    if stream.read(bytes) != bytes.len() {
        return Err(QgfError::Truncated.into());
    }
    cache.load_hsv_triplets(bytes)?;
    Ok(())
}

/// Inclusive on-panel rectangle for a `w` x `h` block at `(x, y)`.
pub(crate) fn placed_rect(
    x: u32,
    y: u32,
    w: u32,
    h: u32,
) -> Result<(u16, u16, u16, u16), PainterError> {
    let right = x + w - 1;
    let bottom = y + h - 1;
    if right > u32::from(u16::MAX) || bottom > u32::from(u16::MAX) {
        return Err(PainterError::InvalidCoordinates);
    }
    Ok((x as u16, y as u16, right as u16, bottom as u16))
}

impl<D: PainterDriver, C: PainterComms, const BUF: usize> PainterDevice<D, C, BUF> {
    /// Draw frame 0; grayscale frames render white on black.
    pub fn drawimage<S: Stream>(
        &mut self,
        x: u16,
        y: u16,
        image: &mut QgfImage<S>,
    ) -> Result<(), PainterError> {
        self.drawimage_recolor(x, y, image, Hsv888::WHITE, Hsv888::BLACK)
    }

    /// Draw frame 0, ramping grayscale levels from `bg` to `fg`.
    pub fn drawimage_recolor<S: Stream>(
        &mut self,
        x: u16,
        y: u16,
        image: &mut QgfImage<S>,
        fg: Hsv888,
        bg: Hsv888,
    ) -> Result<(), PainterError> {
        self.drawimage_frame(x, y, image, 0, fg, bg).map(|_| ())
    }

    /// Draw one frame. Delta frames land in their delta rectangle, offset by
    /// `(x, y)`.
    pub fn drawimage_frame<S: Stream>(
        &mut self,
        x: u16,
        y: u16,
        image: &mut QgfImage<S>,
        frame: u16,
        fg: Hsv888,
        bg: Hsv888,
    ) -> Result<FrameInfo, PainterError> {
        self.bracket("drawimage", |dev| dev.drawimage_impl(x, y, image, frame, fg, bg))
    }

    fn drawimage_impl<S: Stream>(
        &mut self,
        x: u16,
        y: u16,
        image: &mut QgfImage<S>,
        frame: u16,
        fg: Hsv888,
        bg: Hsv888,
    ) -> Result<FrameInfo, PainterError> {
        let info = image.frame_info(frame)?;
        let (w, h, dx, dy) = match info.delta {
            Some(rect) => (rect.width(), rect.height(), rect.left, rect.top),
            None => (u32::from(image.width()), u32::from(image.height()), 0, 0),
        };
        if w == 0 || h == 0 {
            return Ok(info);
        }
        let (left, top, right, bottom) =
            placed_rect(u32::from(x) + u32::from(dx), u32::from(y) + u32::from(dy), w, h)?;

        let (mut appender, cache) = self.decode_parts();
        appender.viewport(left, top, right, bottom)?;

        let stream = image.stream_mut();
        let pixel_count = w * h;
        if let Some(offset) = info.palette_offset {
            load_palette(stream, offset, info.format.palette_length(), cache)?;
            appender.convert(cache.entries_mut())?;
            let data = BoundedStream::new(&mut *stream, info.data_offset, info.data_length);
            let mut input = PixelInput::new(info.compression, data);
            decode_palette(pixel_count, info.bpp, &mut input, cache.entries(), |palette, index| {
                appender.push(palette, index)
            })?;
        } else {
            let data = BoundedStream::new(&mut *stream, info.data_offset, info.data_length);
            let mut input = PixelInput::new(info.compression, data);
            decode_recolor(cache, pixel_count, info.bpp, &mut input, fg, bg, &mut appender)?;
        }

        appender.flush()?;
        Ok(info)
    }
}

/// Cursor over an image's frames.
///
/// Each [`step`](Animation::step) draws the current frame and returns its
/// delay, so a caller's scheduler knows when to step again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Animation {
    x: u16,
    y: u16,
    frame: u16,
    fg: Hsv888,
    bg: Hsv888,
}

impl Animation {
    pub fn new(x: u16, y: u16) -> Self {
        Self::with_colors(x, y, Hsv888::WHITE, Hsv888::BLACK)
    }

    pub fn with_colors(x: u16, y: u16, fg: Hsv888, bg: Hsv888) -> Self {
        Self { x, y, frame: 0, fg, bg }
    }

    pub fn current_frame(&self) -> u16 {
        self.frame
    }

    pub fn reset(&mut self) {
        self.frame = 0;
    }

    /// Draw the current frame, advance (wrapping) and return the delay in ms.
    pub fn step<D, C, S, const BUF: usize>(
        &mut self,
        device: &mut PainterDevice<D, C, BUF>,
        image: &mut QgfImage<S>,
    ) -> Result<u16, PainterError>
    where
        D: PainterDriver,
        C: PainterComms,
        S: Stream,
    {
        let info = device.drawimage_frame(self.x, self.y, image, self.frame, self.fg, self.bg)?;
        self.frame = (self.frame + 1) % image.frame_count().max(1);
        Ok(info.delay)
    }
}
