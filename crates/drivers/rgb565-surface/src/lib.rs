//! In-memory RGB565 panel.
//!
//! Plays the part of a panel controller without a bus: viewports and pixel
//! data land in a caller-provided framebuffer (two bytes per pixel, big-endian,
//! row-major). Useful on targets that scan out from RAM and for host-side
//! rendering.

#![no_std]

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use qp_painter::color::{eg_to_rgb565, rgb565_to_eg};
use qp_painter::driver::{append_pixels_rgb565, rgb565_palette_convert};
use qp_painter::{
    Geometry, PainterComms, PainterDevice, PainterDriver, PainterError, PixelColor, Rotation,
};

const BYTES_PER_PIXEL: usize = 2;

/// Address window set by the last viewport, in logical coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Window {
    left: u16,
    top: u16,
    right: u16,
    bottom: u16,
}

/// Framebuffer-backed RGB565 driver.
pub struct Rgb565Surface<'a> {
    fb: &'a mut [u8],
    ram_width: u16,
    ram_height: u16,
    geometry: Option<Geometry>,
    window: Window,
    cursor: (u16, u16),
    dirty: Option<Rectangle>,
    powered: bool,
    flushes: u32,
}

impl<'a> Rgb565Surface<'a> {
    /// Wrap `fb` as a `ram_width x ram_height` controller RAM.
    pub fn new(fb: &'a mut [u8], ram_width: u16, ram_height: u16) -> Result<Self, PainterError> {
        let needed = usize::from(ram_width) * usize::from(ram_height) * BYTES_PER_PIXEL;
        if ram_width == 0 || ram_height == 0 || fb.len() < needed {
            log::warn!("surface: {} byte buffer for {ram_width}x{ram_height}", fb.len());
            return Err(PainterError::InvalidConfig);
        }
        Ok(Self {
            fb,
            ram_width,
            ram_height,
            geometry: None,
            window: Window {
                left: 0,
                top: 0,
                right: 0,
                bottom: 0,
            },
            cursor: (0, 0),
            dirty: None,
            powered: false,
            flushes: 0,
        })
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }

    pub fn flushes(&self) -> u32 {
        self.flushes
    }

    /// Region written since the last flush, in RAM coordinates.
    pub fn dirty(&self) -> Option<Rectangle> {
        self.dirty
    }

    /// Pixel at RAM position `(x, y)`.
    pub fn pixel(&self, x: u16, y: u16) -> Option<u16> {
        let at = self.ram_index(x, y)?;
        Some(u16::from_be_bytes([self.fb[at], self.fb[at + 1]]))
    }

    pub fn framebuffer(&self) -> &[u8] {
        self.fb
    }

    /// Region to copy out: all of RAM, or what changed since the last copy.
    fn blit_area(&self, entire: bool) -> Option<Rectangle> {
        if entire {
            Some(Rectangle::new(Point::zero(), self.size()))
        } else {
            self.dirty
        }
    }

    /// Copy into an embedded-graphics target with RAM origin at `(x, y)`.
    ///
    /// With `entire == false` only the dirty region is copied. The dirty
    /// region is cleared on success.
    pub fn draw_to<T>(
        &mut self,
        target: &mut T,
        x: i32,
        y: i32,
        entire: bool,
    ) -> Result<(), T::Error>
    where
        T: DrawTarget<Color = Rgb565>,
    {
        let Some(area) = self.blit_area(entire) else {
            return Ok(());
        };
        let colors =
            area.points().map(|p| rgb565_to_eg(self.pixel(p.x as u16, p.y as u16).unwrap_or(0)));
        target.fill_contiguous(&area.translate(Point::new(x, y)), colors)?;
        self.dirty = None;
        Ok(())
    }

    /// Stream into another 16bpp painter device with RAM origin at `(x, y)`,
    /// one row per pixel transfer.
    pub fn blit_to<D, C, const BUF: usize>(
        &mut self,
        device: &mut PainterDevice<D, C, BUF>,
        x: u16,
        y: u16,
        entire: bool,
    ) -> Result<(), PainterError>
    where
        D: PainterDriver,
        C: PainterComms,
    {
        if device.driver().native_bits_per_pixel() != 16 {
            return Err(PainterError::InvalidConfig);
        }
        let Some(area) = self.blit_area(entire) else {
            return Ok(());
        };
        let Some(bottom_right) = area.bottom_right() else {
            return Ok(());
        };
        let (left, top) = (area.top_left.x as u16, area.top_left.y as u16);
        let (right, bottom) = (bottom_right.x as u16, bottom_right.y as u16);
        let place =
            |origin: u16, v: u16| origin.checked_add(v).ok_or(PainterError::InvalidCoordinates);

        device.viewport(place(x, left)?, place(y, top)?, place(x, right)?, place(y, bottom)?)?;
        let row_pixels = u32::from(right - left) + 1;
        for row in top..=bottom {
            let start = (usize::from(row) * usize::from(self.ram_width) + usize::from(left))
                * BYTES_PER_PIXEL;
            let end = start + row_pixels as usize * BYTES_PER_PIXEL;
            device.pixdata(&self.fb[start..end], row_pixels)?;
        }
        self.dirty = None;
        Ok(())
    }

    fn ram_index(&self, x: u16, y: u16) -> Option<usize> {
        (x < self.ram_width && y < self.ram_height).then(|| {
            (usize::from(y) * usize::from(self.ram_width) + usize::from(x)) * BYTES_PER_PIXEL
        })
    }

    /// Map a logical pixel through rotation and the visible-window offset.
    fn to_ram(geometry: &Geometry, x: u16, y: u16) -> Option<(u16, u16)> {
        let (w, h) = (geometry.panel_width, geometry.panel_height);
        let (px, py) = match geometry.rotation {
            Rotation::R0 => (x, y),
            Rotation::R90 => (w.checked_sub(1)?.checked_sub(y)?, x),
            Rotation::R180 => (
                w.checked_sub(1)?.checked_sub(x)?,
                h.checked_sub(1)?.checked_sub(y)?,
            ),
            Rotation::R270 => (y, h.checked_sub(1)?.checked_sub(x)?),
        };
        if px >= w || py >= h {
            return None;
        }
        Some((px.checked_add(geometry.offset_x)?, py.checked_add(geometry.offset_y)?))
    }

    fn write_ram(&mut self, x: u16, y: u16, value: u16) {
        if let Some(at) = self.ram_index(x, y) {
            self.fb[at..at + BYTES_PER_PIXEL].copy_from_slice(&value.to_be_bytes());
            let point = Rectangle::new(Point::new(i32::from(x), i32::from(y)), Size::new(1, 1));
            self.dirty = Some(match self.dirty {
                Some(rect) => envelope(rect, point),
                None => point,
            });
        }
    }
}

fn envelope(a: Rectangle, b: Rectangle) -> Rectangle {
    let (a0, b0) = (a.top_left, b.top_left);
    let a1 = a0 + a.size - Point::new(1, 1);
    let b1 = b0 + b.size - Point::new(1, 1);
    Rectangle::with_corners(
        Point::new(a0.x.min(b0.x), a0.y.min(b0.y)),
        Point::new(a1.x.max(b1.x), a1.y.max(b1.y)),
    )
}

impl PainterDriver for Rgb565Surface<'_> {
    fn native_bits_per_pixel(&self) -> u8 {
        16
    }

    fn init(&mut self, _: &mut dyn PainterComms, geometry: &Geometry) -> Result<(), PainterError> {
        let width = u32::from(geometry.panel_width) + u32::from(geometry.offset_x);
        let height = u32::from(geometry.panel_height) + u32::from(geometry.offset_y);
        if width > u32::from(self.ram_width) || height > u32::from(self.ram_height)
        {
            log::warn!("surface: panel does not fit controller RAM");
            return Err(PainterError::InvalidConfig);
        }
        self.geometry = Some(*geometry);
        self.powered = true;
        PainterDriver::clear(self, &mut qp_painter::NullComms, geometry)
    }

    fn power(&mut self, _: &mut dyn PainterComms, on: bool) -> Result<(), PainterError> {
        self.powered = on;
        Ok(())
    }

    fn clear(&mut self, _: &mut dyn PainterComms, _: &Geometry) -> Result<(), PainterError> {
        self.fb.fill(0);
        self.dirty = Some(Rectangle::new(
            Point::zero(),
            Size::new(u32::from(self.ram_width), u32::from(self.ram_height)),
        ));
        Ok(())
    }

    fn flush(&mut self, _: &mut dyn PainterComms) -> Result<(), PainterError> {
        if let Some(rect) = self.dirty.take() {
            log::trace!("surface: flush {:?}", rect);
        }
        self.flushes += 1;
        Ok(())
    }

    fn viewport(
        &mut self,
        _: &mut dyn PainterComms,
        geometry: &Geometry,
        left: u16,
        top: u16,
        right: u16,
        bottom: u16,
    ) -> Result<(), PainterError> {
        if left > right || top > bottom {
            return Err(PainterError::InvalidCoordinates);
        }
        self.geometry = Some(*geometry);
        self.window = Window {
            left,
            top,
            right,
            bottom,
        };
        self.cursor = (left, top);
        Ok(())
    }

    fn pixdata(
        &mut self,
        _: &mut dyn PainterComms,
        pixels: &[u8],
        pixel_count: u32,
    ) -> Result<(), PainterError> {
        let geometry = self.geometry.ok_or(PainterError::Driver)?;
        let bytes = pixels
            .get(..pixel_count as usize * BYTES_PER_PIXEL)
            .ok_or(PainterError::BufferOverflow)?;

        for px in bytes.chunks_exact(BYTES_PER_PIXEL) {
            let (x, y) = self.cursor;
            if y > self.window.bottom {
                // Past the end of the window; the controller drops it.
                break;
            }
            if let Some((rx, ry)) = Self::to_ram(&geometry, x, y) {
                self.write_ram(rx, ry, u16::from_be_bytes([px[0], px[1]]));
            }
            self.cursor = if x < self.window.right {
                (x + 1, y)
            } else {
                match y.checked_add(1) {
                    Some(next) => (self.window.left, next),
                    None => break,
                }
            };
        }
        Ok(())
    }

    fn palette_convert(&mut self, palette: &mut [PixelColor]) -> Result<(), PainterError> {
        rgb565_palette_convert(palette)
    }

    fn append_pixels(
        &self,
        target: &mut [u8],
        palette: &[PixelColor],
        pixel_offset: u32,
        indices: &[u8],
    ) -> Result<(), PainterError> {
        append_pixels_rgb565(target, palette, pixel_offset, indices)
    }
}

impl DrawTarget for Rgb565Surface<'_> {
    type Color = Rgb565;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if let (Ok(x), Ok(y)) = (u16::try_from(point.x), u16::try_from(point.y)) {
                self.write_ram(x, y, eg_to_rgb565(color));
            }
        }
        Ok(())
    }
}

impl OriginDimensions for Rgb565Surface<'_> {
    fn size(&self) -> Size {
        Size::new(u32::from(self.ram_width), u32::from(self.ram_height))
    }
}
