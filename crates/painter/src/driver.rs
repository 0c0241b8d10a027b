//! Panel driver contract.
//!
//! A driver knows its panel's command set and native pixel format; the
//! device core only ever talks to it through these operations.

use crate::color::PixelColor;
use crate::comms::PainterComms;
use crate::device::Geometry;
use crate::error::PainterError;

/// Operations every panel driver provides.
pub trait PainterDriver {
    /// Bits per native pixel on the wire: 1, 2, 4, 8, 16 or 24.
    fn native_bits_per_pixel(&self) -> u8;

    fn init(
        &mut self,
        comms: &mut dyn PainterComms,
        geometry: &Geometry,
    ) -> Result<(), PainterError>;
    fn power(&mut self, comms: &mut dyn PainterComms, on: bool) -> Result<(), PainterError>;
    fn clear(
        &mut self,
        comms: &mut dyn PainterComms,
        geometry: &Geometry,
    ) -> Result<(), PainterError>;
    fn flush(&mut self, comms: &mut dyn PainterComms) -> Result<(), PainterError>;

    /// Address the inclusive window that following pixel data fills,
    /// row-major, wrapping at `right`.
    fn viewport(
        &mut self,
        comms: &mut dyn PainterComms,
        geometry: &Geometry,
        left: u16,
        top: u16,
        right: u16,
        bottom: u16,
    ) -> Result<(), PainterError>;

    /// Stream `pixel_count` native pixels from `pixels` into the viewport.
    fn pixdata(
        &mut self,
        comms: &mut dyn PainterComms,
        pixels: &[u8],
        pixel_count: u32,
    ) -> Result<(), PainterError>;

    /// Convert HSV entries to native pixels in place.
    fn palette_convert(&mut self, palette: &mut [PixelColor]) -> Result<(), PainterError>;

    /// Write the native pixels for `indices` into `target`, starting at pixel
    /// `pixel_offset`.
    fn append_pixels(
        &self,
        target: &mut [u8],
        palette: &[PixelColor],
        pixel_offset: u32,
        indices: &[u8],
    ) -> Result<(), PainterError>;
}

/// `palette_convert` for RGB565 panels.
pub fn rgb565_palette_convert(palette: &mut [PixelColor]) -> Result<(), PainterError> {
    for entry in palette.iter_mut() {
        *entry = PixelColor::Rgb565(entry.to_rgb565().ok_or(PainterError::Driver)?);
    }
    Ok(())
}

/// `append_pixels` for RGB565 panels: two bytes per pixel, big-endian.
pub fn append_pixels_rgb565(
    target: &mut [u8],
    palette: &[PixelColor],
    pixel_offset: u32,
    indices: &[u8],
) -> Result<(), PainterError> {
    for (i, &index) in indices.iter().enumerate() {
        let value = palette
            .get(usize::from(index))
            .and_then(PixelColor::as_rgb565)
            .ok_or(PainterError::Driver)?;
        let at = (pixel_offset as usize + i) * 2;
        target
            .get_mut(at..at + 2)
            .ok_or(PainterError::BufferOverflow)?
            .copy_from_slice(&value.to_be_bytes());
    }
    Ok(())
}
