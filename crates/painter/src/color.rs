//! Pixel colour representations and conversions.
//!
//! Conversions only go one way: HSV to RGB to a packed native form. Nothing is
//! colour-managed and packing truncates (no rounding, no dithering).

use embedded_graphics::pixelcolor::{self as eg, RgbColor};

/// 8-bit hue/saturation/value. Hue maps `[0, 360)` degrees onto `[0, 255]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Hsv888 {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

impl Hsv888 {
    pub const WHITE: Self = Self::new(0, 0, 255);
    pub const BLACK: Self = Self::new(0, 0, 0);

    pub const fn new(h: u8, s: u8, v: u8) -> Self {
        Self { h, s, v }
    }
}

/// 8-bit red/green/blue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Rgb888 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb888 {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl From<eg::Rgb888> for Rgb888 {
    fn from(c: eg::Rgb888) -> Self {
        Self::new(c.r(), c.g(), c.b())
    }
}

impl From<Rgb888> for eg::Rgb888 {
    fn from(c: Rgb888) -> Self {
        eg::Rgb888::new(c.r, c.g, c.b)
    }
}

/// A single pixel in whichever interpretation the current stage of the
/// pipeline needs.
///
/// Palette entries start life as `Hsv888` and are converted in place by the
/// panel driver into its native form (typically `Rgb565`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelColor {
    Mono(u8),
    PaletteIndex(u8),
    Hsv888(Hsv888),
    Rgb888(Rgb888),
    Rgb565(u16),
    Raw(u32),
}

impl Default for PixelColor {
    fn default() -> Self {
        Self::Raw(0)
    }
}

impl PixelColor {
    pub fn as_hsv(&self) -> Option<Hsv888> {
        match *self {
            Self::Hsv888(hsv) => Some(hsv),
            _ => None,
        }
    }

    pub fn as_rgb565(&self) -> Option<u16> {
        match *self {
            Self::Rgb565(v) => Some(v),
            _ => None,
        }
    }

    /// Resolve to packed RGB565, converting through RGB888 where needed.
    ///
    /// Indices and raw words carry no colour on their own and yield `None`.
    pub fn to_rgb565(self) -> Option<u16> {
        match self {
            Self::Hsv888(hsv) => Some(hsv_to_rgb565(hsv)),
            Self::Rgb888(rgb) => Some(rgb888_to_rgb565(rgb.r, rgb.g, rgb.b)),
            Self::Rgb565(v) => Some(v),
            Self::Mono(m) => Some(rgb888_to_rgb565(m, m, m)),
            Self::PaletteIndex(_) | Self::Raw(_) => None,
        }
    }
}

impl From<Hsv888> for PixelColor {
    fn from(hsv: Hsv888) -> Self {
        Self::Hsv888(hsv)
    }
}

/// Integer six-region HSV to RGB conversion.
pub fn hsv_to_rgb(hsv: Hsv888) -> Rgb888 {
    let Hsv888 { h, s, v } = hsv;
    if s == 0 {
        return Rgb888::new(v, v, v);
    }

    let (h, s, v) = (u16::from(h), u16::from(s), u16::from(v));
    let region = h * 6 / 255;
    let remainder = (h * 2 - region * 85) * 3;

    let p = ((v * (255 - s)) >> 8) as u8;
    let q = ((v * (255 - ((s * remainder) >> 8))) >> 8) as u8;
    let t = ((v * (255 - ((s * (255 - remainder)) >> 8))) >> 8) as u8;
    let v = v as u8;

    match region {
        0 | 6 => Rgb888::new(v, t, p),
        1 => Rgb888::new(q, v, p),
        2 => Rgb888::new(p, v, t),
        3 => Rgb888::new(p, q, v),
        4 => Rgb888::new(t, p, v),
        _ => Rgb888::new(v, p, q),
    }
}

/// Pack to 5/6/5 with red in the high bits.
pub const fn rgb888_to_rgb565(r: u8, g: u8, b: u8) -> u16 {
    (((r as u16) >> 3) << 11) | (((g as u16) >> 2) << 5) | ((b as u16) >> 3)
}

/// Pack to 5/6/5 with blue in the high bits.
pub const fn rgb888_to_bgr565(r: u8, g: u8, b: u8) -> u16 {
    rgb888_to_rgb565(b, g, r)
}

pub fn hsv_to_rgb565(hsv: Hsv888) -> u16 {
    let rgb = hsv_to_rgb(hsv);
    rgb888_to_rgb565(rgb.r, rgb.g, rgb.b)
}

/// Wire order for 16bpp panels: most significant byte first.
pub const fn rgb565_wire_bytes(value: u16) -> [u8; 2] {
    value.to_be_bytes()
}

pub fn rgb565_to_eg(value: u16) -> eg::Rgb565 {
    eg::Rgb565::new((value >> 11) as u8, ((value >> 5) & 0x3F) as u8, (value & 0x1F) as u8)
}

pub fn eg_to_rgb565(color: eg::Rgb565) -> u16 {
    (u16::from(color.r()) << 11) | (u16::from(color.g()) << 5) | u16::from(color.b())
}
