//! JSON manifests describing images and fonts to encode.

use anyhow::{ensure, Context, Result};
use qp_painter::codec::Compression;
use qp_painter::qff::QffEncoder;
use qp_painter::qgf::{DeltaRect, FrameSpec, ImageFormat, QgfEncoder};
use qp_painter::Hsv888;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatName {
    Gray1,
    Gray2,
    Gray4,
    Gray8,
    Palette1,
    Palette2,
    Palette4,
    Palette8,
}

impl From<FormatName> for ImageFormat {
    fn from(name: FormatName) -> Self {
        match name {
            FormatName::Gray1 => Self::Grayscale1Bpp,
            FormatName::Gray2 => Self::Grayscale2Bpp,
            FormatName::Gray4 => Self::Grayscale4Bpp,
            FormatName::Gray8 => Self::Grayscale8Bpp,
            FormatName::Palette1 => Self::Palette1Bpp,
            FormatName::Palette2 => Self::Palette2Bpp,
            FormatName::Palette4 => Self::Palette4Bpp,
            FormatName::Palette8 => Self::Palette8Bpp,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionName {
    #[default]
    None,
    Rle,
}

impl From<CompressionName> for Compression {
    fn from(name: CompressionName) -> Self {
        match name {
            CompressionName::None => Self::None,
            CompressionName::Rle => Self::Rle,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Rect {
    pub left: u16,
    pub top: u16,
    pub right: u16,
    pub bottom: u16,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FrameManifest {
    pub format: FormatName,
    #[serde(default)]
    pub compression: CompressionName,
    /// Milliseconds.
    #[serde(default)]
    pub delay: u16,
    #[serde(default)]
    pub transparency_index: Option<u8>,
    #[serde(default)]
    pub delta: Option<Rect>,
    /// `[h, s, v]` triplets.
    #[serde(default)]
    pub palette: Vec<[u8; 3]>,
    pub pixels: Vec<u8>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageManifest {
    pub width: u16,
    pub height: u16,
    pub frames: Vec<FrameManifest>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlyphManifest {
    #[serde(rename = "char")]
    pub code_point: char,
    pub width: u8,
    pub pixels: Vec<u8>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FontManifest {
    pub line_height: u8,
    pub format: FormatName,
    #[serde(default)]
    pub compression: CompressionName,
    #[serde(default)]
    pub palette: Vec<[u8; 3]>,
    pub glyphs: Vec<GlyphManifest>,
}

pub fn load<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw =
        std::fs::read(path).with_context(|| format!("reading manifest '{}'", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("parsing manifest '{}'", path.display()))
}

fn hsv_palette(triplets: &[[u8; 3]]) -> Vec<Hsv888> {
    triplets.iter().map(|&[h, s, v]| Hsv888::new(h, s, v)).collect()
}

impl ImageManifest {
    pub fn encode(&self) -> Result<Vec<u8>> {
        ensure!(!self.frames.is_empty(), "image manifest has no frames");
        let mut encoder = QgfEncoder::new(self.width, self.height);
        for (i, frame) in self.frames.iter().enumerate() {
            let palette = hsv_palette(&frame.palette);
            let spec = FrameSpec {
                format: frame.format.into(),
                compression: frame.compression.into(),
                delay: frame.delay,
                transparency_index: frame.transparency_index,
                delta: frame.delta.map(|r| DeltaRect {
                    left: r.left,
                    top: r.top,
                    right: r.right,
                    bottom: r.bottom,
                }),
                palette: &palette,
                pixels: &frame.pixels,
            };
            encoder.add_frame(&spec).with_context(|| format!("encoding frame {i}"))?;
        }
        Ok(encoder.finish())
    }
}

impl FontManifest {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut encoder =
            QffEncoder::new(self.line_height, self.format.into(), self.compression.into());
        if !self.palette.is_empty() {
            encoder.set_palette(&hsv_palette(&self.palette)).context("setting font palette")?;
        }
        for glyph in &self.glyphs {
            encoder
                .add_glyph(glyph.code_point, glyph.width, &glyph.pixels)
                .with_context(|| format!("encoding glyph {:?}", glyph.code_point))?;
        }
        encoder.finish().context("finishing font")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qp_painter::{MemoryStream, QffFont, QgfImage};

    #[test]
    fn image_manifest_encodes() {
        let manifest: ImageManifest = serde_json::from_str(
            r#"{
                "width": 2, "height": 2,
                "frames": [
                    { "format": "palette1", "compression": "rle", "delay": 40,
                      "palette": [[0, 0, 0], [0, 0, 255]], "pixels": [0, 1, 1, 0] },
                    { "format": "gray1", "delta": { "left": 0, "top": 0, "right": 0, "bottom": 0 },
                      "pixels": [1] }
                ]
            }"#,
        )
        .unwrap();
        let bytes = manifest.encode().unwrap();
        let mut image = QgfImage::load(MemoryStream::new(&bytes)).unwrap();
        assert_eq!(image.frame_count(), 2);
        assert_eq!(image.frame_info(0).unwrap().delay, 40);
        assert!(image.frame_info(1).unwrap().is_delta);
    }

    #[test]
    fn wrong_pixel_count_names_the_frame() {
        let manifest: ImageManifest = serde_json::from_str(
            r#"{ "width": 2, "height": 2, "frames": [{ "format": "gray1", "pixels": [1] }] }"#,
        )
        .unwrap();
        let err = manifest.encode().unwrap_err();
        assert!(format!("{err:#}").contains("frame 0"));
    }

    #[test]
    fn font_manifest_encodes() {
        let manifest: FontManifest = serde_json::from_str(
            r#"{ "line_height": 1, "format": "gray1",
                 "glyphs": [{ "char": "a", "width": 2, "pixels": [1, 0] },
                            { "char": "λ", "width": 1, "pixels": [1] }] }"#,
        )
        .unwrap();
        let bytes = manifest.encode().unwrap();
        let mut font = QffFont::load(MemoryStream::new(&bytes)).unwrap();
        assert_eq!(font.ascii_glyph(u32::from('a')).unwrap().map(|g| g.width), Some(2));
        assert_eq!(font.unicode_entry(0).unwrap().map(|(cp, _)| cp), Some(u32::from('λ')));
    }

    #[test]
    fn image_without_frames_is_refused() {
        let manifest: ImageManifest =
            serde_json::from_str(r#"{ "width": 2, "height": 2, "frames": [] }"#).unwrap();
        let err = manifest.encode().unwrap_err();
        assert!(err.to_string().contains("no frames"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let parsed: Result<FontManifest, _> = serde_json::from_str(
            r#"{ "line_height": 1, "format": "gray1", "glyphs": [], "kerning": 1 }"#,
        );
        assert!(parsed.is_err());
    }
}
