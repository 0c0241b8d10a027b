//! QFF fonts: lookup and drawing.

mod common;

use common::device;
use qp_painter::codec::Compression;
use qp_painter::color::hsv_to_rgb565;
use qp_painter::qff::QffEncoder;
use qp_painter::qgf::ImageFormat;
use qp_painter::text::text_width;
use qp_painter::{Hsv888, MemoryStream, PainterError, QffFont, QgfError};

// 3x2 'A' and 2x2 'B', one bit per pixel.
fn font(compression: Compression) -> Vec<u8> {
    let mut enc = QffEncoder::new(2, ImageFormat::Grayscale1Bpp, compression);
    enc.add_glyph('A', 3, &[1, 0, 1, 0, 1, 0]).unwrap();
    enc.add_glyph('B', 2, &[1, 1, 0, 0]).unwrap();
    enc.add_glyph('Ω', 1, &[1, 1]).unwrap();
    enc.finish().unwrap()
}

#[test]
fn draws_glyphs_side_by_side() {
    for compression in [Compression::None, Compression::Rle] {
        let bytes = font(compression);
        let mut font = QffFont::load(MemoryStream::new(&bytes)).unwrap();
        let mut dev = device(16, 4);

        assert_eq!(dev.drawtext(1, 1, &mut font, "AB"), Ok(5));

        let panel = dev.driver();
        assert_eq!(panel.viewports(), [(1, 1, 3, 2), (4, 1, 5, 2)]);
        let top: Vec<_> = (1..=5).map(|x| panel.pixel(x, 1)).collect();
        let bottom: Vec<_> = (1..=5).map(|x| panel.pixel(x, 2)).collect();
        let (on, off) = (Some(0xFFFF), Some(0x0000));
        assert_eq!(top, [on, off, on, on, on]);
        assert_eq!(bottom, [off, on, off, off, off]);
        assert_eq!(panel.pixels_streamed(), 10);
    }
}

#[test]
fn recolored_text() {
    let bytes = font(Compression::Rle);
    let mut font = QffFont::load(MemoryStream::new(&bytes)).unwrap();
    let mut dev = device(8, 2);
    let fg = Hsv888::new(170, 255, 255);
    dev.drawtext_recolor(0, 0, &mut font, "B", fg, Hsv888::BLACK).unwrap();
    assert_eq!(dev.driver().pixel(0, 0), Some(hsv_to_rgb565(fg)));
    assert_eq!(dev.driver().pixel(0, 1), Some(0));
}

#[cfg(feature = "unicode")]
#[test]
fn unicode_glyphs_resolve() {
    let bytes = font(Compression::None);
    let mut font = QffFont::load(MemoryStream::new(&bytes)).unwrap();
    assert_eq!(text_width(&mut font, "AΩB"), Ok(6));

    let mut dev = device(8, 2);
    assert_eq!(dev.drawtext(0, 0, &mut font, "Ω"), Ok(1));
    assert_eq!(dev.driver().viewports(), [(0, 0, 0, 1)]);
}

#[test]
fn missing_glyph_aborts_after_drawn_prefix() {
    let bytes = font(Compression::None);
    let mut font = QffFont::load(MemoryStream::new(&bytes)).unwrap();
    let mut dev = device(16, 2);

    assert_eq!(dev.drawtext(0, 0, &mut font, "AzB"), Err(PainterError::MissingGlyph));
    assert_eq!(dev.driver().viewports(), [(0, 0, 2, 1)]);
    assert_eq!(dev.comms().starts, dev.comms().stops);
    assert_eq!(text_width(&mut font, "z"), Err(PainterError::MissingGlyph));
}

#[test]
fn empty_text_draws_nothing() {
    let bytes = font(Compression::None);
    let mut font = QffFont::load(MemoryStream::new(&bytes)).unwrap();
    let mut dev = device(4, 2);
    assert_eq!(dev.drawtext(0, 0, &mut font, ""), Ok(0));
    assert!(dev.driver().events.is_empty());
}

#[test]
fn corrupt_font_is_rejected() {
    let bytes = font(Compression::None);

    let mut bad = bytes.clone();
    bad[0] = 0x01;
    assert_eq!(QffFont::load(MemoryStream::new(&bad)).err(), Some(QgfError::BadBlockHeader));

    let short = &bytes[..bytes.len() - 1];
    assert_eq!(QffFont::load(MemoryStream::new(short)).err(), Some(QgfError::BadTotalSize));

    let font = QffFont::load(MemoryStream::new(&bytes)).unwrap();
    assert_eq!(font.line_height(), 2);
    assert!(font.layout().ascii_table_offset.is_some());
}

#[test]
fn glyph_past_data_block_is_truncated() {
    let mut bytes = font(Compression::None);
    // One packed byte per glyph; the data block closes the file.
    let header = bytes.len() - 5 - 3;
    assert_eq!(bytes[header], 0x04);
    bytes[header + 2] = 2;

    let mut font = QffFont::load(MemoryStream::new(&bytes)).unwrap();
    assert_eq!(font.layout().data_length, 2);
    let mut dev = device(16, 4);
    assert_eq!(dev.drawtext(0, 0, &mut font, "AB"), Ok(5));
    assert_eq!(
        dev.drawtext(0, 0, &mut font, "Ω"),
        Err(PainterError::Format(QgfError::Truncated))
    );
}
