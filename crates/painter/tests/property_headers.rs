//! Container validation: damaged block headers never load, and arbitrary
//! bytes never panic the parsers.

use proptest::prelude::*;
use qp_painter::codec::Compression;
use qp_painter::qff::QffEncoder;
use qp_painter::qgf::{BlockHeader, FrameSpec, ImageFormat, QgfEncoder};
use qp_painter::{Hsv888, MemoryStream, QffFont, QgfError, QgfImage};

fn image() -> Vec<u8> {
    let pixels: Vec<u8> = (0..16).map(|i| i % 4).collect();
    QgfEncoder::new(4, 4)
        .add_frame(&FrameSpec {
            format: ImageFormat::Palette2Bpp,
            compression: Compression::Rle,
            delay: 20,
            transparency_index: None,
            delta: None,
            palette: &[Hsv888::BLACK, Hsv888::WHITE, Hsv888::BLACK, Hsv888::WHITE],
            pixels: &pixels,
        })
        .unwrap()
        .finish()
}

fn font() -> Vec<u8> {
    let mut enc = QffEncoder::new(2, ImageFormat::Grayscale1Bpp, Compression::None);
    enc.add_glyph('x', 2, &[1, 0, 0, 1]).unwrap();
    enc.finish().unwrap()
}

/// Byte offsets of every block header in a QGF file, found by walking it.
fn qgf_header_offsets(bytes: &[u8]) -> Vec<usize> {
    let mut offsets = Vec::new();
    let mut at = 0;
    while at + 5 <= bytes.len() {
        offsets.push(at);
        let header = BlockHeader::parse(
            [bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3], bytes[at + 4]],
        );
        at += 5 + header.length as usize;
    }
    offsets
}

proptest! {
    #[test]
    fn damaged_type_bytes_reject(block in 0usize..16, which in 0usize..2, flip in 1u8..=255) {
        let mut bytes = image();
        let offsets = qgf_header_offsets(&bytes);
        let at = offsets[block % offsets.len()] + which;
        bytes[at] ^= flip;
        prop_assert_eq!(
            QgfImage::load(MemoryStream::new(&bytes)).err(),
            Some(QgfError::BadBlockHeader)
        );
    }

    #[test]
    fn any_prefix_of_a_valid_image_fails(cut in 0usize..64) {
        let bytes = image();
        let cut = cut.min(bytes.len() - 1);
        prop_assert!(QgfImage::load(MemoryStream::new(&bytes[..cut])).is_err());
    }

    #[test]
    fn garbage_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = QgfImage::load(MemoryStream::new(&bytes));
        let _ = QffFont::load(MemoryStream::new(&bytes));
    }

    #[test]
    fn damaged_font_descriptor_rejects(which in 0usize..2, flip in 1u8..=255) {
        let mut bytes = font();
        bytes[which] ^= flip;
        prop_assert_eq!(
            QffFont::load(MemoryStream::new(&bytes)).err(),
            Some(QgfError::BadBlockHeader)
        );
    }
}
