//! Pixel packing and RLE: what goes in comes back out, through both the
//! buffer decoder and the streaming one.

use proptest::prelude::*;
use qp_painter::codec::{
    decode_palette, pack_indices, rle_decode, rle_encode, ByteSource, Compression, PixelInput,
    RleInput, UncompressedInput, MAX_LITERAL, MAX_RUN,
};
use qp_painter::{MemoryStream, PixelColor, QgfError};

fn arb_bpp() -> impl Strategy<Value = u8> {
    prop_oneof![Just(1u8), Just(2), Just(4), Just(8)]
}

/// Byte strings with long runs mixed into noise.
fn arb_runny_bytes() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec((any::<u8>(), 1usize..300), 0..12).prop_map(|runs| {
        runs.into_iter()
            .flat_map(|(b, n)| std::iter::repeat(b).take(if b % 3 == 0 { n } else { n % 3 + 1 }))
            .collect()
    })
}

proptest! {
    #[test]
    fn packed_indices_decode(bpp in arb_bpp(), raw in prop::collection::vec(any::<u8>(), 0..200)) {
        let mask = ((1u16 << bpp) - 1) as u8;
        let indices: Vec<u8> = raw.iter().map(|i| i & mask).collect();
        let packed = pack_indices(&indices, bpp).unwrap();
        prop_assert_eq!(packed.len(), indices.len().div_ceil(usize::from(8 / bpp)));

        let palette: Vec<PixelColor> = (0..=mask).map(PixelColor::PaletteIndex).collect();
        let mut input = UncompressedInput::new(MemoryStream::new(&packed));
        let mut out = Vec::new();
        decode_palette(indices.len() as u32, bpp, &mut input, &palette, |pal, index| {
            out.push(pal[usize::from(index)]);
            Ok(())
        }).unwrap();
        let expected: Vec<PixelColor> =
            indices.iter().map(|&i| PixelColor::PaletteIndex(i)).collect();
        prop_assert_eq!(out, expected);
    }

    #[test]
    fn rle_round_trip(data in arb_runny_bytes()) {
        let encoded = rle_encode(&data);
        prop_assert_eq!(rle_decode(&encoded), Ok(data.clone()));

        let mut input = RleInput::new(MemoryStream::new(&encoded));
        let streamed: Result<Vec<u8>, QgfError> =
            (0..data.len()).map(|_| input.next_byte()).collect();
        prop_assert_eq!(streamed, Ok(data));
        prop_assert_eq!(input.next_byte(), Err(QgfError::Truncated));
    }

    #[test]
    fn rle_markers_stay_in_range(data in arb_runny_bytes()) {
        let encoded = rle_encode(&data);
        let mut i = 0;
        while i < encoded.len() {
            let marker = encoded[i];
            prop_assert!(marker != 0);
            if marker < 128 {
                prop_assert!(usize::from(marker) >= 3 && usize::from(marker) <= MAX_RUN);
                i += 2;
            } else {
                prop_assert!(usize::from(marker - 127) <= MAX_LITERAL);
                i += 1 + usize::from(marker - 127);
            }
        }
        prop_assert_eq!(i, encoded.len());
    }

    #[test]
    fn restart_discards_partial_run(data in arb_runny_bytes(), skip in 0usize..64) {
        prop_assume!(!data.is_empty());
        let encoded = rle_encode(&data);
        let mut input = PixelInput::new(Compression::Rle, MemoryStream::new(&encoded));
        for _ in 0..skip.min(data.len()) {
            input.next_byte().unwrap();
        }
        input.restart_at(0);
        prop_assert_eq!(input.next_byte(), Ok(data[0]));
    }
}

#[test]
fn zero_marker_is_corrupt() {
    assert_eq!(rle_decode(&[0, 1]), Err(QgfError::CorruptRle));
    let mut input = RleInput::new(MemoryStream::new(&[0u8, 1]));
    assert_eq!(input.next_byte(), Err(QgfError::CorruptRle));
}
