//! Palette lookup table with interpolation memo.

use crate::color::{Hsv888, PixelColor};
use crate::error::PainterError;

/// Number of entries in a palette lookup table.
#[cfg(feature = "palette-256")]
pub const PALETTE_CAPACITY: usize = 256;
/// Number of entries in a palette lookup table.
#[cfg(not(feature = "palette-256"))]
pub const PALETTE_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PaletteKey {
    fg: Hsv888,
    bg: Hsv888,
    steps: usize,
}

/// Lookup table shared by the decode pipeline of one device.
///
/// Interpolated ramps are memoized on `(fg, bg, steps)`; anything that writes
/// entries directly (palette blocks, driver conversion) drops the memo.
#[derive(Debug, Clone)]
pub struct PaletteCache {
    entries: [PixelColor; PALETTE_CAPACITY],
    len: usize,
    key: Option<PaletteKey>,
}

impl Default for PaletteCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PaletteCache {
    pub const fn new() -> Self {
        Self {
            entries: [PixelColor::Raw(0); PALETTE_CAPACITY],
            len: 0,
            key: None,
        }
    }

    pub fn invalidate(&mut self) {
        self.key = None;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn entries(&self) -> &[PixelColor] {
        &self.entries[..self.len]
    }

    pub fn entries_mut(&mut self) -> &mut [PixelColor] {
        &mut self.entries[..self.len]
    }

    /// Fill `steps` entries from `bg` (index 0) to `fg` (index `steps - 1`).
    ///
    /// Returns `Ok(true)` when the table was regenerated and `Ok(false)` when the
    /// previous ramp for the same key is still in place. Hue takes the shorter
    /// way round the wheel.
    pub fn interpolate(
        &mut self,
        fg: Hsv888,
        bg: Hsv888,
        steps: usize,
    ) -> Result<bool, PainterError> {
        if steps < 2 {
            return Err(PainterError::InvalidPaletteSteps);
        }
        if steps > PALETTE_CAPACITY {
            return Err(PainterError::PaletteTooLarge);
        }

        let key = PaletteKey { fg, bg, steps };
        if self.key == Some(key) {
            return Ok(false);
        }

        let hue_fg = i32::from(fg.h);
        let mut hue_bg = i32::from(bg.h);
        if hue_fg - hue_bg >= 128 {
            hue_bg += 256;
        } else if hue_fg - hue_bg <= -128 {
            hue_bg -= 256;
        }

        let span = (steps - 1) as i32;
        let lerp = |from: i32, to: i32, i: i32| ((to - from) * i / span + from) as u8;
        for (i, entry) in self.entries[..steps].iter_mut().enumerate() {
            let i = i as i32;
            *entry = PixelColor::Hsv888(Hsv888::new(
                lerp(hue_bg, hue_fg, i),
                lerp(i32::from(bg.s), i32::from(fg.s), i),
                lerp(i32::from(bg.v), i32::from(fg.v), i),
            ));
        }

        self.len = steps;
        self.key = Some(key);
        log::trace!("palette: regenerated {steps} entries");
        Ok(true)
    }

    /// Load packed `h, s, v` triplets, as stored in a palette block.
    pub fn load_hsv_triplets(&mut self, triplets: &[u8]) -> Result<usize, PainterError> {
        let count = triplets.len() / 3;
        if count > PALETTE_CAPACITY {
            return Err(PainterError::PaletteTooLarge);
        }
        self.invalidate();
        for (entry, hsv) in self.entries.iter_mut().zip(triplets.chunks_exact(3)) {
            *entry = PixelColor::Hsv888(Hsv888::new(hsv[0], hsv[1], hsv[2]));
        }
        self.len = count;
        Ok(count)
    }
}
