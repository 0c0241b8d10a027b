//! Recolor ramps: endpoints are exact and hue takes the short way round.

use proptest::prelude::*;
use qp_painter::palette::{PaletteCache, PALETTE_CAPACITY};
use qp_painter::Hsv888;

fn arb_hsv() -> impl Strategy<Value = Hsv888> {
    (any::<u8>(), any::<u8>(), any::<u8>()).prop_map(|(h, s, v)| Hsv888::new(h, s, v))
}

fn hue_distance(a: u8, b: u8) -> u8 {
    a.wrapping_sub(b).min(b.wrapping_sub(a))
}

fn ramp(fg: Hsv888, bg: Hsv888, steps: usize) -> Vec<Hsv888> {
    let mut cache = PaletteCache::new();
    assert_eq!(cache.interpolate(fg, bg, steps), Ok(true));
    cache.entries().iter().map(|e| e.as_hsv().unwrap()).collect()
}

proptest! {
    #[test]
    fn endpoints_match_inputs(fg in arb_hsv(), bg in arb_hsv(), steps in 2..=PALETTE_CAPACITY) {
        let entries = ramp(fg, bg, steps);
        prop_assert_eq!(entries.len(), steps);
        prop_assert_eq!(entries[0], bg);
        prop_assert_eq!(entries[steps - 1], fg);
    }

    #[test]
    fn hue_stays_on_shorter_arc(fg in arb_hsv(), bg in arb_hsv(), steps in 2..=PALETTE_CAPACITY) {
        let limit = hue_distance(fg.h, bg.h);
        for entry in ramp(fg, bg, steps) {
            prop_assert!(hue_distance(entry.h, bg.h) <= limit);
            prop_assert!(hue_distance(entry.h, fg.h) <= limit);
        }
    }

    #[test]
    fn value_is_monotonic(fg in arb_hsv(), bg in arb_hsv(), steps in 2..=PALETTE_CAPACITY) {
        let entries = ramp(fg, bg, steps);
        for pair in entries.windows(2) {
            if fg.v >= bg.v {
                prop_assert!(pair[0].v <= pair[1].v);
            } else {
                prop_assert!(pair[0].v >= pair[1].v);
            }
        }
    }

    #[test]
    fn same_key_is_memoized(fg in arb_hsv(), bg in arb_hsv(), steps in 2..=PALETTE_CAPACITY) {
        let mut cache = PaletteCache::new();
        prop_assert_eq!(cache.interpolate(fg, bg, steps), Ok(true));
        prop_assert_eq!(cache.interpolate(fg, bg, steps), Ok(false));
        cache.invalidate();
        prop_assert_eq!(cache.interpolate(fg, bg, steps), Ok(true));
    }
}
