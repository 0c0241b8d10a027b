//! Shape rasterizers.
//!
//! Everything is reduced to "set a viewport, stream the pre-filled buffer":
//! single pixels are 1x1 viewports, spans are 1-pixel-high rects. Coordinates
//! are `i32`; pixels left of or above the panel origin are skipped and spans
//! are clipped at 0. Coordinates outside `COORD_MIN..=COORD_LIMIT` are
//! rejected with [`PainterError::InvalidCoordinates`].

use crate::color::Hsv888;
use crate::comms::PainterComms;
use crate::device::PainterDevice;
use crate::driver::PainterDriver;
use crate::error::PainterError;

const COORD_MAX: i32 = u16::MAX as i32;

/// Accepted coordinate range. A centre or endpoint this far out, plus a
/// `u16` radius or extent, still fits `i32` arithmetic.
const COORD_MIN: i32 = i16::MIN as i32;
const COORD_LIMIT: i32 = COORD_MAX + u16::MAX as i32;

fn check_coords(coords: &[i32]) -> Result<(), PainterError> {
    if coords.iter().all(|c| (COORD_MIN..=COORD_LIMIT).contains(c)) {
        Ok(())
    } else {
        log::debug!("draw: coordinates {coords:?} out of range");
        Err(PainterError::InvalidCoordinates)
    }
}

impl<D: PainterDriver, C: PainterComms, const BUF: usize> PainterDevice<D, C, BUF> {
    pub fn setpixel(&mut self, x: i32, y: i32, color: Hsv888) -> Result<(), PainterError> {
        self.bracket("setpixel", |dev| {
            check_coords(&[x, y])?;
            dev.fill_pixdata(1, color)?;
            dev.setpixel_impl(x, y)
        })
    }

    pub fn line(
        &mut self,
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
        color: Hsv888,
    ) -> Result<(), PainterError> {
        self.bracket("line", |dev| {
            check_coords(&[x0, y0, x1, y1])?;
            dev.line_impl(x0, y0, x1, y1, color)
        })
    }

    /// Draw a rectangle; corners may be given in any order.
    pub fn rect(
        &mut self,
        left: i32,
        top: i32,
        right: i32,
        bottom: i32,
        color: Hsv888,
        filled: bool,
    ) -> Result<(), PainterError> {
        self.bracket("rect", |dev| {
            check_coords(&[left, top, right, bottom])?;
            dev.rect_impl(left, top, right, bottom, color, filled)
        })
    }

    pub fn circle(
        &mut self,
        x: i32,
        y: i32,
        radius: u16,
        color: Hsv888,
        filled: bool,
    ) -> Result<(), PainterError> {
        self.bracket("circle", |dev| {
            check_coords(&[x, y])?;
            dev.circle_impl(x, y, radius, color, filled)
        })
    }

    pub fn ellipse(
        &mut self,
        x: i32,
        y: i32,
        sizex: u16,
        sizey: u16,
        color: Hsv888,
        filled: bool,
    ) -> Result<(), PainterError> {
        self.bracket("ellipse", |dev| {
            check_coords(&[x, y])?;
            dev.ellipse_impl(x, y, sizex, sizey, color, filled)
        })
    }

    /// Plot one pixel from the already-filled buffer.
    fn setpixel_impl(&mut self, x: i32, y: i32) -> Result<(), PainterError> {
        if !(0..=COORD_MAX).contains(&x) || !(0..=COORD_MAX).contains(&y) {
            return Ok(());
        }
        self.fillrect_helper(x as u16, y as u16, x as u16, y as u16)
    }

    /// Stream the filled buffer over a rect, normalizing and clipping it.
    fn span_impl(&mut self, x0: i32, y0: i32, x1: i32, y1: i32) -> Result<(), PainterError> {
        let (l, r) = (x0.min(x1), x0.max(x1));
        let (t, b) = (y0.min(y1), y0.max(y1));
        if r < 0 || b < 0 || l > COORD_MAX || t > COORD_MAX {
            return Ok(());
        }
        let clip = |v: i32| v.clamp(0, COORD_MAX) as u16;
        self.fillrect_helper(clip(l), clip(t), clip(r), clip(b))
    }

    fn line_impl(
        &mut self,
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
        color: Hsv888,
    ) -> Result<(), PainterError> {
        if x0 == x1 || y0 == y1 {
            return self.rect_impl(x0, y0, x1, y1, color, true);
        }

        self.fill_pixdata(1, color)?;

        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut e = dx + dy;
        let (mut x, mut y) = (x0, y0);

        while x != x1 || y != y1 {
            self.setpixel_impl(x, y)?;
            let e2 = 2 * e;
            // Both steps test the pre-step error.
            if e2 >= dy {
                e += dy;
                x += sx;
            }
            if e2 <= dx {
                e += dx;
                y += sy;
            }
        }
        self.setpixel_impl(x1, y1)
    }

    fn rect_impl(
        &mut self,
        left: i32,
        top: i32,
        right: i32,
        bottom: i32,
        color: Hsv888,
        filled: bool,
    ) -> Result<(), PainterError> {
        let (l, r) = (left.min(right), left.max(right));
        let (t, b) = (top.min(bottom), top.max(bottom));
        let extent =
            |lo: i32, hi: i32| (i64::from(hi) - i64::from(lo) + 1).min(i64::from(u32::MAX)) as u32;
        let (w, h) = (extent(l, r), extent(t, b));

        // Outline and fill coincide at this size.
        if filled || w <= 2 || h <= 2 {
            self.fill_pixdata(w.saturating_mul(h), color)?;
            return self.span_impl(l, t, r, b);
        }

        self.fill_pixdata(w.max(h), color)?;
        self.span_impl(l, t, r, t)?;
        self.span_impl(l, b, r, b)?;
        self.span_impl(l, t + 1, l, b - 1)?;
        self.span_impl(r, t + 1, r, b - 1)
    }

    /// Emit one octant step of the circle.
    fn circle_helper(
        &mut self,
        cx: i32,
        cy: i32,
        ox: i32,
        oy: i32,
        filled: bool,
    ) -> Result<(), PainterError> {
        if ox == 0 {
            self.setpixel_impl(cx, cy + oy)?;
            self.setpixel_impl(cx, cy - oy)?;
            if filled {
                self.span_impl(cx + oy, cy, cx - oy, cy)
            } else {
                self.setpixel_impl(cx + oy, cy)?;
                self.setpixel_impl(cx - oy, cy)
            }
        } else if ox == oy {
            if filled {
                self.span_impl(cx + oy, cy + oy, cx - oy, cy + oy)?;
                self.span_impl(cx + oy, cy - oy, cx - oy, cy - oy)
            } else {
                self.setpixel_impl(cx + oy, cy + oy)?;
                self.setpixel_impl(cx - oy, cy + oy)?;
                self.setpixel_impl(cx + oy, cy - oy)?;
                self.setpixel_impl(cx - oy, cy - oy)
            }
        } else if filled {
            self.span_impl(cx + ox, cy + oy, cx - ox, cy + oy)?;
            self.span_impl(cx + ox, cy - oy, cx - ox, cy - oy)?;
            self.span_impl(cx + oy, cy + ox, cx - oy, cy + ox)?;
            self.span_impl(cx + oy, cy - ox, cx - oy, cy - ox)
        } else {
            for (px, py) in [
                (cx + ox, cy + oy),
                (cx - ox, cy + oy),
                (cx + ox, cy - oy),
                (cx - ox, cy - oy),
                (cx + oy, cy + ox),
                (cx - oy, cy + ox),
                (cx + oy, cy - ox),
                (cx - oy, cy - ox),
            ] {
                self.setpixel_impl(px, py)?;
            }
            Ok(())
        }
    }

    fn circle_impl(
        &mut self,
        cx: i32,
        cy: i32,
        radius: u16,
        color: Hsv888,
        filled: bool,
    ) -> Result<(), PainterError> {
        let r = i32::from(radius);
        let mut x = 0;
        let mut y = r;
        let mut err = (5 - (r >> 2)) >> 2;

        self.fill_pixdata(2 * u32::from(radius) + 1, color)?;

        self.circle_helper(cx, cy, x, y, filled)?;
        while x < y {
            x += 1;
            if err < 0 {
                err += (x << 1) + 1;
            } else {
                y -= 1;
                err += ((x - y) << 1) + 1;
            }
            self.circle_helper(cx, cy, x, y, filled)?;
        }
        Ok(())
    }

    /// Emit one quadrant step of the ellipse.
    fn ellipse_helper(
        &mut self,
        cx: i32,
        cy: i32,
        ox: i32,
        oy: i32,
        filled: bool,
    ) -> Result<(), PainterError> {
        let (xpx, xmx) = (cx + ox, cx - ox);
        let (ypy, ymy) = (cy + oy, cy - oy);

        if ox == 0 {
            self.setpixel_impl(xpx, ypy)?;
            self.setpixel_impl(xpx, ymy)
        } else if filled {
            self.span_impl(xpx, ypy, xmx, ypy)?;
            if oy > 0 {
                self.span_impl(xpx, ymy, xmx, ymy)?;
            }
            Ok(())
        } else {
            self.setpixel_impl(xpx, ypy)?;
            self.setpixel_impl(xpx, ymy)?;
            self.setpixel_impl(xmx, ypy)?;
            self.setpixel_impl(xmx, ymy)
        }
    }

    fn ellipse_impl(
        &mut self,
        cx: i32,
        cy: i32,
        sizex: u16,
        sizey: u16,
        color: Hsv888,
        filled: bool,
    ) -> Result<(), PainterError> {
        self.fill_pixdata(2 * u32::from(sizex.max(sizey)) + 1, color)?;
        if sizex == 0 && sizey == 0 {
            return self.setpixel_impl(cx, cy);
        }

        let (sx, sy) = (i64::from(sizex), i64::from(sizey));
        let aa = sx * sx;
        let bb = sy * sy;
        let fa = 4 * aa;
        let fb = 4 * bb;

        // Region 1: from the top, while the slope is shallower than -1.
        let (mut dx, mut dy) = (0i64, sy);
        let mut delta = 2 * bb + aa * (1 - 2 * sy);
        while bb * dx <= aa * dy {
            self.ellipse_helper(cx, cy, dx as i32, dy as i32, filled)?;
            if delta >= 0 {
                delta += fa * (1 - dy);
                dy -= 1;
            }
            delta += bb * (4 * dx + 6);
            dx += 1;
        }

        // Region 2: from the side, back up to the slope -1 point.
        let (mut dx, mut dy) = (sx, 0i64);
        let mut delta = 2 * aa + bb * (1 - 2 * sx);
        while aa * dy <= bb * dx {
            self.ellipse_helper(cx, cy, dx as i32, dy as i32, filled)?;
            if delta >= 0 {
                delta += fb * (1 - dx);
                dx -= 1;
            }
            delta += aa * (4 * dy + 6);
            dy += 1;
        }
        Ok(())
    }
}
