//! Device core: validation, the comms session bracket and buffered pixel
//! streaming.
//!
//! Every public drawing call goes through [`PainterDevice::bracket`]: reject if
//! the device never validated, claim the bus, do the work, release the bus no
//! matter how the work ended.

use crate::codec::PixelSink;
use crate::color::{Hsv888, PixelColor};
use crate::comms::PainterComms;
use crate::driver::PainterDriver;
use crate::error::{PainterError, PoolError};
use crate::palette::PaletteCache;
use crate::pool::{Handle, SlotPool};

/// Default transmit buffer size in bytes.
pub const DEFAULT_BUFFER_SIZE: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

/// Physical panel dimensions and the visible window offset within the
/// controller's RAM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelConfig {
    pub width: u16,
    pub height: u16,
    pub offset_x: u16,
    pub offset_y: u16,
}

impl PanelConfig {
    pub const fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            offset_x: 0,
            offset_y: 0,
        }
    }

    pub const fn with_offsets(mut self, offset_x: u16, offset_y: u16) -> Self {
        self.offset_x = offset_x;
        self.offset_y = offset_y;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub panel_width: u16,
    pub panel_height: u16,
    pub rotation: Rotation,
    pub offset_x: u16,
    pub offset_y: u16,
}

impl Geometry {
    /// Width as seen by callers, after rotation.
    pub fn width(&self) -> u16 {
        match self.rotation {
            Rotation::R0 | Rotation::R180 => self.panel_width,
            Rotation::R90 | Rotation::R270 => self.panel_height,
        }
    }

    /// Height as seen by callers, after rotation.
    pub fn height(&self) -> u16 {
        match self.rotation {
            Rotation::R0 | Rotation::R180 => self.panel_height,
            Rotation::R90 | Rotation::R270 => self.panel_width,
        }
    }
}

/// Device lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    /// Constructed, or failed structural validation.
    Uninitialized,
    /// Structure checked; panel init not (yet) successful.
    Validated,
    /// Panel init ran successfully.
    Active,
}

impl DeviceState {
    pub fn is_active(self) -> bool {
        self == Self::Active
    }
}

/// Telemetry counters for device operations.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeviceTelemetry {
    pub sessions: u64,
    pub viewports: u64,
    pub pixels_sent: u64,
    pub flushes: u64,
    pub errors: u64,
}

/// One panel: driver, transport, geometry and the per-device transmit buffer
/// and palette cache.
///
/// `BUF` is the transmit buffer size in bytes and must be a non-zero multiple
/// of 16.
pub struct PainterDevice<D, C, const BUF: usize = DEFAULT_BUFFER_SIZE> {
    driver: D,
    comms: C,
    geometry: Geometry,
    state: DeviceState,
    validate_ok: bool,
    telemetry: DeviceTelemetry,
    buffer: [u8; BUF],
    /// Leading buffer pixels currently holding the fill colour.
    filled: u32,
    palette: PaletteCache,
}

impl<D: PainterDriver, C: PainterComms, const BUF: usize> PainterDevice<D, C, BUF> {
    const BUFFER_OK: () = assert!(
        BUF != 0 && BUF % 16 == 0,
        "transmit buffer must be a non-zero multiple of 16 bytes"
    );

    pub fn new(driver: D, comms: C, config: PanelConfig) -> Self {
        let () = Self::BUFFER_OK;
        Self {
            driver,
            comms,
            geometry: Geometry {
                panel_width: config.width,
                panel_height: config.height,
                rotation: Rotation::R0,
                offset_x: config.offset_x,
                offset_y: config.offset_y,
            },
            state: DeviceState::Uninitialized,
            validate_ok: false,
            telemetry: DeviceTelemetry::default(),
            buffer: [0; BUF],
            filled: 0,
            palette: PaletteCache::new(),
        }
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn validate_ok(&self) -> bool {
        self.validate_ok
    }

    pub fn telemetry(&self) -> &DeviceTelemetry {
        &self.telemetry
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn comms(&self) -> &C {
        &self.comms
    }

    pub fn comms_mut(&mut self) -> &mut C {
        &mut self.comms
    }

    pub fn into_parts(self) -> (D, C) {
        (self.driver, self.comms)
    }

    /// Register a new device in a free slot of `pool`.
    ///
    /// The device still needs [`init`](Self::init) before it can draw.
    pub fn create_in<const N: usize>(
        pool: &mut SlotPool<Self, N>,
        driver: D,
        comms: C,
        config: PanelConfig,
    ) -> Result<Handle, PoolError> {
        let handle = pool.insert(Self::new(driver, comms, config))?;
        log::debug!("painter: device in slot {}", handle.index());
        Ok(handle)
    }

    /// Free the device's slot and return its driver and transport.
    pub fn release<const N: usize>(
        pool: &mut SlotPool<Self, N>,
        handle: Handle,
    ) -> Result<(D, C), PoolError> {
        Ok(pool.remove(handle)?.into_parts())
    }

    pub fn set_viewport_offsets(&mut self, offset_x: u16, offset_y: u16) {
        self.geometry.offset_x = offset_x;
        self.geometry.offset_y = offset_y;
    }

    /// Drop the memoized recolor ramp.
    pub fn invalidate_palette(&mut self) {
        self.palette.invalidate();
    }

    /// Native pixels that fit in the transmit buffer.
    pub fn pixels_in_buffer(&self) -> u32 {
        let bpp = usize::from(self.driver.native_bits_per_pixel().max(1));
        (BUF * 8 / bpp) as u32
    }

    fn validate_structure(&self) -> Result<(), PainterError> {
        let bpp = self.driver.native_bits_per_pixel();
        if !matches!(bpp, 1 | 2 | 4 | 8 | 16 | 24) {
            log::debug!("init: unsupported native bpp {bpp}");
            return Err(PainterError::InvalidConfig);
        }
        if BUF * 8 < usize::from(bpp) {
            log::debug!("init: {BUF}-byte buffer cannot hold one pixel");
            return Err(PainterError::InvalidConfig);
        }
        if self.geometry.panel_width == 0 || self.geometry.panel_height == 0 {
            log::debug!("init: zero panel geometry");
            return Err(PainterError::InvalidConfig);
        }
        Ok(())
    }

    /// Validate the device, then run the panel's init sequence.
    ///
    /// `validate_ok` reflects the structural checks only: it is latched before
    /// the panel is touched, so a transport failure during init leaves the
    /// device `Validated` and retryable.
    pub fn init(&mut self, rotation: Rotation) -> Result<(), PainterError> {
        log::debug!("init: entry");
        self.geometry.rotation = rotation;

        if let Err(e) = self.validate_structure() {
            self.validate_ok = false;
            self.state = DeviceState::Uninitialized;
            log::debug!("init: fail ({e})");
            return Err(e);
        }
        self.validate_ok = true;
        self.state = DeviceState::Validated;

        if let Err(e) = self.comms.init() {
            self.telemetry.errors += 1;
            log::debug!("init: fail (comms init: {e})");
            return Err(e.into());
        }

        self.bracket("init", |dev| {
            let Self {
                driver, comms, geometry, ..
            } = dev;
            driver.init(comms, geometry)
        })?;
        self.state = DeviceState::Active;
        log::debug!("init: ok");
        Ok(())
    }

    /// Run `work` inside a comms session.
    pub(crate) fn bracket<T>(
        &mut self,
        op: &'static str,
        work: impl FnOnce(&mut Self) -> Result<T, PainterError>,
    ) -> Result<T, PainterError> {
        log::trace!("{op}: entry");
        if !self.validate_ok {
            log::debug!("{op}: fail (device not validated)");
            return Err(PainterError::NotValidated);
        }
        if let Err(e) = self.comms.start() {
            self.telemetry.errors += 1;
            log::debug!("{op}: fail (could not start comms: {e})");
            return Err(e.into());
        }
        self.telemetry.sessions += 1;

        let result = work(self);
        self.comms.stop();

        match &result {
            Ok(_) => log::trace!("{op}: ok"),
            Err(e) => {
                self.telemetry.errors += 1;
                log::debug!("{op}: fail ({e})");
            }
        }
        result
    }

    pub fn power(&mut self, on: bool) -> Result<(), PainterError> {
        self.bracket("power", |dev| dev.driver.power(&mut dev.comms, on))
    }

    pub fn clear(&mut self) -> Result<(), PainterError> {
        self.bracket("clear", |dev| {
            let Self {
                driver, comms, geometry, ..
            } = dev;
            driver.clear(comms, geometry)
        })
    }

    pub fn flush(&mut self) -> Result<(), PainterError> {
        self.bracket("flush", |dev| {
            dev.telemetry.flushes += 1;
            dev.driver.flush(&mut dev.comms)
        })
    }

    pub fn viewport(
        &mut self,
        left: u16,
        top: u16,
        right: u16,
        bottom: u16,
    ) -> Result<(), PainterError> {
        self.bracket("viewport", |dev| dev.send_viewport(left, top, right, bottom))
    }

    /// Stream caller-provided native pixels into the current viewport.
    pub fn pixdata(&mut self, pixels: &[u8], pixel_count: u32) -> Result<(), PainterError> {
        self.bracket("pixdata", |dev| {
            dev.driver.pixdata(&mut dev.comms, pixels, pixel_count)?;
            dev.telemetry.pixels_sent += u64::from(pixel_count);
            Ok(())
        })
    }

    pub(crate) fn send_viewport(
        &mut self,
        left: u16,
        top: u16,
        right: u16,
        bottom: u16,
    ) -> Result<(), PainterError> {
        self.telemetry.viewports += 1;
        self.driver.viewport(&mut self.comms, &self.geometry, left, top, right, bottom)
    }

    /// Fill the transmit buffer with up to `count` pixels of `color`.
    pub(crate) fn fill_pixdata(&mut self, count: u32, color: Hsv888) -> Result<u32, PainterError> {
        let mut entry = [PixelColor::Hsv888(color)];
        self.driver.palette_convert(&mut entry)?;

        let n = count.min(self.pixels_in_buffer());
        for i in 0..n {
            self.driver.append_pixels(&mut self.buffer, &entry, i, &[0])?;
        }
        self.filled = n;
        Ok(n)
    }

    /// Stream the filled buffer over the inclusive rectangle, in chunks.
    pub(crate) fn fillrect_helper(
        &mut self,
        left: u16,
        top: u16,
        right: u16,
        bottom: u16,
    ) -> Result<(), PainterError> {
        if self.filled == 0 {
            return Err(PainterError::BufferOverflow);
        }
        self.send_viewport(left, top, right, bottom)?;

        let w = u64::from(right.saturating_sub(left)) + 1;
        let h = u64::from(bottom.saturating_sub(top)) + 1;
        let mut remaining = w * h;
        while remaining > 0 {
            let n = remaining.min(u64::from(self.filled)) as u32;
            self.driver.pixdata(&mut self.comms, &self.buffer, n)?;
            self.telemetry.pixels_sent += u64::from(n);
            remaining -= u64::from(n);
        }
        Ok(())
    }

    /// Split into a pixel appender and the palette cache for decode work.
    pub(crate) fn decode_parts(&mut self) -> (PixelAppender<'_, D>, &mut PaletteCache) {
        let max_pixels = self.pixels_in_buffer();
        // The appender overwrites the buffer.
        self.filled = 0;
        let Self {
            driver,
            comms,
            geometry,
            telemetry,
            buffer,
            palette,
            ..
        } = self;
        (
            PixelAppender {
                driver,
                comms,
                geometry,
                telemetry,
                buffer,
                write_pos: 0,
                max_pixels,
            },
            palette,
        )
    }
}

/// Accumulates decoded pixels in the transmit buffer and ships full buffers
/// to the driver.
pub(crate) struct PixelAppender<'a, D> {
    driver: &'a mut D,
    comms: &'a mut dyn PainterComms,
    geometry: &'a Geometry,
    telemetry: &'a mut DeviceTelemetry,
    buffer: &'a mut [u8],
    write_pos: u32,
    max_pixels: u32,
}

impl<D: PainterDriver> PixelAppender<'_, D> {
    pub(crate) fn viewport(
        &mut self,
        left: u16,
        top: u16,
        right: u16,
        bottom: u16,
    ) -> Result<(), PainterError> {
        self.telemetry.viewports += 1;
        self.driver.viewport(self.comms, self.geometry, left, top, right, bottom)
    }

    /// Convert an HSV palette loaded from an image.
    pub(crate) fn convert(&mut self, palette: &mut [PixelColor]) -> Result<(), PainterError> {
        self.driver.palette_convert(palette)
    }

    /// Send whatever is left in the buffer.
    pub(crate) fn flush(&mut self) -> Result<(), PainterError> {
        if self.write_pos > 0 {
            self.driver.pixdata(self.comms, self.buffer, self.write_pos)?;
            self.telemetry.pixels_sent += u64::from(self.write_pos);
            self.write_pos = 0;
        }
        Ok(())
    }

    pub(crate) fn reset(&mut self) {
        self.write_pos = 0;
    }
}

impl<D: PainterDriver> PixelSink for PixelAppender<'_, D> {
    fn convert_palette(&mut self, palette: &mut [PixelColor]) -> Result<(), PainterError> {
        self.convert(palette)
    }

    fn push(&mut self, palette: &[PixelColor], index: u8) -> Result<(), PainterError> {
        self.driver.append_pixels(self.buffer, palette, self.write_pos, &[index])?;
        self.write_pos += 1;
        if self.write_pos == self.max_pixels {
            self.flush()?;
        }
        Ok(())
    }
}
