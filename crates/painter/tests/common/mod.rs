//! Recording panel and bus shared by the integration tests.

#![allow(dead_code)]

use qp_painter::driver::{append_pixels_rgb565, rgb565_palette_convert};
use qp_painter::{
    CommsError, Geometry, PainterComms, PainterDevice, PainterDriver, PainterError, PanelConfig,
    PixelColor, Rotation,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Init,
    Power(bool),
    Clear,
    Flush,
    Viewport(u16, u16, u16, u16),
    Pixels(u32),
}

/// 16bpp panel that keeps a framebuffer of what it was sent.
pub struct RecordingPanel {
    pub width: u16,
    pub height: u16,
    pub fb: Vec<Option<u16>>,
    pub events: Vec<Event>,
    pub fail_pixdata: bool,
    window: (u16, u16, u16, u16),
    cursor: (u16, u16),
}

impl RecordingPanel {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            fb: vec![None; usize::from(width) * usize::from(height)],
            events: Vec::new(),
            fail_pixdata: false,
            window: (0, 0, 0, 0),
            cursor: (0, 0),
        }
    }

    pub fn pixel(&self, x: u16, y: u16) -> Option<u16> {
        self.fb[usize::from(y) * usize::from(self.width) + usize::from(x)]
    }

    /// Coordinates of every pixel written so far.
    pub fn written(&self) -> Vec<(u16, u16)> {
        let mut out = Vec::new();
        for y in 0..self.height {
            for x in 0..self.width {
                if self.pixel(x, y).is_some() {
                    out.push((x, y));
                }
            }
        }
        out
    }

    pub fn viewports(&self) -> Vec<(u16, u16, u16, u16)> {
        self.events
            .iter()
            .filter_map(|e| match *e {
                Event::Viewport(l, t, r, b) => Some((l, t, r, b)),
                _ => None,
            })
            .collect()
    }

    pub fn pixels_streamed(&self) -> u32 {
        self.events
            .iter()
            .map(|e| match *e {
                Event::Pixels(n) => n,
                _ => 0,
            })
            .sum()
    }

    pub fn clear_log(&mut self) {
        self.events.clear();
        self.fb.iter_mut().for_each(|p| *p = None);
    }
}

impl PainterDriver for RecordingPanel {
    fn native_bits_per_pixel(&self) -> u8 {
        16
    }

    fn init(&mut self, _: &mut dyn PainterComms, _: &Geometry) -> Result<(), PainterError> {
        self.events.push(Event::Init);
        Ok(())
    }

    fn power(&mut self, _: &mut dyn PainterComms, on: bool) -> Result<(), PainterError> {
        self.events.push(Event::Power(on));
        Ok(())
    }

    fn clear(&mut self, _: &mut dyn PainterComms, _: &Geometry) -> Result<(), PainterError> {
        self.events.push(Event::Clear);
        Ok(())
    }

    fn flush(&mut self, _: &mut dyn PainterComms) -> Result<(), PainterError> {
        self.events.push(Event::Flush);
        Ok(())
    }

    fn viewport(
        &mut self,
        _: &mut dyn PainterComms,
        _: &Geometry,
        left: u16,
        top: u16,
        right: u16,
        bottom: u16,
    ) -> Result<(), PainterError> {
        self.events.push(Event::Viewport(left, top, right, bottom));
        self.window = (left, top, right, bottom);
        self.cursor = (left, top);
        Ok(())
    }

    fn pixdata(
        &mut self,
        comms: &mut dyn PainterComms,
        pixels: &[u8],
        pixel_count: u32,
    ) -> Result<(), PainterError> {
        if self.fail_pixdata {
            return Err(PainterError::Driver);
        }
        let bytes = pixels.get(..pixel_count as usize * 2).ok_or(PainterError::BufferOverflow)?;
        comms.send_all(bytes)?;
        self.events.push(Event::Pixels(pixel_count));

        let (left, _, right, _) = self.window;
        for px in bytes.chunks_exact(2) {
            let (x, y) = self.cursor;
            if x < self.width && y < self.height {
                self.fb[usize::from(y) * usize::from(self.width) + usize::from(x)] =
                    Some(u16::from_be_bytes([px[0], px[1]]));
            }
            self.cursor = if x >= right { (left, y + 1) } else { (x + 1, y) };
        }
        Ok(())
    }

    fn palette_convert(&mut self, palette: &mut [PixelColor]) -> Result<(), PainterError> {
        rgb565_palette_convert(palette)
    }

    fn append_pixels(
        &self,
        target: &mut [u8],
        palette: &[PixelColor],
        offset: u32,
        indices: &[u8],
    ) -> Result<(), PainterError> {
        append_pixels_rgb565(target, palette, offset, indices)
    }
}

/// Bus that tracks session brackets.
#[derive(Debug, Default)]
pub struct RecordingBus {
    pub starts: u32,
    pub stops: u32,
    pub active: bool,
    pub refuse: bool,
    pub bytes: usize,
}

impl PainterComms for RecordingBus {
    fn init(&mut self) -> Result<(), CommsError> {
        Ok(())
    }

    fn start(&mut self) -> Result<(), CommsError> {
        if self.refuse {
            return Err(CommsError::BusUnavailable);
        }
        assert!(!self.active, "sessions must not nest");
        self.active = true;
        self.starts += 1;
        Ok(())
    }

    fn stop(&mut self) {
        self.active = false;
        self.stops += 1;
    }

    fn send(&mut self, data: &[u8]) -> usize {
        assert!(self.active, "send outside a session");
        self.bytes += data.len();
        data.len()
    }
}

pub type TestDevice = PainterDevice<RecordingPanel, RecordingBus>;

/// An initialized device with an empty event log.
pub fn device(width: u16, height: u16) -> TestDevice {
    let mut dev = PainterDevice::new(
        RecordingPanel::new(width, height),
        RecordingBus::default(),
        PanelConfig::new(width, height),
    );
    dev.init(Rotation::R0).unwrap();
    dev.driver_mut().clear_log();
    dev
}
