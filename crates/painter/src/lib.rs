//! Device-independent 2D drawing for small displays.
//!
//! A [`PainterDevice`] pairs a panel driver with its transport and owns a
//! small transmit buffer. Shapes, images (QGF) and text (QFF) are all drawn
//! by setting a viewport on the panel and streaming native pixels into it.
//!
//! ```text
//!   drawing call ──► bracket (validate, comms start)
//!                      ├─ shapes: fill buffer, stream over viewports
//!                      └─ images/text: stream ─► decoder ─► palette ─► buffer
//!                    comms stop
//! ```

#![no_std]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod codec;
pub mod color;
pub mod comms;
pub mod device;
mod draw;
pub mod driver;
pub mod error;
pub mod image;
pub mod palette;
pub mod pool;
pub mod qff;
pub mod qgf;
pub mod stream;
pub mod text;

pub use color::{Hsv888, PixelColor, Rgb888};
pub use comms::{NullComms, PainterComms};
pub use device::{DeviceState, Geometry, PainterDevice, PanelConfig, Rotation};
pub use driver::PainterDriver;
pub use error::{CommsError, PainterError, PoolError, QgfError};
pub use image::Animation;
pub use pool::{Handle, SharedPool, SlotPool};
pub use qff::QffFont;
pub use qgf::QgfImage;
pub use stream::{BoundedStream, MemoryStream, Stream, StreamSeek};

#[cfg(feature = "std")]
pub use stream::FileStream;
