//! Error types for every painter subsystem.
//!
//! Structural problems in image/font data surface as [`QgfError`], bus problems as
//! [`CommsError`], and anything a drawing call can hit is folded into [`PainterError`].

use qp_error::define_painter_error;

define_painter_error! {
    /// Transport (SPI/I2C/parallel) failures.
    pub enum CommsError(0x01) {
        /// `comms_init` has not run, or failed.
        NotInitialized = 0x01 => "Transport not initialized",
        /// The bus could not be claimed (chip select, lock, ...).
        BusUnavailable = 0x02 => "Bus could not be acquired",
        /// Fewer bytes were sent than requested.
        ShortWrite = 0x03 => "Short write on transport",
    }
}

define_painter_error! {
    /// Container (QGF/QFF) parsing and validation failures.
    pub enum QgfError(0x02) {
        /// The stream ended before a complete block could be read.
        Truncated = 0x01 => "Unexpected end of stream",
        /// `type_id`/`neg_type_id` did not match the expected block.
        BadBlockHeader = 0x02 => "Block header mismatch",
        /// Block length differs from the length its type requires.
        BadLength = 0x03 => "Block length mismatch",
        /// Magic number is not the one for this container.
        BadMagic = 0x04 => "Bad magic",
        /// Unsupported container version.
        BadVersion = 0x05 => "Unsupported version",
        /// `total_file_size` failed its negated check or exceeds the source.
        BadTotalSize = 0x06 => "Total size check failed",
        /// Frame/glyph format byte is not a known format.
        UnsupportedFormat = 0x07 => "Unsupported pixel format",
        /// Compression byte is not a known scheme.
        UnsupportedCompression = 0x08 => "Unsupported compression scheme",
        /// Requested frame does not exist.
        FrameOutOfRange = 0x09 => "Frame index out of range",
        /// RLE stream contained an invalid marker.
        CorruptRle = 0x0A => "Corrupt RLE data",
        /// Image declares zero frames.
        NoFrames = 0x0B => "Image has no frames",
    }
}

define_painter_error! {
    /// Failures reported by drawing and device operations.
    pub enum PainterError(0x03) {
        /// Device failed (or never ran) structural validation in `init`.
        NotValidated = 0x01 => "Device not validated",
        /// Panel configuration or transmit buffer cannot work.
        InvalidConfig = 0x02 => "Invalid device configuration",
        /// Transport failure.
        Comms(CommsError) = 0x03 => "Transport failure",
        /// The panel driver rejected an operation.
        Driver = 0x04 => "Driver operation failed",
        /// Image or font data failure.
        Format(QgfError) = 0x05 => "Image data failure",
        /// Palette interpolation needs at least two steps.
        InvalidPaletteSteps = 0x06 => "Palette needs at least two steps",
        /// Palette does not fit the lookup table.
        PaletteTooLarge = 0x07 => "Palette exceeds lookup table",
        /// Write past the end of the transmit buffer.
        BufferOverflow = 0x08 => "Transmit buffer overflow",
        /// A code point has no glyph in the font.
        MissingGlyph = 0x09 => "Missing glyph",
        /// Coordinates outside what the panel can address.
        InvalidCoordinates = 0x0A => "Invalid coordinates",
        /// No free device/asset slot, or a stale handle.
        Pool(PoolError) = 0x0B => "Slot pool failure",
    }
}

define_painter_error! {
    /// Fixed slot pool failures.
    pub enum PoolError(0x04) {
        /// Every slot is taken.
        Exhausted = 0x01 => "No free slot",
        /// Handle does not refer to a live slot.
        InvalidHandle = 0x02 => "Invalid handle",
    }
}
