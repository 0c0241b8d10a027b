//! Transport contract between a panel and its bus.

use crate::error::CommsError;

/// Byte transport (SPI, I2C, parallel) for one panel.
///
/// `start`/`stop` bracket a session and act as the bus lock: `start` claims
/// the bus (chip select), `stop` releases it. Sessions do not nest.
pub trait PainterComms {
    fn init(&mut self) -> Result<(), CommsError>;
    fn start(&mut self) -> Result<(), CommsError>;
    fn stop(&mut self);
    /// Returns the number of bytes actually sent.
    fn send(&mut self, data: &[u8]) -> usize;

    fn send_all(&mut self, data: &[u8]) -> Result<(), CommsError> {
        if self.send(data) == data.len() {
            Ok(())
        } else {
            Err(CommsError::ShortWrite)
        }
    }
}

/// Transport for devices that are not behind a bus (memory surfaces).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullComms;

impl PainterComms for NullComms {
    fn init(&mut self) -> Result<(), CommsError> {
        Ok(())
    }

    fn start(&mut self) -> Result<(), CommsError> {
        Ok(())
    }

    fn stop(&mut self) {}

    fn send(&mut self, data: &[u8]) -> usize {
        data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct HalfBus;

    impl PainterComms for HalfBus {
        fn init(&mut self) -> Result<(), CommsError> {
            Ok(())
        }
        fn start(&mut self) -> Result<(), CommsError> {
            Err(CommsError::BusUnavailable)
        }
        fn stop(&mut self) {}
        fn send(&mut self, data: &[u8]) -> usize {
            data.len() / 2
        }
    }

    #[test]
    fn test_send_all_detects_short_write() {
        assert_eq!(HalfBus.send_all(&[1, 2, 3, 4]), Err(CommsError::ShortWrite));
        assert_eq!(HalfBus.send_all(&[]), Ok(()));
        assert_eq!(NullComms.send_all(&[1, 2, 3]), Ok(()));
    }
}
