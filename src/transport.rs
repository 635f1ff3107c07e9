//! Byte-oriented transport abstraction over the serial link.
//!
//! The protocol engine only needs to push whole frames out and pull single
//! bytes in, with "no data yet" kept distinct from a genuine fault. Keeping
//! the seam this narrow lets the session controller run against a scripted
//! transport in tests.

use crate::error::Result;

/// Outcome of a single non-blocking byte read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadByte {
    /// One byte arrived.
    Byte(u8),
    /// No data available yet; the caller decides whether to back off or give up.
    WouldBlock,
}

/// A duplex byte channel to the inverter.
pub trait Transport {
    /// Writes `bytes` and returns how many were accepted.
    fn write(&mut self, bytes: &[u8]) -> Result<usize>;

    /// Attempts to read one byte without blocking indefinitely.
    fn read_byte(&mut self) -> Result<ReadByte>;
}

#[cfg_attr(docsrs, doc(cfg(feature = "serialport")))]
#[cfg(feature = "serialport")]
pub use serial::SerialTransport;

#[cfg(feature = "serialport")]
mod serial {
    use super::{ReadByte, Transport};
    use crate::error::Result;
    use std::time::Duration;

    /// Baud rate the inverter communicates at.
    pub const BAUD_RATE: u32 = 9600;
    /// Read timeout tick; one tick without data maps to [`ReadByte::WouldBlock`].
    pub const READ_TIMEOUT: Duration = Duration::from_secs(1);

    /// [`Transport`] implementation backed by a real serial port.
    ///
    /// The port is configured for raw 8N1 communication at 9600 baud and is
    /// closed when the transport is dropped.
    pub struct SerialTransport {
        port: Box<dyn serialport::SerialPort>,
    }

    impl SerialTransport {
        /// Opens and configures the serial device at `path`.
        ///
        /// # Examples
        ///
        /// ```no_run
        /// use jfy_inverter_lib::transport::SerialTransport;
        ///
        /// let port = SerialTransport::open("/dev/ttyS0")?;
        /// # Ok::<(), jfy_inverter_lib::Error>(())
        /// ```
        pub fn open(path: &str) -> Result<Self> {
            let port = serialport::new(path, BAUD_RATE)
                .data_bits(serialport::DataBits::Eight)
                .parity(serialport::Parity::None)
                .stop_bits(serialport::StopBits::One)
                .flow_control(serialport::FlowControl::None)
                .timeout(READ_TIMEOUT)
                .open()
                .map_err(std::io::Error::from)?;
            Ok(SerialTransport { port })
        }
    }

    impl Transport for SerialTransport {
        fn write(&mut self, bytes: &[u8]) -> Result<usize> {
            Ok(self.port.write(bytes)?)
        }

        fn read_byte(&mut self) -> Result<ReadByte> {
            let mut byte = [0u8; 1];
            match self.port.read(&mut byte) {
                Ok(0) => Ok(ReadByte::WouldBlock),
                Ok(_) => Ok(ReadByte::Byte(byte[0])),
                Err(error)
                    if matches!(
                        error.kind(),
                        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
                    ) =>
                {
                    Ok(ReadByte::WouldBlock)
                }
                Err(error) => Err(error.into()),
            }
        }
    }
}
