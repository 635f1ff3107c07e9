//! A library for polling JFY grid-connect solar inverters over RS-485.
//!
//! JFY inverters speak a vendor-specific binary request/response protocol:
//! framed messages with a 16-bit negated-sum checksum, a three-step
//! registration handshake (reset, identify, register) that assigns the
//! device its bus address, and fixed-layout telemetry payloads that differ
//! between the single-string and dual-string ("twin") model families.
//!
//! ## Features
//!
//! - **Protocol Implementation**: Frame construction, checksum, handshake
//!   and telemetry decoding for both inverter variants. See [`protocol`].
//! - **Session Controller**: [`client::JfyInverter`] drives one complete
//!   poll cycle over any [`transport::Transport`].
//! - **Transport Abstraction**: The protocol engine is written against a
//!   narrow byte-in/byte-out seam, so sessions are testable against a
//!   scripted transport; a real serial port backend is available behind the
//!   `serialport` feature.
//!
//! ## Quick Start
//!
//! ```no_run
//! use jfy_inverter_lib::client::JfyInverter;
//! use jfy_inverter_lib::protocol::DeviceVariant;
//! use jfy_inverter_lib::transport::SerialTransport;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Open the serial port the inverter is connected to (9600 baud, 8N1).
//!     let port = SerialTransport::open("/dev/ttyS0")?;
//!
//!     // Walk the registration handshake, then poll one telemetry block.
//!     let mut inverter = JfyInverter::new(port);
//!     inverter.register()?;
//!     let record = inverter.poll_telemetry(DeviceVariant::SingleString)?;
//!
//!     println!("{record:?}");
//!     Ok(())
//! }
//! ```

pub mod client;
mod error;
pub mod protocol;
pub mod reader;
pub mod transport;

pub use error::{Error, Result};
