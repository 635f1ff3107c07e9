//! Wire protocol for JFY grid-connect inverters.
//!
//! A frame is `[0xA5 0xA5][source][destination][control][function][length]`
//! followed by `length` payload bytes, a two-byte checksum and the `\n\r`
//! terminator. Responses use the same envelope; the inverter does not
//! length-prefix the stream, end of message is signalled by the terminator.

use crate::Error;

/// Frame synchronisation bytes, fixed for all requests and responses.
pub const SYNC: [u8; 2] = [0xA5, 0xA5];
/// Length of the frame header: sync, source, destination, control, function, length.
pub const HEADER_LEN: usize = 7;
/// Maximum payload length; leaves room for the 9-byte envelope within a 256-byte frame.
pub const MAX_PAYLOAD: usize = 240;
/// Largest frame the response reader will accumulate.
pub const MAX_FRAME: usize = 256;
/// End-of-message marker.
pub const TERMINATOR: [u8; 2] = [b'\n', b'\r'];

/// Our address on the bus.
pub const SOURCE_ADDRESS: u8 = 0x01;
/// Destination used until the inverter has been registered.
pub const BROADCAST_ADDRESS: u8 = 0x00;
/// Device address assigned to the inverter during registration.
pub const ASSIGNED_ADDRESS: u8 = 0x01;

/// Length of the telemetry payload: ten big-endian 16-bit fields.
pub const TELEMETRY_LEN: usize = 20;
/// Minimum length of a frame carrying a full telemetry payload.
pub const MIN_TELEMETRY_FRAME: usize = HEADER_LEN + TELEMETRY_LEN;

/// The requests understood by the inverter, as control/function byte pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Drop any previously assigned device address and start listening
    /// on the default one. Not answered.
    Reset,
    /// Ask the unregistered inverter for its serial number.
    Identify,
    /// Assign a device address to the inverter named by the payload.
    Register,
    /// Read the current telemetry block.
    PollTelemetry,
}

impl Command {
    pub const fn control(self) -> u8 {
        match self {
            Command::Reset | Command::Identify | Command::Register => 0x30,
            Command::PollTelemetry => 0x31,
        }
    }

    pub const fn function(self) -> u8 {
        match self {
            Command::Reset => 0x44,
            Command::Identify => 0x40,
            Command::Register => 0x41,
            Command::PollTelemetry => 0x42,
        }
    }
}

/// Calculates the frame checksum: wrapping 16-bit sum of all bytes,
/// bitwise inverted, plus one (the two's-complement negation of the sum).
pub fn checksum(bytes: &[u8]) -> u16 {
    let sum = bytes
        .iter()
        .fold(0u16, |acc, byte| acc.wrapping_add(*byte as u16));
    (sum ^ 0xFFFF).wrapping_add(1)
}

/// Builds a complete request frame for `command` addressed to `destination`.
///
/// Returns [`Error::PayloadTooLarge`] if `payload` exceeds [`MAX_PAYLOAD`].
///
/// # Examples
///
/// ```
/// use jfy_inverter_lib::protocol::{encode_request, Command, BROADCAST_ADDRESS};
///
/// let frame = encode_request(BROADCAST_ADDRESS, Command::Reset, &[])?;
/// assert_eq!(frame, [0xA5, 0xA5, 0x01, 0x00, 0x30, 0x44, 0x00, 0xFE, 0x41, 0x0A, 0x0D]);
/// # Ok::<(), jfy_inverter_lib::Error>(())
/// ```
pub fn encode_request(destination: u8, command: Command, payload: &[u8]) -> Result<Vec<u8>, Error> {
    if payload.len() > MAX_PAYLOAD {
        return Err(Error::PayloadTooLarge(payload.len()));
    }
    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len() + 4);
    frame.extend_from_slice(&SYNC);
    frame.push(SOURCE_ADDRESS);
    frame.push(destination);
    frame.push(command.control());
    frame.push(command.function());
    frame.push(payload.len() as u8);
    frame.extend_from_slice(payload);
    let sum = checksum(&frame);
    frame.extend_from_slice(&sum.to_be_bytes());
    frame.extend_from_slice(&TERMINATOR);
    Ok(frame)
}

/// The inverter model family, which selects the telemetry field layout.
///
/// The variant cannot be inferred from the wire data; it is chosen by the
/// operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceVariant {
    /// Single-MPPT-string inverters (e.g. SUNTWIN 1500TL..5000TL single trackers).
    #[default]
    SingleString,
    /// Dual-MPPT-string "Suntwin" inverters with the alternate field layout.
    Twin,
}

impl std::fmt::Display for DeviceVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceVariant::SingleString => write!(f, "single"),
            DeviceVariant::Twin => write!(f, "twin"),
        }
    }
}

impl std::str::FromStr for DeviceVariant {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "single" => Ok(DeviceVariant::SingleString),
            "twin" => Ok(DeviceVariant::Twin),
            _ => Err(format!(
                "unknown device variant '{value}', expected 'single' or 'twin'"
            )),
        }
    }
}

fn field_u16(payload: &[u8], index: usize) -> u16 {
    u16::from_be_bytes([payload[2 * index], payload[2 * index + 1]])
}

fn field_i16(payload: &[u8], index: usize) -> i16 {
    field_u16(payload, index) as i16
}

/// Telemetry block of a single-string inverter.
///
/// Field names follow the historical report keys.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Telemetry {
    /// Heatsink temperature in °C.
    pub temperature: f64,
    /// Energy generated today in kWh.
    #[cfg_attr(feature = "serde", serde(rename = "energytoday"))]
    pub energy_today: f64,
    /// DC input voltage in V.
    #[cfg_attr(feature = "serde", serde(rename = "VDC"))]
    pub vdc: f64,
    /// DC input current in A.
    #[cfg_attr(feature = "serde", serde(rename = "I"))]
    pub current: f64,
    /// AC grid voltage in V.
    #[cfg_attr(feature = "serde", serde(rename = "VAC"))]
    pub vac: f64,
    /// AC grid frequency in Hz.
    #[cfg_attr(feature = "serde", serde(rename = "freq"))]
    pub frequency: f64,
    /// Current output power in W.
    #[cfg_attr(feature = "serde", serde(rename = "W"))]
    pub power: u16,
    /// Undocumented field, reported verbatim.
    #[cfg_attr(feature = "serde", serde(rename = "unk1"))]
    pub unknown1: i16,
    /// Undocumented field, reported verbatim.
    #[cfg_attr(feature = "serde", serde(rename = "unk2"))]
    pub unknown2: i16,
    /// Lifetime energy in kWh.
    #[cfg_attr(feature = "serde", serde(rename = "totalenergy"))]
    pub energy_total: f64,
}

impl Telemetry {
    fn decode(payload: &[u8]) -> Self {
        Telemetry {
            temperature: field_i16(payload, 0) as f64 / 10.0,
            energy_today: field_u16(payload, 1) as f64 / 100.0,
            vdc: field_u16(payload, 2) as f64 / 10.0,
            current: field_u16(payload, 3) as f64 / 10.0,
            vac: field_u16(payload, 4) as f64 / 10.0,
            frequency: field_u16(payload, 5) as f64 / 100.0,
            power: field_u16(payload, 6),
            unknown1: field_i16(payload, 7),
            unknown2: field_i16(payload, 8),
            energy_total: field_u16(payload, 9) as f64 / 10.0,
        }
    }
}

/// Telemetry block of a dual-string "Suntwin" inverter.
///
/// Same 20-byte wire layout as [`Telemetry`], different field meanings
/// and scale divisors.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TwinTelemetry {
    /// Heatsink temperature in °C.
    #[cfg_attr(feature = "serde", serde(rename = "Temp"))]
    pub temperature: f64,
    /// DC voltage of string 1, raw units.
    #[cfg_attr(feature = "serde", serde(rename = "VDC1"))]
    pub vdc1: u16,
    /// DC voltage of string 2 in V.
    #[cfg_attr(feature = "serde", serde(rename = "VDC2"))]
    pub vdc2: f64,
    /// DC current of string 1, raw units.
    #[cfg_attr(feature = "serde", serde(rename = "IDC1"))]
    pub idc1: u16,
    /// DC current of string 2, raw units.
    #[cfg_attr(feature = "serde", serde(rename = "IDC2"))]
    pub idc2: u16,
    /// Energy generated today in kWh.
    #[cfg_attr(feature = "serde", serde(rename = "TodayE"))]
    pub energy_today: f64,
    /// AC output current in A.
    #[cfg_attr(feature = "serde", serde(rename = "IAC"))]
    pub iac: f64,
    /// AC grid voltage in V.
    #[cfg_attr(feature = "serde", serde(rename = "VAC"))]
    pub vac: f64,
    /// AC grid frequency in Hz.
    #[cfg_attr(feature = "serde", serde(rename = "FAC"))]
    pub frequency: f64,
    /// Current output power in W.
    #[cfg_attr(feature = "serde", serde(rename = "CurrP"))]
    pub power: i16,
}

impl TwinTelemetry {
    fn decode(payload: &[u8]) -> Self {
        TwinTelemetry {
            temperature: field_i16(payload, 0) as f64 / 10.0,
            vdc1: field_u16(payload, 1),
            vdc2: field_u16(payload, 2) as f64 / 10.0,
            idc1: field_u16(payload, 3),
            idc2: field_u16(payload, 4),
            energy_today: field_u16(payload, 5) as f64 / 100.0,
            iac: field_u16(payload, 6) as f64 / 10.0,
            vac: field_u16(payload, 7) as f64 / 10.0,
            frequency: field_u16(payload, 8) as f64 / 100.0,
            power: field_i16(payload, 9),
        }
    }
}

/// A decoded telemetry block of either inverter variant.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum TelemetryRecord {
    Single(Telemetry),
    Twin(TwinTelemetry),
}

impl TelemetryRecord {
    /// Decodes the telemetry `payload` (the frame contents after the 7-byte
    /// header) according to `variant`.
    ///
    /// Pure: the same payload always decodes to the same record. Returns
    /// [`Error::ShortResponse`] if fewer than [`TELEMETRY_LEN`] bytes are
    /// available.
    pub fn decode(variant: DeviceVariant, payload: &[u8]) -> Result<Self, Error> {
        if payload.len() < TELEMETRY_LEN {
            return Err(Error::ShortResponse {
                actual: payload.len(),
                expected: TELEMETRY_LEN,
            });
        }
        Ok(match variant {
            DeviceVariant::SingleString => TelemetryRecord::Single(Telemetry::decode(payload)),
            DeviceVariant::Twin => TelemetryRecord::Twin(TwinTelemetry::decode(payload)),
        })
    }
}
