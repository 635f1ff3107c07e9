//! Session controller for one poll cycle.
//!
//! The inverter must be walked through a fixed sequence before it answers
//! telemetry requests: a reset (unanswered), an identify request returning
//! the serial number, and a registration request that assigns the device
//! address used for all subsequent traffic.

use crate::error::{Error, Result};
use crate::protocol as proto;
use crate::reader;
use crate::transport::Transport;
use std::time::Duration;

/// How long the inverter needs between handshake steps before it will
/// answer the next request. A protocol timing requirement of the hardware,
/// not a tunable.
pub const SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Client for a JFY grid-connect inverter on a serial bus.
///
/// Owns the transport and all session state: the current destination
/// address (broadcast until registration) and the response buffer. One
/// client instance drives one poll session.
///
/// # Examples
///
/// ```no_run
/// use jfy_inverter_lib::client::JfyInverter;
/// use jfy_inverter_lib::protocol::DeviceVariant;
/// use jfy_inverter_lib::transport::SerialTransport;
///
/// let port = SerialTransport::open("/dev/ttyS0")?;
/// let mut inverter = JfyInverter::new(port);
/// inverter.register()?;
/// let record = inverter.poll_telemetry(DeviceVariant::SingleString)?;
/// println!("{record:?}");
/// # Ok::<(), jfy_inverter_lib::Error>(())
/// ```
pub struct JfyInverter<T> {
    port: T,
    destination: u8,
    response: Vec<u8>,
    settle_delay: Duration,
}

impl<T: Transport> JfyInverter<T> {
    /// Creates a client talking on `port`. The destination address starts
    /// at broadcast; [`register`](Self::register) assigns the real one.
    pub fn new(port: T) -> Self {
        JfyInverter {
            port,
            destination: proto::BROADCAST_ADDRESS,
            response: Vec::with_capacity(proto::MAX_FRAME),
            settle_delay: SETTLE_DELAY,
        }
    }

    /// Overrides the inter-step settle delay. Only useful when driving the
    /// state machine against a simulated transport.
    pub fn set_settle_delay(&mut self, delay: Duration) {
        self.settle_delay = delay;
    }

    /// Consumes the client, returning the transport.
    pub fn into_port(self) -> T {
        self.port
    }

    fn send(&mut self, command: proto::Command, payload: &[u8]) -> Result<()> {
        let frame = proto::encode_request(self.destination, command, payload)?;
        trace_frame("==>", &frame);
        let written = self.port.write(&frame)?;
        if written != frame.len() {
            return Err(Error::ShortWrite {
                written,
                expected: frame.len(),
            });
        }
        Ok(())
    }

    /// Sends a request and reads the response frame, which must carry at
    /// least the 7-byte header.
    fn transact(&mut self, command: proto::Command, payload: &[u8]) -> Result<()> {
        self.send(command, payload)?;
        let len = reader::read_frame(&mut self.port, &mut self.response)?;
        trace_frame("<==", &self.response);
        if len < proto::HEADER_LEN {
            return Err(Error::ShortResponse {
                actual: len,
                expected: proto::HEADER_LEN,
            });
        }
        Ok(())
    }

    /// Runs the three-step registration handshake: reset, identify,
    /// register.
    ///
    /// The reset is not answered by the inverter. The identify response
    /// carries the serial number (its length given by the response's length
    /// byte), which is echoed back with the address-assignment byte appended
    /// to register the inverter as device 1.
    ///
    /// Each step is separated by the settle delay the hardware requires.
    pub fn register(&mut self) -> Result<()> {
        log::info!("resetting inverter");
        self.send(proto::Command::Reset, &[])?;
        std::thread::sleep(self.settle_delay);

        log::info!("requesting inverter identity");
        self.transact(proto::Command::Identify, &[])?;
        let declared = self.response[6] as usize;
        let end = proto::HEADER_LEN + declared;
        if self.response.len() < end {
            return Err(Error::ShortResponse {
                actual: self.response.len(),
                expected: end,
            });
        }
        let mut serial = self.response[proto::HEADER_LEN..end].to_vec();
        serial.push(proto::ASSIGNED_ADDRESS);
        std::thread::sleep(self.settle_delay);

        log::info!("registering inverter as device {}", proto::ASSIGNED_ADDRESS);
        self.transact(proto::Command::Register, &serial)?;
        Ok(())
    }

    /// Polls the registered inverter for one telemetry block and decodes it
    /// according to `variant`.
    ///
    /// The response must carry a full 20-byte telemetry payload after the
    /// header; anything shorter is a [`Error::ShortResponse`].
    pub fn poll_telemetry(&mut self, variant: proto::DeviceVariant) -> Result<proto::TelemetryRecord> {
        self.destination = proto::ASSIGNED_ADDRESS;
        self.transact(proto::Command::PollTelemetry, &[])?;
        if self.response.len() < proto::MIN_TELEMETRY_FRAME {
            return Err(Error::ShortResponse {
                actual: self.response.len(),
                expected: proto::MIN_TELEMETRY_FRAME,
            });
        }
        proto::TelemetryRecord::decode(variant, &self.response[proto::HEADER_LEN..])
    }
}

fn trace_frame(direction: &str, bytes: &[u8]) {
    if log::log_enabled!(log::Level::Debug) && !bytes.is_empty() {
        let hex: String = bytes.iter().map(|byte| format!("{byte:02X}")).collect();
        log::debug!("{direction} {hex}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{
        Command, DeviceVariant, TelemetryRecord, ASSIGNED_ADDRESS, BROADCAST_ADDRESS, HEADER_LEN,
    };
    use crate::transport::testing::ScriptedPort;
    use assert_matches::assert_matches;

    /// Builds a syntactically complete response frame around `payload`.
    fn response_frame(function: u8, payload: &[u8]) -> Vec<u8> {
        let mut frame = vec![0xA5, 0xA5, ASSIGNED_ADDRESS, 0x00, 0x30, function, payload.len() as u8];
        frame.extend_from_slice(payload);
        let sum = crate::protocol::checksum(&frame);
        frame.extend_from_slice(&sum.to_be_bytes());
        frame.extend_from_slice(&[b'\n', b'\r']);
        frame
    }

    fn telemetry_payload() -> Vec<u8> {
        let mut payload = Vec::new();
        for raw in [372u16, 2448, 1541, 3, 2429, 5001, 0, 0xFFFF, 0, 24090] {
            payload.extend_from_slice(&raw.to_be_bytes());
        }
        payload
    }

    fn client_with(port: ScriptedPort) -> JfyInverter<ScriptedPort> {
        let mut client = JfyInverter::new(port);
        client.set_settle_delay(Duration::ZERO);
        client
    }

    #[test]
    fn full_session() {
        let serial = b"JFY-150GS-0042";
        let mut port = ScriptedPort::new();
        port.push_response(&response_frame(0x40, serial));
        port.push_response(&response_frame(0x41, &[0x06]));
        port.push_response(&response_frame(0x42, &telemetry_payload()));

        let mut client = client_with(port);
        client.register().unwrap();
        let record = client.poll_telemetry(DeviceVariant::SingleString).unwrap();

        let telemetry = match record {
            TelemetryRecord::Single(telemetry) => telemetry,
            TelemetryRecord::Twin(_) => panic!("wrong variant"),
        };
        assert_eq!(telemetry.vac, 242.9);
        assert_eq!(telemetry.frequency, 50.01);

        let port = client.into_port();
        assert_eq!(port.writes.len(), 4);

        // Reset goes to the broadcast address, unanswered.
        let reset = &port.writes[0];
        assert_eq!(reset[3], BROADCAST_ADDRESS);
        assert_eq!((reset[4], reset[5]), (Command::Reset.control(), Command::Reset.function()));

        // Registration echoes the serial number plus the assignment byte.
        let register = &port.writes[2];
        assert_eq!(register[6] as usize, serial.len() + 1);
        assert_eq!(&register[HEADER_LEN..HEADER_LEN + serial.len()], serial);
        assert_eq!(register[HEADER_LEN + serial.len()], ASSIGNED_ADDRESS);

        // The poll goes to the assigned address.
        let poll = &port.writes[3];
        assert_eq!(poll[3], ASSIGNED_ADDRESS);
        assert_eq!(
            (poll[4], poll[5]),
            (Command::PollTelemetry.control(), Command::PollTelemetry.function())
        );
    }

    #[test]
    fn short_identify_response_fails_registration() {
        let mut port = ScriptedPort::new();
        port.push_response(b"ng\n\r");
        let mut client = client_with(port);
        assert_matches!(
            client.register(),
            Err(Error::ShortResponse {
                actual: 4,
                expected: HEADER_LEN
            })
        );
    }

    #[test]
    fn identify_length_byte_is_bounds_checked() {
        let mut port = ScriptedPort::new();
        // Header declares a 32-byte serial number but the frame carries none.
        port.push_response(&[0xA5, 0xA5, 0x01, 0x00, 0x30, 0x40, 32, b'\n', b'\r']);
        let mut client = client_with(port);
        assert_matches!(
            client.register(),
            Err(Error::ShortResponse {
                actual: 9,
                expected: 39
            })
        );
    }

    #[test]
    fn short_write_aborts_session() {
        let mut port = ScriptedPort::new();
        port.short_write = Some(3);
        let mut client = client_with(port);
        assert_matches!(client.register(), Err(Error::ShortWrite { written: 3, expected: 11 }));
    }

    #[test]
    fn short_poll_response_is_a_telemetry_failure() {
        let mut port = ScriptedPort::new();
        port.push_response(&response_frame(0x40, b"SER"));
        port.push_response(&response_frame(0x41, &[0x06]));
        // Telemetry response with a truncated payload.
        port.push_response(&response_frame(0x42, &[0x01, 0x74]));

        let mut client = client_with(port);
        client.register().unwrap();
        assert_matches!(
            client.poll_telemetry(DeviceVariant::SingleString),
            Err(Error::ShortResponse { actual: 13, expected: 27 })
        );
    }

    #[test]
    fn destination_switches_after_registration() {
        let mut port = ScriptedPort::new();
        port.push_response(&response_frame(0x40, b"SER"));
        port.push_response(&response_frame(0x41, &[0x06]));
        port.push_response(&response_frame(0x42, &telemetry_payload()));

        let mut client = client_with(port);
        client.register().unwrap();
        client.poll_telemetry(DeviceVariant::Twin).unwrap();

        let port = client.into_port();
        // Reset, identify and register are broadcast; only the poll is addressed.
        assert_eq!(port.writes[0][3], BROADCAST_ADDRESS);
        assert_eq!(port.writes[1][3], BROADCAST_ADDRESS);
        assert_eq!(port.writes[2][3], BROADCAST_ADDRESS);
        assert_eq!(port.writes[3][3], ASSIGNED_ADDRESS);
    }
}
