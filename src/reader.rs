//! Response frame assembly.
//!
//! Responses are not length-prefixed on the wire; the only reliable end
//! marker is the `\n\r` terminator, so frames are accumulated one byte at a
//! time.

use crate::error::Result;
use crate::protocol::MAX_FRAME;
use crate::transport::{ReadByte, Transport};
use std::time::Duration;

/// Pause between empty-read polls while waiting for the inverter to answer.
const EMPTY_READ_BACKOFF: Duration = Duration::from_millis(5);
/// Total number of empty-read polls tolerated before giving up on the frame.
const EMPTY_READ_BUDGET: u32 = 256;

/// Reads one response frame from `port` into `buf` and returns its length.
///
/// Accumulation stops when a `\r` arrives directly after a buffered `\n`,
/// when the buffer reaches [`MAX_FRAME`] bytes, or when the empty-read
/// budget is exhausted; in the latter cases whatever was accumulated
/// (possibly nothing) is returned and the caller decides whether that is
/// enough for the current protocol step. A transport fault aborts
/// immediately.
pub fn read_frame<T: Transport>(port: &mut T, buf: &mut Vec<u8>) -> Result<usize> {
    buf.clear();
    let mut empty_reads = 0u32;
    while buf.len() < MAX_FRAME {
        match port.read_byte()? {
            ReadByte::Byte(byte) => {
                buf.push(byte);
                if byte == b'\r' && buf.len() >= 2 && buf[buf.len() - 2] == b'\n' {
                    break;
                }
            }
            ReadByte::WouldBlock => {
                empty_reads += 1;
                if empty_reads >= EMPTY_READ_BUDGET {
                    log::trace!("giving up on frame after {empty_reads} empty reads");
                    break;
                }
                std::thread::sleep(EMPTY_READ_BACKOFF);
            }
        }
    }
    Ok(buf.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::ScriptedPort;
    use assert_matches::assert_matches;

    #[test]
    fn stops_at_terminator() {
        let mut port = ScriptedPort::new();
        port.push_response(b"abc\n\rXYZ");
        let mut buf = Vec::new();
        assert_eq!(read_frame(&mut port, &mut buf).unwrap(), 5);
        assert_eq!(buf, b"abc\n\r");
        // Bytes after the terminator stay queued for the next frame.
        assert_eq!(port.reads.len(), 3);
    }

    #[test]
    fn terminator_requires_newline_first() {
        let mut port = ScriptedPort::new();
        // A lone carriage return must not terminate the frame, even as the
        // first byte of the stream.
        port.push_response(b"\rab\n\r");
        let mut buf = Vec::new();
        assert_eq!(read_frame(&mut port, &mut buf).unwrap(), 5);
        assert_eq!(buf, b"\rab\n\r");
    }

    #[test]
    fn stops_exactly_after_terminator_near_the_cap() {
        let mut port = ScriptedPort::new();
        let mut stream = vec![0x42; 253];
        stream.extend_from_slice(b"\n\r");
        port.push_response(&stream);
        let mut buf = Vec::new();
        assert_eq!(read_frame(&mut port, &mut buf).unwrap(), 255);
        assert_eq!(&buf[253..], b"\n\r");
    }

    #[test]
    fn stops_at_buffer_cap_without_terminator() {
        let mut port = ScriptedPort::new();
        port.push_response(&[0x55; 300]);
        let mut buf = Vec::new();
        assert_eq!(read_frame(&mut port, &mut buf).unwrap(), MAX_FRAME);
        assert_eq!(buf.len(), MAX_FRAME);
    }

    #[test]
    fn tolerates_interleaved_empty_reads() {
        let mut port = ScriptedPort::new();
        port.push_would_block(3);
        port.push_response(b"ok");
        port.push_would_block(2);
        port.push_response(b"\n\r");
        let mut buf = Vec::new();
        assert_eq!(read_frame(&mut port, &mut buf).unwrap(), 4);
        assert_eq!(buf, b"ok\n\r");
    }

    #[test]
    fn gives_up_after_empty_read_budget() {
        let mut port = ScriptedPort::new();
        port.push_response(b"partial");
        // Script exhausted: the port reports WouldBlock forever afterwards.
        let mut buf = Vec::new();
        assert_eq!(read_frame(&mut port, &mut buf).unwrap(), 7);
        assert_eq!(buf, b"partial");
    }

    #[test]
    fn empty_bus_returns_zero_bytes() {
        let mut port = ScriptedPort::new();
        let mut buf = Vec::new();
        assert_eq!(read_frame(&mut port, &mut buf).unwrap(), 0);
        assert!(buf.is_empty());
    }

    #[test]
    fn clears_previous_frame() {
        let mut port = ScriptedPort::new();
        port.push_response(b"first\n\r");
        port.push_response(b"second\n\r");
        let mut buf = Vec::new();
        read_frame(&mut port, &mut buf).unwrap();
        assert_eq!(read_frame(&mut port, &mut buf).unwrap(), 8);
        assert_eq!(buf, b"second\n\r");
    }

    #[test]
    fn transport_fault_aborts() {
        let mut port = ScriptedPort::new();
        port.push_response(b"ab");
        port.push_error();
        let mut buf = Vec::new();
        assert_matches!(read_frame(&mut port, &mut buf), Err(crate::Error::Io(_)));
    }
}
