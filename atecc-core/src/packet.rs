//! Frame encoding and response validation

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::{
    checksum,
    command::{Command, Opcode},
    constants::{CMD_PAYLOAD_MAX, CMD_SIZE_MIN, RSP_SIZE_MIN},
    error::{Error, Result},
    status::Status,
};

/// Encode a command into a wire frame
///
/// # Frame Structure
///
/// ```text
/// ┌────────┬────────┬────────┬─────────────┬─────────────┬─────────────┐
/// │ Length │ Opcode │ Param1 │   Param2    │   Payload   │     CRC     │
/// │ 1 byte │ 1 byte │ 1 byte │  2 bytes LE │   N bytes   │  2 bytes LE │
/// └────────┴────────┴────────┴─────────────┴─────────────┴─────────────┘
/// ```
///
/// Length counts every byte of the frame including itself and the CRC; the
/// CRC covers everything before it.
///
/// # Examples
///
/// ```
/// use atecc_core::command::{Command, InfoMode};
/// use atecc_core::packet;
///
/// let frame = packet::encode(&Command::info(InfoMode::Revision)).unwrap();
/// assert_eq!(&frame[..], &[0x07, 0x30, 0x00, 0x00, 0x00, 0x03, 0x5D]);
/// ```
pub fn encode(command: &Command) -> Result<BytesMut> {
    if command.payload.len() > CMD_PAYLOAD_MAX {
        return Err(Error::PayloadTooLarge {
            size: command.payload.len(),
            max: CMD_PAYLOAD_MAX,
        });
    }

    let size = CMD_SIZE_MIN + command.payload.len();
    let mut buf = BytesMut::with_capacity(size);

    buf.put_u8(size as u8);
    buf.put_u8(command.opcode.into());
    buf.put_u8(command.param1);
    buf.put_u16_le(command.param2);
    buf.put_slice(&command.payload);

    let crc = checksum::crc16(&buf);
    buf.put_u16_le(crc);

    trace!("Encoded {}: {}", command, hex::encode_upper(&buf));
    Ok(buf)
}

/// Decode a wire frame back into a command
///
/// # Errors
///
/// Returns an error if:
/// - Frame is too short (< 7 bytes)
/// - Length byte does not match the frame size
/// - Checksum verification fails
/// - Opcode is unknown
pub fn decode(frame: &[u8]) -> Result<Command> {
    check_frame(frame, CMD_SIZE_MIN)?;

    let mut body = &frame[1..frame.len() - 2];
    let opcode = Opcode::try_from(body.get_u8())?;
    let param1 = body.get_u8();
    let param2 = body.get_u16_le();

    Command::new(opcode, param1, param2, Bytes::copy_from_slice(body))
}

/// Check size, length byte and checksum of a frame
fn check_frame(frame: &[u8], min: usize) -> Result<()> {
    if frame.len() < min {
        return Err(Error::FrameTooShort {
            expected: min,
            actual: frame.len(),
        });
    }

    let declared = usize::from(frame[0]);
    if declared != frame.len() {
        return Err(Error::LengthMismatch {
            declared,
            actual: frame.len(),
        });
    }

    let (body, crc) = frame.split_at(frame.len() - 2);
    let expected = checksum::crc16(body);
    let received = LittleEndian::read_u16(crc);
    if expected != received {
        return Err(Error::ChecksumMismatch { expected, received });
    }

    Ok(())
}

/// A validated response frame
///
/// Responses are `[length][data...][crc_lo][crc_hi]`. A four-byte response
/// carries a single status byte.
#[derive(Clone, PartialEq, Eq)]
pub struct Response<'a> {
    frame: &'a [u8],
}

impl<'a> Response<'a> {
    /// Validate a received frame
    ///
    /// Integrity is checked before anything else: a frame shorter than four
    /// bytes or with a bad checksum is rejected. A four-byte frame is then
    /// interpreted as a status and any non-success status is returned as
    /// [`Error::Status`].
    pub fn parse(frame: &'a [u8]) -> Result<Self> {
        check_frame(frame, RSP_SIZE_MIN)?;

        let response = Self { frame };
        if let Some(status) = response.status() {
            status.into_result()?;
        }

        Ok(response)
    }

    /// Status of a four-byte response
    pub fn status(&self) -> Option<Status> {
        (self.frame.len() == RSP_SIZE_MIN).then(|| Status::from(self.frame[1]))
    }

    /// Bytes between the length byte and the checksum
    pub fn data(&self) -> &'a [u8] {
        &self.frame[1..self.frame.len() - 2]
    }

    /// Total frame size
    pub fn size(&self) -> usize {
        self.frame.len()
    }

    /// Build a response frame around `data`
    ///
    /// This is what the chip puts on the wire; useful for simulated devices.
    pub fn frame(data: &[u8]) -> BytesMut {
        let mut buf = BytesMut::with_capacity(data.len() + 3);
        buf.put_u8((data.len() + 3) as u8);
        buf.put_slice(data);
        let crc = checksum::crc16(&buf);
        buf.put_u16_le(crc);
        buf
    }

    /// Build a four-byte status frame
    pub fn status_frame(status: Status) -> BytesMut {
        Self::frame(&[status.into()])
    }
}

impl fmt::Debug for Response<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("size", &self.size())
            .field("status", &self.status())
            .field("data_len", &self.data().len())
            .finish()
    }
}
