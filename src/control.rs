// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Types and constants for the NTP Control Message header (mode 6).
//!
//! Provides `ReadBytes` and `WriteBytes` implementations which extend the
//! byteorder crate `WriteBytesExt` and `ReadBytesExt` traits with the ability
//! to read and write the control-message header, plus the two decoding
//! helpers the sampler needs: association-id extraction from READSTAT
//! responses and payload-text extraction from READVAR responses.
//!
//! Only the two read-only operations used for monitoring (READSTAT and
//! READVAR) are supported. SET/trap operations, authentication, and
//! multi-fragment responses are out of scope.

use byteorder::{ReadBytesExt, WriteBytesExt, BE};
use std::io;

use crate::error::Error;

/// Control-message mode value in the packed first byte.
pub const MODE: u8 = 6;

/// Control-message protocol version, fixed at 2.
pub const VERSION: u8 = 2;

/// Size in bytes of the fixed control-message header.
pub const HEADER_LEN: usize = 12;

/// Fixed sequence number used for every request.
///
/// The exchange is strictly one request, one response, over a fresh socket,
/// so sequence numbers carry no information for this client.
pub const SEQUENCE: u16 = 1;

/// The legacy private-mode request payload understood by older daemons.
///
/// A fixed 12-byte magic blob whose response is free text with no control
/// framing; it is handed to the variable extractor whole.
pub const PRIVATE_REQUEST: [u8; HEADER_LEN] =
    [0x16, 0x02, 0x00, 0x01, 0, 0, 0, 0, 0, 0, 0, 0];

/// A trait for writing control-message types to network-endian bytes.
///
/// A blanket implementation is provided for all types that implement
/// `byteorder::WriteBytesExt`.
pub trait WriteBytes {
    /// Writes a control-message type to this writer in network byte order.
    fn write_bytes<P: WriteToBytes>(&mut self, protocol: P) -> io::Result<()>;
}

/// A trait for reading control-message types from network-endian bytes.
///
/// A blanket implementation is provided for all types that implement
/// `byteorder::ReadBytesExt`.
pub trait ReadBytes {
    /// Reads a control-message type from this reader in network byte order.
    fn read_bytes<P: ReadFromBytes>(&mut self) -> io::Result<P>;
}

/// Control-message types that may be written to network endian bytes.
pub trait WriteToBytes {
    /// Write the type to bytes.
    fn write_to_bytes<W: WriteBytesExt>(&self, writer: W) -> io::Result<()>;
}

/// Control-message types that may be read from network endian bytes.
pub trait ReadFromBytes: Sized {
    /// Read the type from bytes.
    fn read_from_bytes<R: ReadBytesExt>(reader: R) -> io::Result<Self>;
}

/// Types that have a constant size when written to or read from bytes.
pub trait ConstPackedSizeBytes {
    /// The constant size in bytes when this type is packed for transmission.
    const PACKED_SIZE_BYTES: usize;
}

/// The two control operations used for monitoring.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum Opcode {
    /// Read the association status list (opcode 1).
    ReadStat = 1,
    /// Read named variables for one association (opcode 2).
    ReadVar = 2,
}

impl TryFrom<u8> for Opcode {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Error> {
        match value {
            1 => Ok(Opcode::ReadStat),
            2 => Ok(Opcode::ReadVar),
            opcode => Err(Error::UnsupportedOperation { opcode }),
        }
    }
}

/// **Control Message Header** - the fixed 12-byte preamble of every mode 6
/// request and response.
///
/// ### Layout
///
/// ```ignore
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |LI |  VN |Mode |R|E|M| OpCode  |       Sequence Number         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |            Status             |       Association ID          |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |            Offset             |            Count              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// Requests are created via [`ControlHeader::request`] and never mutated
/// after construction. Responses set the R bit and carry the payload length
/// in `count`; the `offset` field is only non-zero for fragmented responses,
/// which this client does not reassemble.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ControlHeader {
    /// Leap indicator bits (always zero in requests).
    pub leap: u8,
    /// Protocol version (fixed at [`VERSION`]).
    pub version: u8,
    /// Response bit: set by the daemon on replies.
    pub response: bool,
    /// Error bit: set by the daemon when the request was rejected.
    pub error: bool,
    /// More bit: set when the response continues in another fragment.
    pub more: bool,
    /// The requested operation.
    pub opcode: Opcode,
    /// Sequence number echoed by the daemon.
    pub sequence: u16,
    /// Status word (unused by this client).
    pub status: u16,
    /// Association the message refers to; 0 is the daemon itself.
    pub association_id: u16,
    /// Byte offset of this fragment's payload within the full response.
    pub offset: u16,
    /// Number of payload bytes following the header.
    pub count: u16,
}

impl ControlHeader {
    /// Build a request header for the given association and operation.
    ///
    /// Same inputs always yield identical bytes; the sequence number is the
    /// fixed [`SEQUENCE`] constant.
    pub fn request(association_id: u16, opcode: Opcode) -> ControlHeader {
        ControlHeader {
            leap: 0,
            version: VERSION,
            response: false,
            error: false,
            more: false,
            opcode,
            sequence: SEQUENCE,
            status: 0,
            association_id,
            offset: 0,
            count: 0,
        }
    }

    /// Encode this header into its fixed-size buffer.
    pub fn encode(&self) -> io::Result<[u8; Self::PACKED_SIZE_BYTES]> {
        let mut buf = [0u8; Self::PACKED_SIZE_BYTES];
        (&mut buf[..]).write_bytes(*self)?;
        Ok(buf)
    }
}

impl ConstPackedSizeBytes for ControlHeader {
    const PACKED_SIZE_BYTES: usize = HEADER_LEN;
}

// Writer implementations.

impl<W> WriteBytes for W
where
    W: WriteBytesExt,
{
    fn write_bytes<P: WriteToBytes>(&mut self, protocol: P) -> io::Result<()> {
        protocol.write_to_bytes(self)
    }
}

impl<P> WriteToBytes for &P
where
    P: WriteToBytes,
{
    fn write_to_bytes<W: WriteBytesExt>(&self, writer: W) -> io::Result<()> {
        (*self).write_to_bytes(writer)
    }
}

impl WriteToBytes for ControlHeader {
    fn write_to_bytes<W: WriteBytesExt>(&self, mut writer: W) -> io::Result<()> {
        let li_vn_mode = (self.leap << 6) | (self.version << 3) | MODE;
        let mut rem_op = self.opcode as u8;
        rem_op |= (self.response as u8) << 7;
        rem_op |= (self.error as u8) << 6;
        rem_op |= (self.more as u8) << 5;
        writer.write_u8(li_vn_mode)?;
        writer.write_u8(rem_op)?;
        writer.write_u16::<BE>(self.sequence)?;
        writer.write_u16::<BE>(self.status)?;
        writer.write_u16::<BE>(self.association_id)?;
        writer.write_u16::<BE>(self.offset)?;
        writer.write_u16::<BE>(self.count)?;
        Ok(())
    }
}

// Reader implementations.

impl<R> ReadBytes for R
where
    R: ReadBytesExt,
{
    fn read_bytes<P: ReadFromBytes>(&mut self) -> io::Result<P> {
        P::read_from_bytes(self)
    }
}

impl ReadFromBytes for ControlHeader {
    fn read_from_bytes<R: ReadBytesExt>(mut reader: R) -> io::Result<Self> {
        let li_vn_mode = reader.read_u8()?;
        let leap = li_vn_mode >> 6;
        let version = (li_vn_mode >> 3) & 0b111;
        let mode = li_vn_mode & 0b111;
        if mode != MODE {
            let err_msg = "not a control-mode message";
            return Err(io::Error::new(io::ErrorKind::InvalidData, err_msg));
        }
        let rem_op = reader.read_u8()?;
        let opcode = match Opcode::try_from(rem_op & 0x1f).ok() {
            Some(opcode) => opcode,
            None => {
                let err_msg = "unknown control opcode";
                return Err(io::Error::new(io::ErrorKind::InvalidData, err_msg));
            }
        };
        Ok(ControlHeader {
            leap,
            version,
            response: rem_op & 0x80 != 0,
            error: rem_op & 0x40 != 0,
            more: rem_op & 0x20 != 0,
            opcode,
            sequence: reader.read_u16::<BE>()?,
            status: reader.read_u16::<BE>()?,
            association_id: reader.read_u16::<BE>()?,
            offset: reader.read_u16::<BE>()?,
            count: reader.read_u16::<BE>()?,
        })
    }
}

// Response decoding helpers.

/// Decode the header of a binary response, mapping any shortfall or
/// garbage to [`Error::MalformedResponse`].
fn decode_header(response: &[u8]) -> Result<ControlHeader, Error> {
    if response.len() < HEADER_LEN {
        return Err(Error::MalformedResponse {
            detail: format!("{} bytes is shorter than the header", response.len()),
        });
    }
    (&response[..HEADER_LEN])
        .read_bytes::<ControlHeader>()
        .map_err(|e| Error::MalformedResponse {
            detail: e.to_string(),
        })
}

/// Extract the association-id list from a READSTAT response.
///
/// The payload is an array of big-endian 16-bit words: association ids at
/// even word indices, per-association status bits at odd indices. The status
/// words are discarded. A `count` of zero yields an empty list; the caller
/// decides whether that is a failure.
pub fn extract_association_ids(response: &[u8]) -> Result<Vec<u16>, Error> {
    let header = decode_header(response)?;
    let count = header.count as usize;
    if count == 0 {
        return Ok(Vec::new());
    }
    if count % 2 != 0 {
        return Err(Error::MalformedResponse {
            detail: format!("odd payload count {count}"),
        });
    }
    if response.len() < HEADER_LEN + count {
        return Err(Error::MalformedResponse {
            detail: format!(
                "payload count {count} exceeds datagram ({} bytes)",
                response.len()
            ),
        });
    }
    let ids = response[HEADER_LEN..HEADER_LEN + count]
        .chunks_exact(2)
        .map(|word| u16::from_be_bytes([word[0], word[1]]))
        .step_by(2)
        .collect();
    Ok(ids)
}

/// Extract the textual payload of a READVAR response.
///
/// The payload length comes from the header's `count` field; non-UTF-8 bytes
/// are replaced rather than rejected, since the variable extractor is
/// tolerant of junk.
pub fn payload_text(response: &[u8]) -> Result<String, Error> {
    let header = decode_header(response)?;
    let count = header.count as usize;
    if response.len() < HEADER_LEN + count {
        return Err(Error::MalformedResponse {
            detail: format!(
                "payload count {count} exceeds datagram ({} bytes)",
                response.len()
            ),
        });
    }
    let payload = &response[HEADER_LEN..HEADER_LEN + count];
    Ok(String::from_utf8_lossy(payload).into_owned())
}
