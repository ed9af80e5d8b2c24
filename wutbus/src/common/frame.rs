use crate::common::cursor::{ReadCursor, WriteCursor};
use crate::constants::mbap;
use crate::decode::DecodeLevel;
use crate::error::FrameError;

/// Modbus TCP transaction identifier
///
/// Zero is reserved to mean "no transaction", so the sequence produced by
/// [`TxId::next`] wraps from `0xFFFF` straight to `1`.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Default)]
pub struct TxId {
    value: u16,
}

impl TxId {
    /// Wrap a raw value
    pub fn new(value: u16) -> Self {
        TxId { value }
    }

    /// Underlying raw value
    pub fn to_u16(self) -> u16 {
        self.value
    }

    /// Advance to the next id and return it
    pub fn next(&mut self) -> TxId {
        self.value = self.value.wrapping_add(1);
        if self.value == 0 {
            self.value = 1;
        }
        *self
    }
}

impl std::fmt::Display for TxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#06X}", self.value)
    }
}

/// A single Modbus TCP frame: MBAP header, function code and payload
///
/// ```text
/// | tx id (2) | protocol id (2) | length (2) | unit id (1) | function (1) | payload (length - 2) |
/// ```
///
/// All fields are big-endian. The length field is derived from the payload
/// so the invariant `length == 2 + payload.len()` always holds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// transaction identifier chosen by the client and echoed by the server
    pub transaction_id: u16,
    /// protocol identifier, zero for Modbus
    pub protocol_id: u16,
    /// unit identifier
    pub unit_id: u8,
    /// function code
    pub function_code: u8,
    payload: Vec<u8>,
}

impl Frame {
    /// Create a frame with an empty payload, protocol id 0 and the TCP unit id sentinel
    pub fn new(function_code: u8) -> Self {
        Self {
            transaction_id: 0,
            protocol_id: mbap::PROTOCOL_ID,
            unit_id: mbap::UNIT_ID,
            function_code,
            payload: Vec::new(),
        }
    }

    /// Value of the MBAP length field: unit id, function code and payload
    pub fn length(&self) -> u16 {
        // payload is bounded by MAX_PAYLOAD_LENGTH when appended or decoded
        mbap::LENGTH_OVERHEAD + self.payload.len() as u16
    }

    /// Raw payload following the function code
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Cursor that reads the payload sequentially from its beginning
    pub fn payload_cursor(&self) -> ReadCursor<'_> {
        ReadCursor::new(&self.payload)
    }

    /// Append a byte to the payload
    pub fn append_u8(&mut self, value: u8) -> Result<(), FrameError> {
        self.append_bytes(&[value])
    }

    /// Append a big-endian u16 to the payload
    pub fn append_u16(&mut self, value: u16) -> Result<(), FrameError> {
        self.append_bytes(&value.to_be_bytes())
    }

    /// Append a big-endian u32 to the payload
    pub fn append_u32(&mut self, value: u32) -> Result<(), FrameError> {
        self.append_bytes(&value.to_be_bytes())
    }

    /// Append raw bytes to the payload
    pub fn append_bytes(&mut self, bytes: &[u8]) -> Result<(), FrameError> {
        let remaining = mbap::MAX_PAYLOAD_LENGTH - self.payload.len();
        if bytes.len() > remaining {
            return Err(FrameError::InsufficientSpace {
                requested: bytes.len(),
                remaining,
            });
        }
        self.payload.extend_from_slice(bytes);
        Ok(())
    }

    /// Total number of bytes of the encoded frame
    pub fn encoded_len(&self) -> usize {
        mbap::HEADER_LENGTH + self.payload.len()
    }

    /// Serialize the frame into `buffer`, returning the written portion
    pub fn encode_into<'a>(&self, buffer: &'a mut [u8]) -> Result<&'a [u8], FrameError> {
        let mut cursor = WriteCursor::new(buffer);
        cursor.write_u16_be(self.transaction_id)?;
        cursor.write_u16_be(self.protocol_id)?;
        cursor.write_u16_be(self.length())?;
        cursor.write_u8(self.unit_id)?;
        cursor.write_u8(self.function_code)?;
        cursor.write_bytes(&self.payload)?;
        let length = cursor.position();
        Ok(&buffer[..length])
    }

    /// Serialize the frame into a new vector
    pub fn encode(&self) -> Result<Vec<u8>, FrameError> {
        let mut buffer = [0; mbap::MAX_FRAME_LENGTH];
        Ok(self.encode_into(&mut buffer)?.to_vec())
    }

    /// Number of payload bytes announced by an 8-byte MBAP header
    pub fn payload_length(header: &[u8]) -> Result<usize, FrameError> {
        let mut cursor = ReadCursor::new(header);
        if cursor.remaining() < mbap::HEADER_LENGTH {
            return Err(FrameError::TooShortForHeader(cursor.remaining()));
        }
        cursor.read_bytes(4)?;
        let length = cursor.read_u16_be()?;

        if length < mbap::LENGTH_OVERHEAD {
            return Err(FrameError::LengthTooSmall(length));
        }

        let payload_length = (length - mbap::LENGTH_OVERHEAD) as usize;
        if payload_length > mbap::MAX_PAYLOAD_LENGTH {
            return Err(FrameError::LengthTooBig(length));
        }

        Ok(payload_length)
    }

    /// Parse a frame from a buffer that holds at least the header and the announced payload
    ///
    /// Bytes beyond the announced payload are ignored.
    pub fn decode(bytes: &[u8]) -> Result<Frame, FrameError> {
        let payload_length = Self::payload_length(bytes)?;

        let mut cursor = ReadCursor::new(bytes);
        let transaction_id = cursor.read_u16_be()?;
        let protocol_id = cursor.read_u16_be()?;
        cursor.read_u16_be()?;
        let unit_id = cursor.read_u8()?;
        let function_code = cursor.read_u8()?;

        if cursor.remaining() < payload_length {
            return Err(FrameError::TruncatedPayload {
                expected: payload_length,
                actual: cursor.remaining(),
            });
        }

        Ok(Frame {
            transaction_id,
            protocol_id,
            unit_id,
            function_code,
            payload: cursor.read_bytes(payload_length)?.to_vec(),
        })
    }
}

pub(crate) struct FrameDisplay<'a> {
    frame: &'a Frame,
    level: DecodeLevel,
}

impl<'a> FrameDisplay<'a> {
    pub(crate) fn new(level: DecodeLevel, frame: &'a Frame) -> Self {
        FrameDisplay { frame, level }
    }
}

impl std::fmt::Display for FrameDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "tx_id: {:#06X} proto_id: {:#06X} length: {} unit_id: {:#04X} function: {:#04X}",
            self.frame.transaction_id,
            self.frame.protocol_id,
            self.frame.length(),
            self.frame.unit_id,
            self.frame.function_code
        )?;

        if self.level.payload_enabled() {
            write!(f, " data:")?;
            for byte in self.frame.payload() {
                write!(f, " {byte:02X}")?;
            }
        }

        Ok(())
    }
}
