use crate::common::cursor::ReadCursor;
use crate::error::FrameError;

pub(crate) fn num_bytes_for_bits(count: u16) -> usize {
    (count as usize).div_ceil(8)
}

/// Parse the `byte count` + packed bits body of a read coils / read discrete inputs response.
///
/// Bit 0 is the least significant bit of the first byte. The byte count must be able
/// to hold `count` bits and must not exceed the remaining payload.
pub(crate) fn parse_packed_bits(
    cursor: &mut ReadCursor,
    count: u16,
) -> Result<Vec<bool>, FrameError> {
    let expected = num_bytes_for_bits(count);
    let byte_count = cursor.read_u8()? as usize;
    if byte_count < expected {
        return Err(FrameError::ByteCountMismatch {
            expected,
            actual: byte_count,
        });
    }

    let bytes = cursor.read_bytes(byte_count)?;

    Ok((0..count as usize)
        .map(|i| bytes[i / 8] & (1 << (i % 8)) != 0)
        .collect())
}

/// Inverse of [`parse_packed_bits`], used to build responses
#[cfg(test)]
pub(crate) fn pack_bits(values: &[bool]) -> Vec<u8> {
    let mut bytes = vec![0u8; values.len().div_ceil(8)];
    for (i, value) in values.iter().enumerate() {
        if *value {
            bytes[i / 8] |= 1 << (i % 8);
        }
    }
    bytes
}
