use crate::error::FrameError;

/// Read-only cursor that consumes a frame payload front to back
///
/// Every read either returns the requested value and advances, or fails
/// with [`FrameError::InsufficientBytes`] without consuming anything.
#[derive(Debug, Copy, Clone)]
pub struct ReadCursor<'a> {
    src: &'a [u8],
}

/// write cursor over a fixed size buffer
pub(crate) struct WriteCursor<'a> {
    dest: &'a mut [u8],
    pos: usize,
}

impl<'a> ReadCursor<'a> {
    /// Create a cursor positioned at the start of `src`
    pub fn new(src: &'a [u8]) -> ReadCursor<'a> {
        ReadCursor { src }
    }

    /// Number of bytes left to read
    pub fn remaining(&self) -> usize {
        self.src.len()
    }

    /// True if every byte has been consumed
    pub fn is_empty(&self) -> bool {
        self.src.is_empty()
    }

    /// Read a single byte
    pub fn read_u8(&mut self) -> Result<u8, FrameError> {
        match self.src.split_first() {
            Some((first, rest)) => {
                self.src = rest;
                Ok(*first)
            }
            None => Err(FrameError::InsufficientBytes {
                requested: 1,
                remaining: 0,
            }),
        }
    }

    /// Read a big-endian u16
    pub fn read_u16_be(&mut self) -> Result<u16, FrameError> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Read a big-endian u32
    pub fn read_u32_be(&mut self) -> Result<u32, FrameError> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read a run of `count` raw bytes
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], FrameError> {
        if self.src.len() < count {
            return Err(FrameError::InsufficientBytes {
                requested: count,
                remaining: self.src.len(),
            });
        }

        let (ret, rest) = self.src.split_at(count);
        self.src = rest;
        Ok(ret)
    }
}

impl<'a> WriteCursor<'a> {
    pub(crate) fn new(dest: &'a mut [u8]) -> WriteCursor<'a> {
        WriteCursor { dest, pos: 0 }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn remaining(&self) -> usize {
        self.dest.len() - self.pos
    }

    pub(crate) fn write_u8(&mut self, value: u8) -> Result<(), FrameError> {
        self.write_bytes(&[value])
    }

    pub(crate) fn write_u16_be(&mut self, value: u16) -> Result<(), FrameError> {
        self.write_bytes(&value.to_be_bytes())
    }

    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), FrameError> {
        // don't write any bytes if there isn't space for the whole thing
        if self.remaining() < bytes.len() {
            return Err(FrameError::InsufficientSpace {
                requested: bytes.len(),
                remaining: self.remaining(),
            });
        }
        self.dest[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
        Ok(())
    }
}
