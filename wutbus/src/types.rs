use crate::common::frame::Frame;
use crate::constants::limits;
use crate::error::{FrameError, InvalidRequest};

/// Start and count tuple used when reading coils or discrete inputs
///
/// Cannot be constructed with invalid start/count
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddressRange {
    /// Starting address of the range
    pub start: u16,
    /// Count of elements in the range
    pub count: u16,
}

impl AddressRange {
    /// Create a range of bits, validating that the count is in `[1, 2000]`
    /// and that the last address doesn't overflow u16
    pub fn try_from(start: u16, count: u16) -> Result<Self, InvalidRequest> {
        if count == 0 {
            return Err(InvalidRequest::CountOfZero);
        }

        if count > limits::MAX_READ_COILS_COUNT {
            return Err(InvalidRequest::CountTooBig(
                count,
                limits::MAX_READ_COILS_COUNT,
            ));
        }

        let max_start = u16::MAX - (count - 1);
        if start > max_start {
            return Err(InvalidRequest::AddressOverflow(start, count));
        }

        Ok(Self { start, count })
    }

    pub(crate) fn serialize(&self, frame: &mut Frame) -> Result<(), FrameError> {
        frame.append_u16(self.start)?;
        frame.append_u16(self.count)
    }
}

impl std::fmt::Display for AddressRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "start: {:#06X} qty: {}", self.start, self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_count_of_zero() {
        assert_eq!(
            AddressRange::try_from(1, 0),
            Err(InvalidRequest::CountOfZero)
        );
    }

    #[test]
    fn rejects_count_above_read_limit() {
        assert!(AddressRange::try_from(0, 2000).is_ok());
        assert_eq!(
            AddressRange::try_from(0, 2001),
            Err(InvalidRequest::CountTooBig(2001, 2000))
        );
    }

    #[test]
    fn rejects_ranges_that_overflow_u16() {
        assert!(AddressRange::try_from(0xFFFF, 1).is_ok());
        assert!(AddressRange::try_from(0xFFFE, 2).is_ok());
        assert_eq!(
            AddressRange::try_from(0xFFFF, 2),
            Err(InvalidRequest::AddressOverflow(0xFFFF, 2))
        );
    }
}
