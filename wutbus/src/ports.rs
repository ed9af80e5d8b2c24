use crate::constants::ports::PORT_COUNT;

/// State of all ports of one kind, in port order
pub type PortValues = [bool; PORT_COUNT];

/// Packed representation of the 16 inputs or outputs, port 0 is the least significant bit
///
/// The text protocol transfers it as exactly 4 uppercase hex digits.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct PortMask {
    value: u16,
}

/// Error returned when parsing a [`PortMask`] from text
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("'{0}' is not a hexadecimal port mask of 1 to 4 digits")]
pub struct BadPortMask(pub String);

impl PortMask {
    /// Wrap a raw 16-bit mask
    pub const fn new(value: u16) -> Self {
        Self { value }
    }

    /// Underlying raw value
    pub const fn value(self) -> u16 {
        self.value
    }

    /// Pack port values, bit `i` is set if `values[i]` is true
    pub fn from_values(values: &PortValues) -> Self {
        let value = values
            .iter()
            .enumerate()
            .filter(|(_, set)| **set)
            .fold(0u16, |acc, (i, _)| acc | (1 << i));
        Self { value }
    }

    /// Unpack into one value per port
    pub fn to_values(self) -> PortValues {
        std::array::from_fn(|i| self.is_set(i))
    }

    /// True if `port` is set. Ports outside the mask are never set.
    pub fn is_set(self, port: usize) -> bool {
        port < PORT_COUNT && self.value & (1 << port) != 0
    }

    /// Copy of the mask with `port` changed to `state`
    pub fn with(self, port: usize, state: bool) -> Self {
        if port >= PORT_COUNT {
            return self;
        }
        let bit = 1 << port;
        let value = if state {
            self.value | bit
        } else {
            self.value & !bit
        };
        Self { value }
    }
}

impl std::fmt::Display for PortMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04X}", self.value)
    }
}

impl std::str::FromStr for PortMask {
    type Err = BadPortMask;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim();
        // from_str_radix alone would also accept a leading sign
        if digits.is_empty()
            || digits.len() > 4
            || !digits.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(BadPortMask(s.to_string()));
        }
        u16::from_str_radix(digits, 16)
            .map(Self::new)
            .map_err(|_| BadPortMask(s.to_string()))
    }
}
