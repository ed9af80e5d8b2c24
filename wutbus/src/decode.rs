/// Controls how the MBAP frames exchanged with the device are decoded at the INFO log level
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum DecodeLevel {
    /// Decode nothing
    #[default]
    Nothing,
    /// Decode the header
    Header,
    /// Decode the header and the raw payload as hexadecimal
    Payload,
}

impl DecodeLevel {
    /// construct a `DecodeLevel` with nothing enabled
    pub fn nothing() -> Self {
        Self::default()
    }

    pub(crate) fn enabled(&self) -> bool {
        self.header_enabled()
    }

    pub(crate) fn header_enabled(&self) -> bool {
        match self {
            DecodeLevel::Nothing => false,
            DecodeLevel::Header => true,
            DecodeLevel::Payload => true,
        }
    }

    pub(crate) fn payload_enabled(&self) -> bool {
        match self {
            DecodeLevel::Nothing => false,
            DecodeLevel::Header => false,
            DecodeLevel::Payload => true,
        }
    }
}

impl std::str::FromStr for DecodeLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nothing" => Ok(DecodeLevel::Nothing),
            "header" => Ok(DecodeLevel::Header),
            "payload" => Ok(DecodeLevel::Payload),
            _ => Err(format!(
                "unknown decode level '{s}', expected one of: nothing, header, payload"
            )),
        }
    }
}
