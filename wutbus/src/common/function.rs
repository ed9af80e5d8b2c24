use std::fmt::{Display, Formatter};

use crate::constants::function;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum FunctionCode {
    ReadCoils = function::READ_COILS,
    ReadDiscreteInputs = function::READ_DISCRETE_INPUTS,
    WriteSingleCoil = function::WRITE_SINGLE_COIL,
}

impl FunctionCode {
    pub(crate) const fn get_value(self) -> u8 {
        self as u8
    }
}

impl Display for FunctionCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self {
            FunctionCode::ReadCoils => write!(f, "READ COILS ({:#04X})", self.get_value()),
            FunctionCode::ReadDiscreteInputs => {
                write!(f, "READ DISCRETE INPUTS ({:#04X})", self.get_value())
            }
            FunctionCode::WriteSingleCoil => {
                write!(f, "WRITE SINGLE COIL ({:#04X})", self.get_value())
            }
        }
    }
}
