use crate::constants::exceptions;

/// Exception codes a device may return in a `function + 0x80` response
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Ord, Eq)]
pub enum ExceptionCode {
    /// The function code received in the query is not an allowable action for the device
    IllegalFunction,
    /// The data address received in the query is not an allowable address for the device
    IllegalDataAddress,
    /// A value contained in the request is not an allowable value for the device
    IllegalDataValue,
    /// An unrecoverable error occurred while the device was attempting to perform the action
    SlaveDeviceFailure,
    /// The device has accepted the request and is processing it
    Acknowledge,
    /// The device is engaged in processing a long-duration command, try again later
    SlaveDeviceBusy,
    /// The device attempted to read a record file, but detected a parity error in the memory
    MemoryParityError,
    /// A gateway was unable to allocate an internal communication path for the request
    GatewayPathUnavailable,
    /// A gateway did not obtain a response from the target device
    GatewayTargetDeviceFailedToRespond,
    /// The exception code received is not defined in the standard
    Unknown(u8),
}

impl From<u8> for ExceptionCode {
    fn from(value: u8) -> Self {
        match value {
            exceptions::ILLEGAL_FUNCTION => ExceptionCode::IllegalFunction,
            exceptions::ILLEGAL_DATA_ADDRESS => ExceptionCode::IllegalDataAddress,
            exceptions::ILLEGAL_DATA_VALUE => ExceptionCode::IllegalDataValue,
            exceptions::SERVER_DEVICE_FAILURE => ExceptionCode::SlaveDeviceFailure,
            exceptions::ACKNOWLEDGE => ExceptionCode::Acknowledge,
            exceptions::SERVER_DEVICE_BUSY => ExceptionCode::SlaveDeviceBusy,
            exceptions::MEMORY_PARITY_ERROR => ExceptionCode::MemoryParityError,
            exceptions::GATEWAY_PATH_UNAVAILABLE => ExceptionCode::GatewayPathUnavailable,
            exceptions::GATEWAY_TARGET_DEVICE_FAILED_TO_RESPOND => {
                ExceptionCode::GatewayTargetDeviceFailedToRespond
            }
            _ => ExceptionCode::Unknown(value),
        }
    }
}

impl From<ExceptionCode> for u8 {
    fn from(ex: ExceptionCode) -> Self {
        match ex {
            ExceptionCode::IllegalFunction => exceptions::ILLEGAL_FUNCTION,
            ExceptionCode::IllegalDataAddress => exceptions::ILLEGAL_DATA_ADDRESS,
            ExceptionCode::IllegalDataValue => exceptions::ILLEGAL_DATA_VALUE,
            ExceptionCode::SlaveDeviceFailure => exceptions::SERVER_DEVICE_FAILURE,
            ExceptionCode::Acknowledge => exceptions::ACKNOWLEDGE,
            ExceptionCode::SlaveDeviceBusy => exceptions::SERVER_DEVICE_BUSY,
            ExceptionCode::MemoryParityError => exceptions::MEMORY_PARITY_ERROR,
            ExceptionCode::GatewayPathUnavailable => exceptions::GATEWAY_PATH_UNAVAILABLE,
            ExceptionCode::GatewayTargetDeviceFailedToRespond => {
                exceptions::GATEWAY_TARGET_DEVICE_FAILED_TO_RESPOND
            }
            ExceptionCode::Unknown(value) => value,
        }
    }
}

impl std::error::Error for ExceptionCode {}

impl std::fmt::Display for ExceptionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        match self {
            ExceptionCode::IllegalFunction => f.write_str("illegal function"),
            ExceptionCode::IllegalDataAddress => f.write_str("illegal data address"),
            ExceptionCode::IllegalDataValue => f.write_str("illegal data value"),
            ExceptionCode::SlaveDeviceFailure => f.write_str("slave device failure"),
            ExceptionCode::Acknowledge => f.write_str("acknowledge"),
            ExceptionCode::SlaveDeviceBusy => f.write_str("slave device busy"),
            ExceptionCode::MemoryParityError => f.write_str("memory parity error"),
            ExceptionCode::GatewayPathUnavailable => f.write_str("gateway path unavailable"),
            ExceptionCode::GatewayTargetDeviceFailedToRespond => {
                f.write_str("gateway target device failed to respond")
            }
            ExceptionCode::Unknown(code) => write!(f, "unknown exception code: {code:#04X}"),
        }
    }
}
