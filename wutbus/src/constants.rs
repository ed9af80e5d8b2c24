/// Modbus TCP framing parameters
pub mod mbap {
    /// Default TCP port of a Modbus server
    pub const DEFAULT_PORT: u16 = 502;
    /// Length of the MBAP header including the function code
    pub const HEADER_LENGTH: usize = 8;
    /// Maximum size of a single Modbus TCP frame
    pub const MAX_FRAME_LENGTH: usize = 300;
    /// Maximum number of payload bytes that follow the header
    pub const MAX_PAYLOAD_LENGTH: usize = MAX_FRAME_LENGTH - HEADER_LENGTH;
    /// The protocol identifier field is always zero for Modbus
    pub const PROTOCOL_ID: u16 = 0;
    /// Unit identifier placed in every request. Addressing happens via IP on TCP,
    /// so the field is set to the "not used" sentinel.
    pub const UNIT_ID: u8 = 0xFF;
    /// Bytes counted by the length field that are not payload (unit id + function code)
    pub const LENGTH_OVERHEAD: u16 = 2;
    /// Receive buffer requested from the OS, enough for 3 maximum size frames
    pub const RECEIVE_BUFFER_SIZE: u32 = 3 * MAX_FRAME_LENGTH as u32;
    /// Bit that is set in the function code of an exception response
    pub const ERROR_BIT: u8 = 0x80;
}

/// Raw values of the supported function codes
pub mod function {
    /// Read coils
    pub const READ_COILS: u8 = 0x01;
    /// Read discrete inputs
    pub const READ_DISCRETE_INPUTS: u8 = 0x02;
    /// Write single coil
    pub const WRITE_SINGLE_COIL: u8 = 0x05;
}

/// Encoding of coil values in a write single coil request
pub mod coil {
    /// u16 representation of COIL == ON when performing write single coil
    pub const ON: u16 = 0xFF00;
    /// u16 representation of COIL == OFF when performing write single coil
    pub const OFF: u16 = 0x0000;
}

/// Request limits
pub mod limits {
    /// Maximum count allowed in a read coils/discrete inputs request
    pub const MAX_READ_COILS_COUNT: u16 = 0x07D0;
}

/// Port layout of the gateway
pub mod ports {
    /// Number of inputs and outputs exposed through the text protocol
    pub const PORT_COUNT: usize = 16;
}

/// Text protocol of the gateway
pub mod gateway {
    /// Byte that ends every request and reply
    pub const TERMINATOR: u8 = 0x00;
    /// Longest request accepted before its terminator
    pub const MAX_REQUEST_LENGTH: usize = 1024;
    /// Pause in milliseconds before accepting again after a failed accept
    pub const ACCEPT_RETRY_DELAY: u64 = 100;
    /// Request prefix for reading the inputs
    pub const READ_INPUTS: &str = "GET /input?";
    /// Request prefix for reading the outputs
    pub const READ_OUTPUTS: &str = "GET /output?";
    /// Request prefix for switching one output
    pub const OUTPUT_ACCESS: &str = "GET /outputaccess";
    /// Token selecting the on state of an output access
    pub const STATE_ON: &str = "State=ON";
    /// Token selecting the off state of an output access
    pub const STATE_OFF: &str = "State=OFF";
}

pub(crate) mod exceptions {
    pub(crate) const ILLEGAL_FUNCTION: u8 = 0x01;
    pub(crate) const ILLEGAL_DATA_ADDRESS: u8 = 0x02;
    pub(crate) const ILLEGAL_DATA_VALUE: u8 = 0x03;
    pub(crate) const SERVER_DEVICE_FAILURE: u8 = 0x04;
    pub(crate) const ACKNOWLEDGE: u8 = 0x05;
    pub(crate) const SERVER_DEVICE_BUSY: u8 = 0x06;
    pub(crate) const MEMORY_PARITY_ERROR: u8 = 0x08;
    pub(crate) const GATEWAY_PATH_UNAVAILABLE: u8 = 0x0A;
    pub(crate) const GATEWAY_TARGET_DEVICE_FAILED_TO_RESPOND: u8 = 0x0B;
}
