use crate::exception::ExceptionCode;

/// Errors that occur while encoding or decoding a Modbus TCP frame
#[derive(thiserror::Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Buffer is too short to contain the MBAP header
    #[error("buffer of {0} bytes is too short to contain the MBAP header")]
    TooShortForHeader(usize),
    /// The length field doesn't cover the unit identifier and the function code
    #[error("MBAP length field ({0}) is smaller than the unit id and function code")]
    LengthTooSmall(u16),
    /// The length field would produce a frame larger than the maximum frame size
    #[error("MBAP length field ({0}) exceeds the maximum frame size")]
    LengthTooBig(u16),
    /// The buffer holds fewer payload bytes than the length field declares
    #[error("frame declares {expected} payload bytes but only {actual} are present")]
    TruncatedPayload {
        /// payload size announced by the header
        expected: usize,
        /// payload bytes actually present
        actual: usize,
    },
    /// A payload accessor attempted to read beyond the end of the payload
    #[error("attempted to read {requested} bytes with only {remaining} remaining")]
    InsufficientBytes {
        /// requested number of bytes
        requested: usize,
        /// bytes left in the payload
        remaining: usize,
    },
    /// A payload append would exceed the maximum frame size
    #[error("attempted to write {requested} bytes with only {remaining} remaining")]
    InsufficientSpace {
        /// requested number of bytes
        requested: usize,
        /// space left in the frame
        remaining: usize,
    },
    /// The byte count in a bit response doesn't match the requested bit count
    #[error("byte count ({actual}) doesn't match what is expected based on request ({expected})")]
    ByteCountMismatch {
        /// byte count derived from the request
        expected: usize,
        /// byte count found in the response
        actual: usize,
    },
}

/// Errors raised while validating a response against the outstanding request
#[derive(thiserror::Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The response carries a different transaction identifier than the request
    #[error("transaction id of the response ({response:#06X}) differs from the request ({request:#06X})")]
    TxIdMismatch {
        /// id sent in the request
        request: u16,
        /// id found in the response
        response: u16,
    },
    /// The response function code is neither the request's nor its exception variant
    #[error("unexpected function code {actual:#04X} in response to {expected:#04X}")]
    UnexpectedFunction {
        /// function code of the request
        expected: u8,
        /// function code of the response
        actual: u8,
    },
    /// The protocol identifier of the response is not zero
    #[error("protocol id should be zero but was {0:#06X}")]
    NonZeroProtocolId(u16),
}

/// Errors that result from bad request parameters
#[derive(thiserror::Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum InvalidRequest {
    /// Request contains a count of zero
    #[error("request contains a count of zero")]
    CountOfZero,
    /// The count exceeds the maximum allowed for the function
    #[error("the request count of {0} exceeds maximum allowed count of {1}")]
    CountTooBig(u16, u16),
    /// start and count would overflow the u16 address space
    #[error("start == {0} and count == {1} would overflow the representation of u16")]
    AddressOverflow(u16, u16),
    /// Port number is outside of the ports exposed by the gateway
    #[error("port {0} is out of range")]
    PortOutOfRange(usize),
}

/// All the errors a request to a port service may fail with
#[derive(thiserror::Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// An I/O error occurred on the device connection
    #[error("i/o error: {0}")]
    Io(std::io::ErrorKind),
    /// `connect` was called while a connection is open
    #[error("already connected, close the connection first")]
    AlreadyConnected,
    /// No connection to the device exists
    #[error("no connection exists to the Modbus device")]
    NoConnection,
    /// The device didn't answer before the configured response timeout
    #[error("timeout occurred before receiving a response from the device")]
    ResponseTimeout,
    /// The port service was closed
    #[error("the port service was closed")]
    Closed,
    /// Malformed frame
    #[error("bad frame: {0}")]
    BadFrame(#[from] FrameError),
    /// Response failed validation
    #[error("Modbus header: {0}")]
    Protocol(#[from] ProtocolError),
    /// Bad request parameters
    #[error("bad request: {0}")]
    BadRequest(#[from] InvalidRequest),
    /// The device answered with an exception response
    #[error("Modbus protocol error: {function:#04X}:{:#04X}: {exception}", raw_code(.exception))]
    Exception {
        /// function code of the exception response (request function + 0x80)
        function: u8,
        /// exception reported by the device
        exception: ExceptionCode,
    },
}

fn raw_code(ex: &ExceptionCode) -> u8 {
    u8::from(*ex)
}

impl From<std::io::Error> for RequestError {
    fn from(err: std::io::Error) -> Self {
        RequestError::Io(err.kind())
    }
}

impl From<tokio::time::error::Elapsed> for RequestError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        RequestError::ResponseTimeout
    }
}

/// Errors that fail a single gateway request
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The request line doesn't match any known request
    #[error("no such request: {0}")]
    NoSuchRequest(String),
    /// The port number of an output access request is not a decimal integer
    #[error("bad port number in request: {0}")]
    BadPort(String),
    /// The request bytes aren't valid text
    #[error("request is not valid UTF-8")]
    NotText,
    /// The request exceeded the maximum length before its terminator
    #[error("request exceeds {0} bytes without a terminator")]
    RequestTooLong(usize),
    /// An I/O error occurred on the connection of the text client
    #[error("i/o error on client connection: {0}")]
    Io(std::io::ErrorKind),
    /// The port service failed
    #[error("port service failure: {0}")]
    Device(#[from] RequestError),
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        GatewayError::Io(err.kind())
    }
}
