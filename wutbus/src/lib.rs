//! A gateway that exposes the inputs and outputs of a Modbus TCP I/O device through a
//! small zero-terminated text protocol, using [Tokio](https://docs.rs/tokio) and Rust's
//! `async/await` syntax.
//!
//! # Features
//!
//! * Modbus TCP client for coils and discrete inputs with serialized transactions
//! * Panic-free parsing of MBAP frames
//! * One lightweight task per gateway connection
//! * An in-memory device for running the gateway without hardware
//!
//! # Supported Functions
//!
//! * Read Coils
//! * Read Discrete Inputs
//! * Write Single Coil
//!
//! # Text protocol
//!
//! Every request and reply ends with a zero byte. The connection is closed after one request.
//!
//! ```text
//! GET /input?                          ->  input=HHHH
//! GET /output?                         ->  output=HHHH
//! GET /outputaccess<N>?State=ON|OFF    ->  (no reply)
//! anything else                        ->  connection closed without reply
//! ```
//!
//! `HHHH` holds 4 uppercase hex digits, port 0 is the least significant bit.

mod client;
mod common;
mod decode;
mod device;
mod error;
mod exception;
mod gateway;
mod ports;
mod service;
mod types;
mod virtual_device;

/// Public constant values of the Modbus TCP framing and the text protocol
pub mod constants;

pub use crate::client::ModbusClient;
pub use crate::common::cursor::ReadCursor;
pub use crate::common::frame::{Frame, TxId};
pub use crate::decode::DecodeLevel;
pub use crate::device::ModbusDevice;
pub use crate::error::*;
pub use crate::exception::ExceptionCode;
pub use crate::gateway::adapter::Adapter;
pub use crate::gateway::request::Request;
pub use crate::gateway::server::{spawn_gateway_server, ServerHandle};
pub use crate::ports::{BadPortMask, PortMask, PortValues};
pub use crate::service::PortService;
pub use crate::types::AddressRange;
pub use crate::virtual_device::VirtualDevice;
