use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpSocket, TcpStream};

use crate::common::bits::parse_packed_bits;
use crate::common::frame::{Frame, TxId};
use crate::common::function::FunctionCode;
use crate::constants::{coil, mbap};
use crate::decode::DecodeLevel;
use crate::error::RequestError;
use crate::types::AddressRange;

mod transaction;

struct ClientState {
    io: Option<TcpStream>,
    tx_id: TxId,
    buffer: [u8; mbap::MAX_FRAME_LENGTH],
}

/// Modbus TCP client that owns one connection to a device
///
/// All transactions are serialized: the lock around the connection is held from the
/// allocation of the transaction id until the response has been validated, so concurrent
/// callers queue up instead of interleaving on the wire.
///
/// The connection is never re-established automatically. After an I/O error the
/// caller decides whether to [`disconnect`](Self::disconnect) and [`connect`](Self::connect) again.
pub struct ModbusClient {
    state: tokio::sync::Mutex<ClientState>,
    decode: DecodeLevel,
    response_timeout: Option<Duration>,
}

impl std::fmt::Debug for ModbusClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModbusClient")
            .field("decode", &self.decode)
            .field("response_timeout", &self.response_timeout)
            .finish_non_exhaustive()
    }
}

impl Default for ModbusClient {
    fn default() -> Self {
        Self::new(DecodeLevel::nothing())
    }
}

impl ModbusClient {
    /// Create a disconnected client
    ///
    /// * `decode` - Decode log level applied to every frame
    pub fn new(decode: DecodeLevel) -> Self {
        Self {
            state: tokio::sync::Mutex::new(ClientState {
                io: None,
                tx_id: TxId::default(),
                buffer: [0; mbap::MAX_FRAME_LENGTH],
            }),
            decode,
            response_timeout: None,
        }
    }

    /// Bound the time a transaction may wait for its response. By default it waits forever.
    pub fn with_response_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Open a connection to the device at `host:port`
    ///
    /// Fails with [`RequestError::AlreadyConnected`] if a connection is already open.
    pub async fn connect(&self, host: &str, port: u16) -> Result<(), RequestError> {
        let mut state = self.state.lock().await;
        if state.io.is_some() {
            return Err(RequestError::AlreadyConnected);
        }

        let mut last_err = std::io::Error::from(std::io::ErrorKind::AddrNotAvailable);
        for addr in tokio::net::lookup_host((host, port)).await? {
            match Self::open(addr).await {
                Ok(stream) => {
                    tracing::info!("connected to Modbus device at {}", addr);
                    state.io = Some(stream);
                    return Ok(());
                }
                Err(err) => {
                    tracing::warn!("unable to connect to {}: {}", addr, err);
                    last_err = err;
                }
            }
        }

        Err(last_err.into())
    }

    async fn open(addr: std::net::SocketAddr) -> std::io::Result<TcpStream> {
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        // keep-alive detects dead connections while the client sits idle
        socket.set_keepalive(true)?;
        socket.set_recv_buffer_size(mbap::RECEIVE_BUFFER_SIZE)?;
        let stream = socket.connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }

    /// Close the connection. Does nothing if the client isn't connected.
    pub async fn disconnect(&self) {
        let mut state = self.state.lock().await;
        if let Some(mut io) = state.io.take() {
            if let Err(err) = io.shutdown().await {
                tracing::debug!("error shutting down device connection: {}", err);
            }
            tracing::info!("disconnected from Modbus device");
        }
    }

    /// True if a connection is open
    pub async fn is_connected(&self) -> bool {
        self.state.lock().await.io.is_some()
    }

    /// Read `count` coils (outputs) beginning at `start` (function 0x01)
    pub async fn read_coils(&self, start: u16, count: u16) -> Result<Vec<bool>, RequestError> {
        self.read_bits(FunctionCode::ReadCoils, start, count).await
    }

    /// Read `count` discrete inputs beginning at `start` (function 0x02)
    pub async fn read_discrete_inputs(
        &self,
        start: u16,
        count: u16,
    ) -> Result<Vec<bool>, RequestError> {
        self.read_bits(FunctionCode::ReadDiscreteInputs, start, count)
            .await
    }

    /// Read the single coil at `index`
    pub async fn read_output(&self, index: u16) -> Result<bool, RequestError> {
        let values = self.read_coils(index, 1).await?;
        Ok(values.first().copied().unwrap_or_default())
    }

    /// Read the single discrete input at `index`
    pub async fn read_input(&self, index: u16) -> Result<bool, RequestError> {
        let values = self.read_discrete_inputs(index, 1).await?;
        Ok(values.first().copied().unwrap_or_default())
    }

    /// Turn the coil at `address` on or off (function 0x05)
    pub async fn write_single_coil(&self, address: u16, value: bool) -> Result<(), RequestError> {
        let mut request = Frame::new(FunctionCode::WriteSingleCoil.get_value());
        request.append_u16(address)?;
        request.append_u16(if value { coil::ON } else { coil::OFF })?;

        self.transaction(request).await?;
        Ok(())
    }

    async fn read_bits(
        &self,
        function: FunctionCode,
        start: u16,
        count: u16,
    ) -> Result<Vec<bool>, RequestError> {
        let range = AddressRange::try_from(start, count)?;

        let mut request = Frame::new(function.get_value());
        range.serialize(&mut request)?;

        tracing::debug!("{} {}", function, range);

        let response = self.transaction(request).await?;
        Ok(parse_packed_bits(
            &mut response.payload_cursor(),
            range.count,
        )?)
    }

    async fn transaction(&self, mut request: Frame) -> Result<Frame, RequestError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let io = state.io.as_mut().ok_or(RequestError::NoConnection)?;
        let tx_id = state.tx_id.next();

        let exchange =
            transaction::exchange(io, &mut state.buffer, tx_id, &mut request, self.decode);

        let result = match self.response_timeout {
            None => exchange.await,
            Some(timeout) => tokio::time::timeout(timeout, exchange)
                .await
                .unwrap_or_else(|elapsed| Err(elapsed.into())),
        };

        if let Err(err) = &result {
            if loses_frame_sync(err) {
                tracing::warn!("closing device connection after: {}", err);
                state.io = None;
            }
        }

        result
    }
}

/// True if the stream may still hold bytes of the failed transaction, so the
/// next response can't be matched to its request
fn loses_frame_sync(err: &RequestError) -> bool {
    matches!(
        err,
        RequestError::Io(_) | RequestError::ResponseTimeout | RequestError::BadFrame(_)
    )
}
