use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::Instrument;

use crate::constants::gateway::{ACCEPT_RETRY_DELAY, MAX_REQUEST_LENGTH, TERMINATOR};
use crate::error::GatewayError;
use crate::gateway::adapter::Adapter;
use crate::service::PortService;

/// Keeps the gateway listening. Dropping it stops accepting connections,
/// connections already accepted run to completion.
#[derive(Debug)]
pub struct ServerHandle {
    _tx: tokio::sync::mpsc::Sender<()>,
    local_addr: SocketAddr,
}

impl ServerHandle {
    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

/// Spawns the gateway listener onto the runtime. This method can only
/// be called from within the runtime context.
///
/// Every accepted connection gets its own task that reads a single request,
/// writes the reply (if any) and closes the connection.
///
/// * `addr` - A socket address to bind to, port 0 picks a free port
/// * `adapter` - Adapter shared by all connections
pub async fn spawn_gateway_server<S: PortService>(
    addr: SocketAddr,
    adapter: Adapter<S>,
) -> Result<ServerHandle, std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;

    let (tx, rx) = tokio::sync::mpsc::channel(1);
    tokio::spawn(
        run_server(listener, adapter, rx)
            .instrument(tracing::info_span!("Gateway", "listen" = ?local_addr)),
    );

    Ok(ServerHandle {
        _tx: tx,
        local_addr,
    })
}

/// Source of accepted connections
pub(crate) trait Acceptor: Send + 'static {
    type Io: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    fn accept(&mut self) -> impl Future<Output = std::io::Result<(Self::Io, SocketAddr)>> + Send;
}

impl Acceptor for TcpListener {
    type Io = TcpStream;

    async fn accept(&mut self) -> std::io::Result<(TcpStream, SocketAddr)> {
        TcpListener::accept(self).await
    }
}

async fn run_server<A: Acceptor, S: PortService>(
    mut listener: A,
    adapter: Adapter<S>,
    mut shutdown: tokio::sync::mpsc::Receiver<()>,
) {
    tracing::info!("accepting connections");
    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("server shutdown");
                return;
            }
            result = listener.accept() => {
                match result {
                    Err(err) => {
                        // typically out of file descriptors, which frees up as sessions close
                        tracing::error!("error accepting connection: {}", err);
                        tokio::time::sleep(Duration::from_millis(ACCEPT_RETRY_DELAY)).await;
                    }
                    Ok((socket, addr)) => spawn_session(socket, addr, adapter.clone()),
                }
            }
        }
    }
}

fn spawn_session<T, S>(socket: T, addr: SocketAddr, adapter: Adapter<S>)
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    S: PortService,
{
    tokio::spawn(
        async move {
            tracing::info!("accepted connection");
            if let Err(err) = run_session(socket, &adapter).await {
                tracing::warn!("closing connection: {}", err);
            }
            tracing::info!("connection closed");
        }
        .instrument(tracing::info_span!("Session", "remote" = ?addr)),
    );
}

/// Serve one request on `io`, then shut it down
pub(crate) async fn run_session<T, S>(
    mut io: T,
    adapter: &Adapter<S>,
) -> Result<(), GatewayError>
where
    T: AsyncRead + AsyncWrite + Unpin,
    S: PortService,
{
    let Some(request) = read_request(&mut io).await? else {
        tracing::debug!("end of stream before a complete request");
        return Ok(());
    };

    if let Some(reply) = adapter.handle(&request).await? {
        let mut bytes = reply.into_bytes();
        bytes.push(TERMINATOR);
        io.write_all(&bytes).await?;
    }

    io.shutdown().await?;
    Ok(())
}

/// Read the bytes before the first terminator
///
/// Returns `None` if the stream ends before a terminator arrives.
pub(crate) async fn read_request<T>(io: &mut T) -> Result<Option<String>, GatewayError>
where
    T: AsyncRead + Unpin,
{
    let limit = MAX_REQUEST_LENGTH + 1;
    let mut reader = BufReader::new(io.take(limit as u64));
    let mut bytes = Vec::new();

    reader.read_until(TERMINATOR, &mut bytes).await?;

    if bytes.last() != Some(&TERMINATOR) {
        if bytes.len() >= limit {
            return Err(GatewayError::RequestTooLong(MAX_REQUEST_LENGTH));
        }
        return Ok(None);
    }

    bytes.pop();
    String::from_utf8(bytes)
        .map(Some)
        .map_err(|_| GatewayError::NotText)
}
