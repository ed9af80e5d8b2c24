//! End-to-end tests of the client and the gateway against a scripted Modbus device over loopback

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use wutbus::constants::{coil, function, mbap};
use wutbus::*;

/// Image of the mock device and what it has seen
#[derive(Default)]
struct DeviceState {
    coils: u16,
    discrete_inputs: u16,
    exception: Option<u8>,
    tx_id_offset: u16,
    tx_ids: Vec<u16>,
    /// delay applied to the next reply only
    reply_delay: Option<Duration>,
    /// close the connection instead of answering the next request
    hang_up: bool,
}

impl DeviceState {
    fn respond(&mut self, request: &Frame) -> Frame {
        self.tx_ids.push(request.transaction_id);

        let mut response = match self.exception {
            Some(code) => {
                let mut frame = Frame::new(request.function_code | mbap::ERROR_BIT);
                frame.append_u8(code).unwrap();
                frame
            }
            None => self.process(request),
        };

        response.transaction_id = request.transaction_id.wrapping_add(self.tx_id_offset);
        response.unit_id = request.unit_id;
        response
    }

    fn process(&mut self, request: &Frame) -> Frame {
        let mut cursor = request.payload_cursor();
        let mut response = Frame::new(request.function_code);
        match request.function_code {
            function::READ_COILS | function::READ_DISCRETE_INPUTS => {
                let start = cursor.read_u16_be().unwrap();
                let count = cursor.read_u16_be().unwrap();
                let image = if request.function_code == function::READ_COILS {
                    self.coils
                } else {
                    self.discrete_inputs
                };
                let bytes = pack(image, start, count);
                response.append_u8(bytes.len() as u8).unwrap();
                response.append_bytes(&bytes).unwrap();
            }
            function::WRITE_SINGLE_COIL => {
                let address = cursor.read_u16_be().unwrap();
                let value = cursor.read_u16_be().unwrap();
                assert!(value == coil::ON || value == coil::OFF);
                if address < 16 {
                    let bit = 1 << address;
                    if value == coil::ON {
                        self.coils |= bit;
                    } else {
                        self.coils &= !bit;
                    }
                }
                response.append_bytes(request.payload()).unwrap();
            }
            other => panic!("unexpected function code: {other}"),
        }
        response
    }
}

fn pack(image: u16, start: u16, count: u16) -> Vec<u8> {
    let mut bytes = vec![0u8; (count as usize).div_ceil(8)];
    for i in 0..count as usize {
        let address = start as usize + i;
        if address < 16 && image & (1 << address) != 0 {
            bytes[i / 8] |= 1 << (i % 8);
        }
    }
    bytes
}

struct MockDevice {
    addr: SocketAddr,
    state: Arc<Mutex<DeviceState>>,
}

impl MockDevice {
    async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(Mutex::new(DeviceState::default()));

        let device_state = state.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(serve_connection(socket, device_state.clone()));
            }
        });

        Self { addr, state }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap()
    }

    async fn client(&self) -> ModbusClient {
        let client = ModbusClient::new(DecodeLevel::Payload);
        client
            .connect(&self.addr.ip().to_string(), self.addr.port())
            .await
            .unwrap();
        client
    }
}

async fn serve_connection(mut socket: TcpStream, state: Arc<Mutex<DeviceState>>) {
    let mut header = [0u8; mbap::HEADER_LENGTH];
    while socket.read_exact(&mut header).await.is_ok() {
        let length = Frame::payload_length(&header).unwrap();
        let mut bytes = header.to_vec();
        bytes.resize(mbap::HEADER_LENGTH + length, 0);
        socket
            .read_exact(&mut bytes[mbap::HEADER_LENGTH..])
            .await
            .unwrap();

        let request = Frame::decode(&bytes).unwrap();
        let (response, delay) = {
            let mut state = state.lock().unwrap();
            if std::mem::take(&mut state.hang_up) {
                return;
            }
            (state.respond(&request), state.reply_delay.take())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if socket.write_all(&response.encode().unwrap()).await.is_err() {
            return;
        }
    }
}

/// Send one gateway request and collect the reply, `None` if the gateway closed without one
async fn gateway_request(addr: SocketAddr, request: &str) -> Option<String> {
    let mut socket = TcpStream::connect(addr).await.unwrap();
    socket.write_all(request.as_bytes()).await.unwrap();
    socket.write_u8(0).await.unwrap();

    let mut reply = Vec::new();
    socket.read_to_end(&mut reply).await.unwrap();
    if reply.is_empty() {
        return None;
    }

    assert_eq!(reply.pop(), Some(0), "reply must be zero terminated");
    Some(String::from_utf8(reply).unwrap())
}

async fn modbus_gateway(device: &MockDevice) -> ServerHandle {
    let service = Arc::new(ModbusDevice::new(device.client().await));
    spawn_gateway_server("127.0.0.1:0".parse().unwrap(), Adapter::new(service))
        .await
        .unwrap()
}

#[tokio::test]
async fn client_reads_and_writes_bits() {
    let device = MockDevice::spawn().await;
    device.state().discrete_inputs = 0x8003;
    device.state().coils = 0x0100;

    let client = device.client().await;
    assert!(client.is_connected().await);

    let inputs = client.read_discrete_inputs(0, 16).await.unwrap();
    assert_eq!(inputs.len(), 16);
    assert_eq!(
        PortMask::from_values(&inputs.try_into().unwrap()),
        PortMask::new(0x8003)
    );

    assert!(client.read_output(8).await.unwrap());
    assert!(!client.read_output(7).await.unwrap());
    assert!(client.read_input(15).await.unwrap());

    client.write_single_coil(2, true).await.unwrap();
    assert_eq!(device.state().coils, 0x0104);
    client.write_single_coil(8, false).await.unwrap();
    assert_eq!(device.state().coils, 0x0004);

    client.disconnect().await;
    assert!(!client.is_connected().await);
    assert_eq!(
        client.read_coils(0, 16).await,
        Err(RequestError::NoConnection)
    );
}

#[tokio::test]
async fn connecting_twice_is_rejected() {
    let device = MockDevice::spawn().await;
    let client = device.client().await;
    assert_eq!(
        client
            .connect(&device.addr.ip().to_string(), device.addr.port())
            .await,
        Err(RequestError::AlreadyConnected)
    );
}

#[tokio::test]
async fn device_exception_is_reported_with_its_reason() {
    let device = MockDevice::spawn().await;
    device.state().exception = Some(0x02);

    let client = device.client().await;
    let err = client.read_coils(0, 16).await.unwrap_err();
    assert_eq!(
        err,
        RequestError::Exception {
            function: 0x81,
            exception: ExceptionCode::IllegalDataAddress
        }
    );
    assert!(err.to_string().contains("illegal data address"));
}

#[tokio::test]
async fn mismatched_transaction_id_is_rejected() {
    let device = MockDevice::spawn().await;
    device.state().tx_id_offset = 1;

    let client = device.client().await;
    assert!(matches!(
        client.read_discrete_inputs(0, 16).await,
        Err(RequestError::Protocol(ProtocolError::TxIdMismatch { .. }))
    ));
}

#[tokio::test]
async fn late_response_closes_the_connection() {
    let device = MockDevice::spawn().await;
    device.state().coils = 0x0005;
    device.state().reply_delay = Some(Duration::from_millis(200));

    let client = ModbusClient::new(DecodeLevel::Header)
        .with_response_timeout(Some(Duration::from_millis(50)));
    let host = device.addr.ip().to_string();
    client.connect(&host, device.addr.port()).await.unwrap();

    assert_eq!(
        client.read_coils(0, 16).await,
        Err(RequestError::ResponseTimeout)
    );
    assert!(!client.is_connected().await);
    assert_eq!(
        client.read_coils(0, 16).await,
        Err(RequestError::NoConnection)
    );

    // a fresh connection is in sync again
    client.connect(&host, device.addr.port()).await.unwrap();
    let coils = client.read_coils(0, 16).await.unwrap();
    assert_eq!(
        PortMask::from_values(&coils.try_into().unwrap()),
        PortMask::new(0x0005)
    );
}

#[tokio::test]
async fn response_within_the_timeout_keeps_the_connection() {
    let device = MockDevice::spawn().await;
    device.state().reply_delay = Some(Duration::from_millis(10));

    let client = ModbusClient::new(DecodeLevel::Nothing)
        .with_response_timeout(Some(Duration::from_secs(5)));
    client
        .connect(&device.addr.ip().to_string(), device.addr.port())
        .await
        .unwrap();

    client.read_discrete_inputs(0, 16).await.unwrap();
    client.read_discrete_inputs(0, 16).await.unwrap();
    assert!(client.is_connected().await);
}

#[tokio::test]
async fn connection_lost_mid_transaction_is_closed() {
    let device = MockDevice::spawn().await;
    device.state().hang_up = true;

    let client = device.client().await;
    assert!(matches!(
        client.read_discrete_inputs(0, 16).await,
        Err(RequestError::Io(_))
    ));
    assert!(!client.is_connected().await);
    assert_eq!(
        client.write_single_coil(0, true).await,
        Err(RequestError::NoConnection)
    );
}

#[tokio::test]
async fn protocol_errors_keep_the_connection() {
    let device = MockDevice::spawn().await;
    device.state().exception = Some(0x02);

    let client = device.client().await;
    assert!(client.read_coils(0, 16).await.is_err());
    assert!(client.is_connected().await);

    device.state().exception = None;
    assert!(client.read_coils(0, 16).await.is_ok());
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_requests_get_distinct_transaction_ids() {
    let device = MockDevice::spawn().await;
    device.state().discrete_inputs = 0x00F0;

    let client = Arc::new(device.client().await);
    let tasks: Vec<_> = (0..32)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move { client.read_discrete_inputs(0, 16).await })
        })
        .collect();

    for task in tasks {
        let inputs = task.await.unwrap().unwrap();
        assert_eq!(
            PortMask::from_values(&inputs.try_into().unwrap()),
            PortMask::new(0x00F0)
        );
    }

    let tx_ids = device.state().tx_ids.clone();
    assert_eq!(tx_ids.len(), 32);
    assert!(!tx_ids.contains(&0));
    assert_eq!(tx_ids.iter().collect::<HashSet<_>>().len(), 32);
}

#[tokio::test]
async fn gateway_reports_device_inputs() {
    let device = MockDevice::spawn().await;
    let gateway = modbus_gateway(&device).await;
    let addr = gateway.local_addr();

    device.state().discrete_inputs = 0x0001;
    assert_eq!(
        gateway_request(addr, "GET /input?").await.as_deref(),
        Some("input=0001")
    );
    device.state().discrete_inputs = 0x0003;
    assert_eq!(
        gateway_request(addr, "GET /input?").await.as_deref(),
        Some("input=0003")
    );
    device.state().discrete_inputs = 0x8003;
    assert_eq!(
        gateway_request(addr, "GET /input?").await.as_deref(),
        Some("input=8003")
    );
}

#[tokio::test]
async fn gateway_switches_device_outputs() {
    let device = MockDevice::spawn().await;
    let gateway = modbus_gateway(&device).await;
    let addr = gateway.local_addr();

    assert_eq!(
        gateway_request(addr, "GET /output?").await.as_deref(),
        Some("output=0000")
    );

    assert_eq!(gateway_request(addr, "GET /outputaccess0?State=ON").await, None);
    assert_eq!(
        gateway_request(addr, "GET /output?").await.as_deref(),
        Some("output=0001")
    );

    assert_eq!(gateway_request(addr, "GET /outputaccess15?State=ON").await, None);
    assert_eq!(
        gateway_request(addr, "GET /output?").await.as_deref(),
        Some("output=8001")
    );

    assert_eq!(gateway_request(addr, "GET /outputaccess0?State=OFF").await, None);
    assert_eq!(
        gateway_request(addr, "GET /output?").await.as_deref(),
        Some("output=8000")
    );

    // no state token, nothing changes
    assert_eq!(gateway_request(addr, "GET /outputaccess1?").await, None);
    assert_eq!(device.state().coils, 0x8000);
}

#[tokio::test]
async fn gateway_closes_silently_on_device_exception() {
    let device = MockDevice::spawn().await;
    let gateway = modbus_gateway(&device).await;
    device.state().exception = Some(0x04);

    assert_eq!(gateway_request(gateway.local_addr(), "GET /input?").await, None);
}

#[tokio::test]
async fn gateway_closes_without_reply_on_unknown_request() {
    let device = Arc::new(VirtualDevice::new());
    let gateway = spawn_gateway_server("127.0.0.1:0".parse().unwrap(), Adapter::new(device))
        .await
        .unwrap();

    assert_eq!(gateway_request(gateway.local_addr(), "GET /status?").await, None);
    assert_eq!(
        gateway_request(gateway.local_addr(), "GET /outputaccessX?State=ON").await,
        None
    );
}

#[tokio::test]
async fn gateway_ignores_request_cut_short_by_end_of_stream() {
    let device = Arc::new(VirtualDevice::new());
    let gateway = spawn_gateway_server(
        "127.0.0.1:0".parse().unwrap(),
        Adapter::new(device.clone()),
    )
    .await
    .unwrap();

    let mut socket = TcpStream::connect(gateway.local_addr()).await.unwrap();
    socket
        .write_all(b"GET /outputaccess3?State=ON")
        .await
        .unwrap();
    socket.shutdown().await.unwrap();

    let mut reply = Vec::new();
    socket.read_to_end(&mut reply).await.unwrap();
    assert!(reply.is_empty());
    assert_eq!(device.outputs(), PortMask::new(0));
}

#[tokio::test]
async fn gateway_serves_virtual_device() {
    let device = Arc::new(VirtualDevice::new());
    let gateway = spawn_gateway_server(
        "127.0.0.1:0".parse().unwrap(),
        Adapter::new(device.clone()),
    )
    .await
    .unwrap();
    let addr = gateway.local_addr();

    device.set_inputs(PortMask::new(0xA5A5));
    assert_eq!(
        gateway_request(addr, "GET /input?").await.as_deref(),
        Some("input=A5A5")
    );

    assert_eq!(gateway_request(addr, "GET /outputaccess7?State=ON").await, None);
    assert_eq!(device.outputs(), PortMask::new(0x0080));
    assert_eq!(
        gateway_request(addr, "GET /output?").await.as_deref(),
        Some("output=0080")
    );
}

#[tokio::test]
async fn dropping_the_handle_stops_accepting() {
    let device = Arc::new(VirtualDevice::new());
    let gateway = spawn_gateway_server("127.0.0.1:0".parse().unwrap(), Adapter::new(device))
        .await
        .unwrap();
    let addr = gateway.local_addr();
    drop(gateway);

    // the listener is closed once the server task observes the shutdown
    let mut refused = false;
    for _ in 0..50 {
        if TcpStream::connect(addr).await.is_err() {
            refused = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert!(refused);
}
