//! Gateway process serving the text I/O protocol
//!
//! Requests are forwarded either to a Modbus TCP device or to an in-memory
//! device whose inputs are set from the console.

use std::net::{IpAddr, SocketAddr};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use wutbus::constants::mbap;
use wutbus::*;

mod console;

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error("unable to connect to the Modbus device: {0}")]
    Connect(RequestError),
    #[error("unable to start the gateway: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Parser)]
#[command(name = "wutbus-server")]
#[command(about = "Converts text I/O requests into Modbus TCP requests")]
#[command(version)]
struct Cli {
    #[arg(long, default_value = "0.0.0.0", help = "address the gateway listens on")]
    listen: IpAddr,

    #[arg(short = 'p', long, default_value_t = 80, help = "port the gateway listens on")]
    port: u16,

    #[arg(long, default_value = "info", help = "maximum level of log messages")]
    log_level: tracing::Level,

    #[command(subcommand)]
    backend: Backend,
}

#[derive(Subcommand)]
enum Backend {
    #[command(about = "forward requests to a Modbus TCP device")]
    Modbus(ModbusArgs),

    #[command(about = "serve an in-memory device driven from the console")]
    Virtual,
}

#[derive(Args)]
struct ModbusArgs {
    #[arg(long, help = "host name or address of the Modbus device")]
    host: String,

    #[arg(long, default_value_t = mbap::DEFAULT_PORT, help = "port of the Modbus device")]
    modbus_port: u16,

    #[arg(long, default_value = "nothing", help = "frame logging: nothing, header or payload")]
    decode: DecodeLevel,

    #[arg(long, help = "optional response timeout in milliseconds")]
    timeout_ms: Option<u64>,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Error> {
    let addr = SocketAddr::new(cli.listen, cli.port);

    match cli.backend {
        Backend::Modbus(args) => {
            let client = ModbusClient::new(args.decode)
                .with_response_timeout(args.timeout_ms.map(Duration::from_millis));
            client
                .connect(&args.host, args.modbus_port)
                .await
                .map_err(Error::Connect)?;
            serve(addr, Arc::new(ModbusDevice::new(client))).await
        }
        Backend::Virtual => {
            let device = Arc::new(VirtualDevice::new());
            let input = tokio::io::BufReader::new(tokio::io::stdin());
            let console = tokio::spawn(console::run(device.clone(), input));
            let result = serve(addr, device).await;
            // stdin reads block, so the console can't observe the close on its own
            console.abort();
            result
        }
    }
}

async fn serve<S: PortService>(addr: SocketAddr, service: Arc<S>) -> Result<(), Error> {
    let result = listen(addr, service.clone()).await;
    service.close().await;
    result
}

async fn listen<S: PortService>(addr: SocketAddr, service: Arc<S>) -> Result<(), Error> {
    let server = spawn_gateway_server(addr, Adapter::new(service)).await?;
    tracing::info!("gateway listening on {}", server.local_addr());

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    Ok(())
}
