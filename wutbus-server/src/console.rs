use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use wutbus::constants::ports::PORT_COUNT;
use wutbus::{BadPortMask, PortMask, VirtualDevice};

const HELP: &str = "Interactive Command Interpreter
   inputs=[hex]      - set inputs
   outputs=[hex]     - set outputs
   inputs            - print inputs
   outputs           - print outputs";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Command {
    SetInputs(PortMask),
    SetOutputs(PortMask),
    PrintInputs,
    PrintOutputs,
}

impl Command {
    /// `Ok(None)` for lines that aren't a command
    fn parse(line: &str) -> Result<Option<Self>, BadPortMask> {
        let (name, value) = match line.split_once('=') {
            Some((name, value)) => (name.trim(), Some(value)),
            None => (line.trim(), None),
        };

        let command = match (name, value) {
            ("inputs", None) => Self::PrintInputs,
            ("outputs", None) => Self::PrintOutputs,
            ("inputs", Some(value)) => Self::SetInputs(value.parse()?),
            ("outputs", Some(value)) => Self::SetOutputs(value.parse()?),
            _ => return Ok(None),
        };

        Ok(Some(command))
    }
}

/// Two rows: port numbers from 15 down to 0, then their values
fn render_table(mask: PortMask) -> String {
    let mut ports = String::from("|");
    let mut values = String::from("|");
    for port in (0..PORT_COUNT).rev() {
        ports.push_str(&format!("{port:02}|"));
        values.push_str(if mask.is_set(port) { " 1|" } else { " 0|" });
    }
    format!("{ports}\n{values}")
}

fn execute(device: &VirtualDevice, command: Command) -> String {
    match command {
        Command::SetInputs(mask) => {
            device.set_inputs(mask);
            format!("set input={mask}")
        }
        Command::SetOutputs(mask) => {
            device.set_outputs(mask);
            format!("set output={mask}")
        }
        Command::PrintInputs => render_table(device.inputs()),
        Command::PrintOutputs => render_table(device.outputs()),
    }
}

/// Drive the virtual device from `input` until it ends or the device is closed
pub(crate) async fn run<R>(device: Arc<VirtualDevice>, input: R)
where
    R: AsyncBufRead + Unpin,
{
    println!("{HELP}");

    let mut lines = input.lines();
    while !device.is_closed() {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                tracing::warn!("unable to read console: {}", err);
                break;
            }
        };

        match Command::parse(&line) {
            Ok(Some(command)) => println!("{}", execute(&device, command)),
            Ok(None) => {}
            Err(err) => println!("{err}"),
        }
    }

    tracing::debug!("console stopped");
}
