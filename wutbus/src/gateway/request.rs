use crate::constants::gateway;
use crate::error::GatewayError;

/// A request of the text protocol
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Request {
    /// `GET /input?`
    ReadInputs,
    /// `GET /output?`
    ReadOutputs,
    /// `GET /outputaccess<port>?State=ON|OFF`
    WriteOutput {
        /// port number, not yet checked against the port count
        port: usize,
        /// requested state, `None` if the request names neither state
        state: Option<bool>,
    },
}

impl Request {
    /// Classify a request by its prefix
    ///
    /// Anything following a recognized prefix is ignored, except for the output
    /// access request whose port runs up to the next `?`. Its state token may
    /// appear anywhere in the request.
    pub fn parse(text: &str) -> Result<Self, GatewayError> {
        if text.starts_with(gateway::READ_INPUTS) {
            return Ok(Self::ReadInputs);
        }

        if text.starts_with(gateway::READ_OUTPUTS) {
            return Ok(Self::ReadOutputs);
        }

        if let Some(rest) = text.strip_prefix(gateway::OUTPUT_ACCESS) {
            let port = rest
                .split_once('?')
                .and_then(|(port, _)| port.parse::<usize>().ok())
                .ok_or_else(|| GatewayError::BadPort(text.to_string()))?;

            let state = if text.contains(gateway::STATE_ON) {
                Some(true)
            } else if text.contains(gateway::STATE_OFF) {
                Some(false)
            } else {
                None
            };

            return Ok(Self::WriteOutput { port, state });
        }

        Err(GatewayError::NoSuchRequest(text.to_string()))
    }
}

impl std::fmt::Display for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReadInputs => f.write_str("read inputs"),
            Self::ReadOutputs => f.write_str("read outputs"),
            Self::WriteOutput {
                port,
                state: Some(state),
            } => write!(f, "write output {port} = {}", if *state { "ON" } else { "OFF" }),
            Self::WriteOutput { port, state: None } => {
                write!(f, "write output {port} without state")
            }
        }
    }
}
