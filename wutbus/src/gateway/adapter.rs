use std::sync::Arc;

use crate::error::GatewayError;
use crate::gateway::request::Request;
use crate::ports::PortMask;
use crate::service::PortService;

/// Translates text requests into calls on a [`PortService`]
#[derive(Debug)]
pub struct Adapter<S: PortService> {
    service: Arc<S>,
}

impl<S: PortService> Clone for Adapter<S> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
        }
    }
}

impl<S: PortService> Adapter<S> {
    /// Create an adapter dispatching to `service`
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }

    /// The service requests are dispatched to
    pub fn service(&self) -> &Arc<S> {
        &self.service
    }

    /// Handle one request and produce the reply, if the request has one
    ///
    /// Reads reply with `input=HHHH` or `output=HHHH`. Output access requests
    /// never reply, and one without a state leaves the outputs untouched.
    pub async fn handle(&self, text: &str) -> Result<Option<String>, GatewayError> {
        let request = Request::parse(text)?;
        tracing::debug!("{}", request);

        match request {
            Request::ReadInputs => {
                let inputs = self.service.get_inputs().await?;
                Ok(Some(format!("input={}", PortMask::from_values(&inputs))))
            }
            Request::ReadOutputs => {
                let outputs = self.service.get_outputs().await?;
                Ok(Some(format!("output={}", PortMask::from_values(&outputs))))
            }
            Request::WriteOutput {
                port,
                state: Some(state),
            } => {
                self.service.set_output(port, state).await?;
                Ok(None)
            }
            Request::WriteOutput { port, state: None } => {
                tracing::debug!("ignoring access to output {} without a state", port);
                Ok(None)
            }
        }
    }
}
