use crate::client::ModbusClient;
use crate::constants::ports::PORT_COUNT;
use crate::error::{InvalidRequest, RequestError};
use crate::ports::PortValues;
use crate::service::PortService;

/// [`PortService`] backed by a Modbus TCP device
///
/// Inputs are the discrete inputs 0 to 15, outputs the coils 0 to 15.
/// Errors of the client are passed through unchanged.
#[derive(Debug)]
pub struct ModbusDevice {
    client: ModbusClient,
}

impl ModbusDevice {
    /// Wrap a client, connected or not
    pub fn new(client: ModbusClient) -> Self {
        Self { client }
    }

    fn to_values(bits: Vec<bool>) -> PortValues {
        let mut values = [false; PORT_COUNT];
        for (dest, src) in values.iter_mut().zip(bits) {
            *dest = src;
        }
        values
    }
}

impl PortService for ModbusDevice {
    async fn get_inputs(&self) -> Result<PortValues, RequestError> {
        let bits = self
            .client
            .read_discrete_inputs(0, PORT_COUNT as u16)
            .await?;
        Ok(Self::to_values(bits))
    }

    async fn get_outputs(&self) -> Result<PortValues, RequestError> {
        let bits = self.client.read_coils(0, PORT_COUNT as u16).await?;
        Ok(Self::to_values(bits))
    }

    async fn set_output(&self, port: usize, value: bool) -> Result<(), RequestError> {
        if port >= PORT_COUNT {
            return Err(InvalidRequest::PortOutOfRange(port).into());
        }
        self.client.write_single_coil(port as u16, value).await
    }

    async fn close(&self) {
        self.client.disconnect().await
    }
}
