use std::future::Future;

use crate::error::RequestError;
use crate::ports::PortValues;

/// Access to the inputs and outputs of a device
///
/// The gateway shares one instance between all of its connections, so every
/// operation takes `&self`. Values are read fresh on every call and never cached.
pub trait PortService: Send + Sync + 'static {
    /// Read all 16 inputs
    fn get_inputs(&self) -> impl Future<Output = Result<PortValues, RequestError>> + Send;

    /// Read all 16 outputs
    fn get_outputs(&self) -> impl Future<Output = Result<PortValues, RequestError>> + Send;

    /// Set output `port` (0 to 15) to `value`
    fn set_output(
        &self,
        port: usize,
        value: bool,
    ) -> impl Future<Output = Result<(), RequestError>> + Send;

    /// Release the underlying resources. Calling it more than once has no further effect.
    fn close(&self) -> impl Future<Output = ()> + Send;
}
