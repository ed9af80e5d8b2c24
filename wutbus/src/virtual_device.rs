use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::constants::ports::PORT_COUNT;
use crate::error::{InvalidRequest, RequestError};
use crate::ports::{PortMask, PortValues};
use crate::service::PortService;

#[derive(Default)]
struct State {
    inputs: PortMask,
    outputs: PortMask,
    closed: bool,
}

/// In-memory [`PortService`] used to run the gateway without hardware
///
/// Inputs only change through [`set_inputs`](Self::set_inputs). Outputs change through
/// [`PortService::set_output`] and [`set_outputs`](Self::set_outputs).
/// Once closed, every [`PortService`] operation fails with [`RequestError::Closed`].
#[derive(Default)]
pub struct VirtualDevice {
    state: Mutex<State>,
}

impl std::fmt::Debug for VirtualDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("VirtualDevice")
            .field("inputs", &state.inputs)
            .field("outputs", &state.outputs)
            .field("closed", &state.closed)
            .finish()
    }
}

impl VirtualDevice {
    /// Create a device with every port off
    pub fn new() -> Self {
        Self::default()
    }

    /// Current inputs
    pub fn inputs(&self) -> PortMask {
        self.lock().inputs
    }

    /// Current outputs
    pub fn outputs(&self) -> PortMask {
        self.lock().outputs
    }

    /// Overwrite all inputs at once
    pub fn set_inputs(&self, inputs: PortMask) {
        self.lock().inputs = inputs;
    }

    /// Overwrite all outputs at once
    pub fn set_outputs(&self, outputs: PortMask) {
        self.lock().outputs = outputs;
    }

    /// True once [`PortService::close`] has been called
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // the state is plain data, a panic while holding the lock can't corrupt it
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn open(&self) -> Result<MutexGuard<'_, State>, RequestError> {
        let state = self.lock();
        if state.closed {
            return Err(RequestError::Closed);
        }
        Ok(state)
    }
}

impl PortService for VirtualDevice {
    async fn get_inputs(&self) -> Result<PortValues, RequestError> {
        Ok(self.open()?.inputs.to_values())
    }

    async fn get_outputs(&self) -> Result<PortValues, RequestError> {
        Ok(self.open()?.outputs.to_values())
    }

    async fn set_output(&self, port: usize, value: bool) -> Result<(), RequestError> {
        if port >= PORT_COUNT {
            return Err(InvalidRequest::PortOutOfRange(port).into());
        }
        let mut state = self.open()?;
        state.outputs = state.outputs.with(port, value);
        tracing::debug!("output {} set to {}", port, value);
        Ok(())
    }

    async fn close(&self) {
        self.lock().closed = true;
    }
}
