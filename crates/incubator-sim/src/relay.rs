use incubator_hal::HalError;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// A mock relay that records every commanded state instead of driving a pin.
///
/// Cloning a `RecordingRelay` shares the same history — handed out so a test
/// can hold one half while the other is boxed into a loop, the same split
/// `incubator-control`'s own unit tests use for their local test doubles
/// (e.g. `co2.rs`'s `RecordingRelay`).
#[derive(Clone)]
pub struct RecordingRelay {
    name: &'static str,
    history: Arc<Mutex<Vec<bool>>>,
}

impl RecordingRelay {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A handle that can be inspected after the relay has been boxed away
    /// into a control loop.
    pub fn history(&self) -> Arc<Mutex<Vec<bool>>> {
        self.history.clone()
    }

    pub fn commands(&self) -> Vec<bool> {
        self.history.lock().clone()
    }

    /// The number of rising edges (off->on transitions) recorded, i.e. the
    /// number of discrete pulses or activations.
    pub fn activation_count(&self) -> usize {
        let history = self.history.lock();
        history
            .iter()
            .zip(std::iter::once(&false).chain(history.iter()))
            .filter(|(on, prev)| **on && !**prev)
            .count()
    }
}

impl incubator_hal::Relay for RecordingRelay {
    fn set(&mut self, on: bool) -> Result<(), HalError> {
        debug!(relay = self.name, on, "mock relay driven");
        self.history.lock().push(on);
        Ok(())
    }

    fn is_on(&self) -> bool {
        *self.history.lock().last().unwrap_or(&false)
    }
}
