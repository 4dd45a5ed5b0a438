use crate::loop_skeleton::ControlLoop;
use crate::status::LoopStatus;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

/// Wraps a loop and republishes its status into a shared slot after every
/// tick, so a supervisor that no longer owns the loop directly (it was
/// moved into [`crate::run_loop`]'s task) can still assemble a snapshot
/// without blocking on the loop task itself.
///
/// The alternative — `run_loop` calling back into the supervisor on every
/// tick — would couple the generic scheduler to a concrete supervisor type.
/// Publishing into an `Arc<Mutex<LoopStatus>>` keeps `run_loop` and
/// [`ControlLoop`] supervisor-agnostic, matching this crate's existing
/// decorator (see [`crate::SetpointSynced`]) rather than adding a new
/// scheduler variant.
pub struct StatusPublisher<L> {
    inner: L,
    published: Arc<Mutex<LoopStatus>>,
}

impl<L: ControlLoop> StatusPublisher<L> {
    pub fn new(inner: L, published: Arc<Mutex<LoopStatus>>) -> Self {
        *published.lock() = inner.get_status();
        Self { inner, published }
    }
}

#[async_trait]
impl<L: ControlLoop> ControlLoop for StatusPublisher<L> {
    async fn control_step(&mut self) {
        self.inner.control_step().await;
        *self.published.lock() = self.inner.get_status();
    }

    fn ensure_actuator_off(&mut self) {
        self.inner.ensure_actuator_off();
        *self.published.lock() = self.inner.get_status();
    }

    fn reset_control(&mut self) {
        self.inner.reset_control();
    }

    fn get_status(&self) -> LoopStatus {
        self.inner.get_status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::air_pump::AirPumpLoop;
    use incubator_hal::{HalError, Relay};

    #[derive(Default)]
    struct NoopRelay {
        on: bool,
    }
    impl Relay for NoopRelay {
        fn set(&mut self, on: bool) -> Result<(), HalError> {
            self.on = on;
            Ok(())
        }
        fn is_on(&self) -> bool {
            self.on
        }
    }

    #[tokio::test]
    async fn published_status_reflects_latest_tick() {
        let pump = AirPumpLoop::new(Box::new(NoopRelay::default()));
        let published = Arc::new(Mutex::new(pump.get_status()));
        let mut wrapped = StatusPublisher::new(pump, published.clone());

        wrapped.control_step().await;
        match &*published.lock() {
            LoopStatus::AirPump(_) => {}
            _ => unreachable!(),
        }
    }
}
