use crate::loop_skeleton::ControlLoop;
use crate::status::LoopStatus;
use async_trait::async_trait;
use tokio::sync::watch;

/// Implemented by every loop that has a single scalar setpoint (all of them
/// except the air pump, which is pure duty-cycle timing with no sensor
/// input at all). Each loop already validates and applies a setpoint change
/// via its own `set_setpoint`; this trait gives [`SetpointSynced`] a single
/// name to call regardless of which loop it is wrapping.
pub trait HasSetpoint {
    fn apply_setpoint(&mut self, value: f64);
}

impl HasSetpoint for crate::temperature::TemperatureLoop {
    fn apply_setpoint(&mut self, value: f64) {
        self.set_setpoint(value);
    }
}

impl HasSetpoint for crate::humidity::HumidityLoop {
    fn apply_setpoint(&mut self, value: f64) {
        self.set_setpoint(value);
    }
}

impl HasSetpoint for crate::oxygen::OxygenLoop {
    fn apply_setpoint(&mut self, value: f64) {
        self.set_setpoint(value);
    }
}

impl HasSetpoint for crate::co2::Co2Loop {
    fn apply_setpoint(&mut self, value: f64) {
        self.set_setpoint(value);
    }
}

/// Wraps a loop together with a `watch::Receiver` carrying its current
/// setpoint, so the supervisor can push live setpoint changes into a loop
/// task it no longer owns directly once `run_loop` has taken it.
///
/// This generalizes the same broadcast-a-snapshot, read-once-per-tick shape
/// [`crate::ControlFlags`] already uses for the enable/run gate — setpoints
/// get their own channel instead of folding into `SupervisorFlags` because
/// they are per-loop `f64`s, not a shared bitset, and because a loop that
/// does not have a setpoint (the air pump) should not need to depend on a
/// type that has one.
pub struct SetpointSynced<L> {
    inner: L,
    setpoint_rx: watch::Receiver<f64>,
}

impl<L> SetpointSynced<L> {
    pub fn new(inner: L, setpoint_rx: watch::Receiver<f64>) -> Self {
        Self { inner, setpoint_rx }
    }
}

#[async_trait]
impl<L: ControlLoop + HasSetpoint> ControlLoop for SetpointSynced<L> {
    async fn control_step(&mut self) {
        let setpoint = *self.setpoint_rx.borrow_and_update();
        self.inner.apply_setpoint(setpoint);
        self.inner.control_step().await;
    }

    fn ensure_actuator_off(&mut self) {
        self.inner.ensure_actuator_off();
    }

    fn reset_control(&mut self) {
        self.inner.reset_control();
    }

    fn get_status(&self) -> LoopStatus {
        self.inner.get_status()
    }
}
