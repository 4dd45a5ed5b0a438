use crate::flags::ControlFlags;
use crate::status::LoopStatus;
use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Set by [`run_loop`] if `control_step` panics, and read by the supervisor
/// to surface a lifecycle fault in the snapshot. A loop that panics
/// keeps running — the panic is caught, the actuator is forced off, and the
/// next tick proceeds normally — but the flag stays set until the
/// supervisor acknowledges it, since a single panic already indicates the
/// loop's invariants should be reviewed.
pub type LoopFault = Arc<AtomicBool>;

/// The capability every periodic control loop implements.
///
/// A loop is just a value that implements this trait; [`run_loop`] is the
/// single generic runner that schedules any of them. There is no
/// hook-method dispatch and no shared mutable base-class state.
#[async_trait]
pub trait ControlLoop: Send {
    /// One control iteration: sample, decide, drive the actuator.
    async fn control_step(&mut self);

    /// Force the actuator to its safe (off) state and clear any latent
    /// actuation timer. Must be idempotent and synchronous — it runs both
    /// on every gate-closed tick and as the last action before a cancelled
    /// task returns.
    fn ensure_actuator_off(&mut self);

    /// Clear controller memory (PID integrator, cooldown timers) without
    /// touching setpoints or enable state.
    fn reset_control(&mut self);

    fn get_status(&self) -> LoopStatus;
}

/// Runs `control` on a fixed-interval tick until `cancel` fires.
///
/// Each tick: if the gate (`flags.gate_open()`) is closed, force the
/// actuator off and wait for the next tick. If open, run one control step,
/// then re-check the gate — a disable issued mid-step must still result in
/// the actuator being forced off before the tick ends, so a racing disable
/// can never leave an actuator energized past its own tick.
///
/// The interval wait is the loop's only suspension point, and therefore its
/// only cancellation point: a cancellation arriving during a step is
/// observed at the following wait, and `ensure_actuator_off` always runs
/// once more before the task returns.
pub async fn run_loop<L: ControlLoop>(
    control: L,
    flags: ControlFlags,
    name: &'static str,
    tick_interval: Duration,
    cancel: CancellationToken,
) {
    run_loop_with_fault(control, flags, name, tick_interval, cancel, None).await;
}

/// Same contract as [`run_loop`], additionally publishing a panic into
/// `fault` instead of letting it unwind through the task.
pub async fn run_loop_with_fault<L: ControlLoop>(
    mut control: L,
    mut flags: ControlFlags,
    name: &'static str,
    tick_interval: Duration,
    cancel: CancellationToken,
    fault: Option<LoopFault>,
) {
    info!(loop_name = name, "control loop started");
    loop {
        if !flags.gate_open() {
            control.ensure_actuator_off();
        } else {
            let outcome = AssertUnwindSafe(control.control_step()).catch_unwind().await;
            if outcome.is_err() {
                error!(loop_name = name, "control_step panicked, forcing actuator off");
                if let Some(fault) = &fault {
                    fault.store(true, Ordering::SeqCst);
                }
                control.ensure_actuator_off();
            } else if !flags.gate_open() {
                control.ensure_actuator_off();
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(tick_interval) => {}
            _ = flags.changed() => {
                debug!(loop_name = name, "gate change observed, re-evaluating immediately");
            }
            _ = cancel.cancelled() => {
                debug!(loop_name = name, "cancellation observed at tick wait");
                control.ensure_actuator_off();
                info!(loop_name = name, "control loop stopped");
                return;
            }
        }
    }
}
