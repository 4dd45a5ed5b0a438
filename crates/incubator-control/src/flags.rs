use serde::Serialize;
use tokio::sync::watch;

/// The supervisor's gate state, broadcast to every loop.
///
/// Loops never hold a back-reference to the supervisor (the reference
/// source's `manager` attribute on every loop, read from deep inside
/// `control_step`); instead each loop holds a [`ControlFlags`] handle that
/// can only read this snapshot, never mutate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SupervisorFlags {
    pub global_run: bool,
    pub temperature_enabled: bool,
    pub humidity_enabled: bool,
    pub o2_enabled: bool,
    pub co2_enabled: bool,
    pub air_pump_enabled: bool,
}

impl Default for SupervisorFlags {
    fn default() -> Self {
        Self {
            global_run: false,
            temperature_enabled: true,
            humidity_enabled: true,
            o2_enabled: true,
            co2_enabled: true,
            air_pump_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopKind {
    Temperature,
    Humidity,
    Oxygen,
    Co2,
    AirPump,
}

/// A read-only, per-loop view of the supervisor's gate state.
///
/// `gate_open` reads the flags once; callers that need a single consistent
/// view for an entire tick should call it once at the top of the tick and
/// reuse the result, per the "read once, use for the whole tick" rule.
#[derive(Clone)]
pub struct ControlFlags {
    rx: watch::Receiver<SupervisorFlags>,
    kind: LoopKind,
}

impl ControlFlags {
    pub fn new(rx: watch::Receiver<SupervisorFlags>, kind: LoopKind) -> Self {
        Self { rx, kind }
    }

    pub fn snapshot(&self) -> SupervisorFlags {
        *self.rx.borrow()
    }

    pub fn gate_open(&self) -> bool {
        let flags = self.snapshot();
        if !flags.global_run {
            return false;
        }
        match self.kind {
            LoopKind::Temperature => flags.temperature_enabled,
            LoopKind::Humidity => flags.humidity_enabled,
            LoopKind::Oxygen => flags.o2_enabled,
            LoopKind::Co2 => flags.co2_enabled,
            LoopKind::AirPump => flags.air_pump_enabled,
        }
    }

    /// Resolves as soon as the supervisor pushes a new flags value.
    ///
    /// [`run_loop`](crate::run_loop) selects on this alongside its tick
    /// sleep so a disable (or a global-run flip) wakes the loop immediately
    /// instead of waiting out the rest of the current tick interval, since
    /// a loop's relay is owned by its own task, not the supervisor, so
    /// forcing it off can only happen from inside that task.
    pub async fn changed(&mut self) {
        // A closed (sender-dropped) channel never changes again; park
        // forever rather than spin, the cancellation branch still wins.
        if self.rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_requires_both_global_and_loop_flag() {
        let (tx, rx) = watch::channel(SupervisorFlags {
            global_run: true,
            temperature_enabled: false,
            ..SupervisorFlags::default()
        });
        let flags = ControlFlags::new(rx, LoopKind::Temperature);
        assert!(!flags.gate_open());

        tx.send_modify(|f| f.temperature_enabled = true);
        assert!(flags.gate_open());

        tx.send_modify(|f| f.global_run = false);
        assert!(!flags.gate_open());
    }
}
