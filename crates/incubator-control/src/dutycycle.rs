use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    On,
    Off,
}

/// A pure time-driven two-state machine: ON for `t_on`, then OFF for
/// `t_off`, repeating. Transitions are evaluated against a monotonic clock,
/// never against the loop's tick cadence — a slow tick only delays how
/// promptly a due transition is noticed, it never drifts the cycle.
#[derive(Debug, Clone, Copy)]
pub struct DutyCycleTimer {
    t_on: Duration,
    t_off: Duration,
    phase: Phase,
    phase_started: Instant,
}

impl DutyCycleTimer {
    pub fn new(t_on: Duration, t_off: Duration, now: Instant) -> Self {
        Self {
            t_on,
            t_off,
            phase: Phase::Off,
            phase_started: now,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Advances the phase if its duration has elapsed, returning the
    /// (possibly unchanged) current phase.
    pub fn poll(&mut self, now: Instant) -> Phase {
        let elapsed = now.saturating_duration_since(self.phase_started);
        let due = match self.phase {
            Phase::On => elapsed >= self.t_on,
            Phase::Off => elapsed >= self.t_off,
        };
        if due {
            self.phase = match self.phase {
                Phase::On => Phase::Off,
                Phase::Off => Phase::On,
            };
            self.phase_started = now;
        }
        self.phase
    }

    /// Forces the OFF phase and restarts its timer, per the air-pump
    /// loop's disable contract.
    pub fn force_off(&mut self, now: Instant) {
        self.phase = Phase::Off;
        self.phase_started = now;
    }

    pub fn elapsed_in_phase(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.phase_started)
    }

    pub fn remaining_in_phase(&self, now: Instant) -> Duration {
        let target = match self.phase {
            Phase::On => self.t_on,
            Phase::Off => self.t_off,
        };
        target.saturating_sub(self.elapsed_in_phase(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycles_through_off_then_on_then_off() {
        let t0 = Instant::now();
        let mut timer = DutyCycleTimer::new(Duration::from_secs(1), Duration::from_secs(29), t0);
        assert_eq!(timer.phase(), Phase::Off);
        assert_eq!(timer.poll(t0 + Duration::from_secs(10)), Phase::Off);
        assert_eq!(timer.poll(t0 + Duration::from_secs(29)), Phase::On);
        assert_eq!(timer.poll(t0 + Duration::from_secs(30)), Phase::On);
        assert_eq!(timer.poll(t0 + Duration::from_secs(31)), Phase::Off);
    }

    #[test]
    fn force_off_restarts_timer() {
        let t0 = Instant::now();
        let mut timer = DutyCycleTimer::new(Duration::from_secs(1), Duration::from_secs(29), t0);
        timer.poll(t0 + Duration::from_secs(29));
        assert_eq!(timer.phase(), Phase::On);
        timer.force_off(t0 + Duration::from_secs(29));
        assert_eq!(timer.phase(), Phase::Off);
        assert_eq!(timer.poll(t0 + Duration::from_secs(29)), Phase::Off);
    }
}
