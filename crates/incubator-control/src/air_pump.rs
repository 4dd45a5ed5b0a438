use crate::clock::{Clock, SystemClock};
use crate::dutycycle::{DutyCycleTimer, Phase};
use crate::loop_skeleton::ControlLoop;
use crate::status::{AirPumpStatus, LoopStatus};
use async_trait::async_trait;
use incubator_hal::Relay;
use std::time::Duration;
use tracing::error;

pub const DEFAULT_ON_DURATION: Duration = Duration::from_secs(1);
pub const DEFAULT_OFF_DURATION: Duration = Duration::from_secs(29);

/// Pure time-driven two-state machine with no sensor input. The loop tick
/// cadence only bounds how promptly a due transition is noticed; timing
/// itself comes entirely from the monotonic clock inside
/// [`DutyCycleTimer`].
pub struct AirPumpLoop {
    relay: Box<dyn Relay>,
    timer: DutyCycleTimer,
    pump_on: bool,
    clock: Box<dyn Clock>,
}

impl AirPumpLoop {
    pub fn new(relay: Box<dyn Relay>) -> Self {
        Self::with_clock(
            relay,
            DEFAULT_ON_DURATION,
            DEFAULT_OFF_DURATION,
            Box::new(SystemClock),
        )
    }

    pub fn with_clock(
        relay: Box<dyn Relay>,
        t_on: Duration,
        t_off: Duration,
        clock: Box<dyn Clock>,
    ) -> Self {
        let now = clock.now();
        Self {
            relay,
            timer: DutyCycleTimer::new(t_on, t_off, now),
            pump_on: false,
            clock,
        }
    }

    fn set_pump(&mut self, on: bool) {
        if on != self.pump_on {
            if let Err(e) = self.relay.set(on) {
                error!(error = %e, "failed to drive air pump relay");
                return;
            }
            self.pump_on = on;
        }
    }
}

#[async_trait]
impl ControlLoop for AirPumpLoop {
    async fn control_step(&mut self) {
        let now = self.clock.now();
        let phase = self.timer.poll(now);
        self.set_pump(phase == Phase::On);
    }

    fn ensure_actuator_off(&mut self) {
        let now = self.clock.now();
        self.timer.force_off(now);
        self.set_pump(false);
    }

    fn reset_control(&mut self) {
        let now = self.clock.now();
        self.timer.force_off(now);
    }

    fn get_status(&self) -> LoopStatus {
        let now = self.clock.now();
        LoopStatus::AirPump(AirPumpStatus {
            pump_on: self.pump_on,
            elapsed_in_phase_s: self.timer.elapsed_in_phase(now).as_secs_f64(),
            remaining_in_phase_s: self.timer.remaining_in_phase(now).as_secs_f64(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::test_support::FakeClock;
    use incubator_hal::HalError;
    use std::sync::Arc;

    #[derive(Default)]
    struct RecordingRelay {
        history: Vec<bool>,
    }
    impl Relay for RecordingRelay {
        fn set(&mut self, on: bool) -> Result<(), HalError> {
            self.history.push(on);
            Ok(())
        }
        fn is_on(&self) -> bool {
            *self.history.last().unwrap_or(&false)
        }
    }

    #[tokio::test]
    async fn one_second_on_twenty_nine_off_cycle() {
        let clock = Arc::new(FakeClock::new());
        let mut loop_ = AirPumpLoop::with_clock(
            Box::new(RecordingRelay::default()),
            Duration::from_secs(1),
            Duration::from_secs(29),
            Box::new(clock.clone()),
        );

        loop_.control_step().await;
        assert!(!matches!(loop_.get_status(), LoopStatus::AirPump(s) if s.pump_on));

        clock.advance(Duration::from_secs(29));
        loop_.control_step().await;
        match loop_.get_status() {
            LoopStatus::AirPump(s) => assert!(s.pump_on),
            _ => unreachable!(),
        }

        clock.advance(Duration::from_secs(1));
        loop_.control_step().await;
        match loop_.get_status() {
            LoopStatus::AirPump(s) => assert!(!s.pump_on),
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn disable_forces_off_and_restarts_off_timer() {
        let clock = Arc::new(FakeClock::new());
        let mut loop_ = AirPumpLoop::with_clock(
            Box::new(RecordingRelay::default()),
            Duration::from_secs(1),
            Duration::from_secs(29),
            Box::new(clock.clone()),
        );
        clock.advance(Duration::from_secs(29));
        loop_.control_step().await;
        match loop_.get_status() {
            LoopStatus::AirPump(s) => assert!(s.pump_on),
            _ => unreachable!(),
        }

        loop_.ensure_actuator_off();
        match loop_.get_status() {
            LoopStatus::AirPump(s) => assert!(!s.pump_on),
            _ => unreachable!(),
        }
    }
}
