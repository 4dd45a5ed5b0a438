use crate::loop_skeleton::ControlLoop;
use crate::status::{LoopStatus, TemperatureStatus};
use async_trait::async_trait;
use incubator_hal::{Reading, Relay, TemperatureProbe};
use std::ops::RangeInclusive;
use std::time::Instant;
use thermal::{HeaterSafety, Pid, SafetyLimits, ThermalState};
use tracing::{error, warn};

/// Valid range for the temperature setpoint (°C).
pub const SETPOINT_RANGE: RangeInclusive<f64> = 0.0..=80.0;

/// PID output above this threshold energizes the heater. Output is
/// symmetric around zero, so the midpoint is the natural default.
pub const DEFAULT_HEATER_ON_THRESHOLD: f64 = 0.0;

pub struct TemperatureLoop {
    probe: Box<dyn TemperatureProbe>,
    relay: Box<dyn Relay>,
    pid: Pid<f64>,
    dt_s: f64,
    heater_on_threshold: f64,
    safety: Option<HeaterSafety<f64>>,
    start: Instant,
    heater_on: bool,
    last_ch1: Option<f64>,
    last_ch2: Option<f64>,
    last_control_value: Option<f64>,
    degraded: bool,
}

impl TemperatureLoop {
    pub fn new(
        probe: Box<dyn TemperatureProbe>,
        relay: Box<dyn Relay>,
        kp: f64,
        ki: f64,
        kd: f64,
        setpoint: f64,
        dt_s: f64,
        safety_limits: Option<SafetyLimits<f64>>,
    ) -> Self {
        Self {
            probe,
            relay,
            pid: Pid::new(kp, ki, kd, setpoint, -100.0, 100.0),
            dt_s,
            heater_on_threshold: DEFAULT_HEATER_ON_THRESHOLD,
            safety: safety_limits.map(HeaterSafety::new),
            start: Instant::now(),
            heater_on: false,
            last_ch1: None,
            last_ch2: None,
            last_control_value: None,
            degraded: false,
        }
    }

    pub fn setpoint(&self) -> f64 {
        self.pid.setpoint
    }

    /// Validates `setpoint` against [`SETPOINT_RANGE`] and, if accepted,
    /// applies it on the next tick; the PID integrator is left untouched so
    /// a setpoint change never causes a step discontinuity in the
    /// accumulated term. Rejects and leaves the prior setpoint untouched
    /// otherwise.
    pub fn set_setpoint(&mut self, setpoint: f64) -> bool {
        if SETPOINT_RANGE.contains(&setpoint) {
            self.pid.setpoint = setpoint;
            true
        } else {
            false
        }
    }

    fn combine_channels(&mut self, ch1: Reading, ch2: Reading) -> Option<f64> {
        self.last_ch1 = ch1.value();
        self.last_ch2 = ch2.value();
        match (ch1, ch2) {
            (Reading::Value(a), Reading::Value(b)) => {
                self.degraded = false;
                Some((a + b) / 2.0)
            }
            (Reading::Value(a), Reading::NotConnected) => {
                self.degraded = true;
                Some(a)
            }
            (Reading::NotConnected, Reading::Value(b)) => {
                self.degraded = true;
                Some(b)
            }
            (Reading::NotConnected, Reading::NotConnected) => {
                self.degraded = false;
                None
            }
        }
    }
}

#[async_trait]
impl ControlLoop for TemperatureLoop {
    async fn control_step(&mut self) {
        let dual = self.probe.read().await;
        let control_value = self.combine_channels(dual.ch1, dual.ch2);
        self.last_control_value = control_value;

        let Some(value) = control_value else {
            warn!("temperature probe not connected on either channel");
            self.ensure_actuator_off();
            return;
        };

        let output = self.pid.update(value, self.dt_s);
        let mut want_on = output > self.heater_on_threshold;

        if let Some(safety) = &mut self.safety {
            let now_s = self.start.elapsed().as_secs_f64();
            let state = safety.update(now_s, value, self.pid.setpoint, want_on);
            if state == ThermalState::Shutdown {
                error!(value, setpoint = self.pid.setpoint, "heater safety shutdown");
                want_on = false;
            }
        }

        if want_on != self.heater_on {
            if let Err(e) = self.relay.set(want_on) {
                error!(error = %e, "failed to drive heater relay");
                return;
            }
            self.heater_on = want_on;
        }
    }

    fn ensure_actuator_off(&mut self) {
        if self.heater_on {
            if let Err(e) = self.relay.off() {
                error!(error = %e, "failed to turn heater off");
            }
        }
        self.heater_on = false;
        self.pid.reset();
    }

    fn reset_control(&mut self) {
        self.pid.reset();
    }

    fn get_status(&self) -> LoopStatus {
        LoopStatus::Temperature(TemperatureStatus {
            ch1: self.last_ch1,
            ch2: self.last_ch2,
            control_value: self.last_control_value,
            degraded: self.degraded,
            setpoint: self.pid.setpoint,
            heater_on: self.heater_on,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use incubator_hal::{DualReading, HalError};

    struct FixedProbe {
        readings: Vec<f64>,
        idx: usize,
    }

    #[async_trait]
    impl TemperatureProbe for FixedProbe {
        async fn read(&mut self) -> DualReading {
            let v = self.readings[self.idx.min(self.readings.len() - 1)];
            self.idx += 1;
            DualReading {
                ch1: Reading::Value(v),
                ch2: Reading::NotConnected,
            }
        }
    }

    #[derive(Default)]
    struct RecordingRelay {
        on: bool,
        history: Vec<bool>,
    }

    impl Relay for RecordingRelay {
        fn set(&mut self, on: bool) -> Result<(), HalError> {
            self.on = on;
            self.history.push(on);
            Ok(())
        }
        fn is_on(&self) -> bool {
            self.on
        }
    }

    #[tokio::test]
    async fn scenario_s2_heater_on_for_below_setpoint_p_only() {
        let probe = Box::new(FixedProbe {
            readings: vec![36.0, 36.0, 36.0],
            idx: 0,
        });
        let relay = Box::new(RecordingRelay::default());
        let mut loop_ = TemperatureLoop::new(probe, relay, 5.0, 0.0, 0.0, 37.0, 1.0, None);

        let mut commands = Vec::new();
        for _ in 0..3 {
            loop_.control_step().await;
            match loop_.get_status() {
                LoopStatus::Temperature(s) => commands.push(s.heater_on),
                _ => unreachable!(),
            }
        }

        assert_eq!(commands, vec![true, true, true]);
    }

    #[tokio::test]
    async fn degraded_mode_uses_surviving_channel() {
        struct OneBadChannel;
        #[async_trait]
        impl TemperatureProbe for OneBadChannel {
            async fn read(&mut self) -> DualReading {
                DualReading {
                    ch1: Reading::Value(40.0),
                    ch2: Reading::NotConnected,
                }
            }
        }
        let mut loop_ = TemperatureLoop::new(
            Box::new(OneBadChannel),
            Box::new(RecordingRelay::default()),
            1.0,
            0.0,
            0.0,
            37.0,
            1.0,
            None,
        );
        loop_.control_step().await;
        let status = match loop_.get_status() {
            LoopStatus::Temperature(s) => s,
            _ => unreachable!(),
        };
        assert!(status.degraded);
        assert_eq!(status.control_value, Some(40.0));
    }

    #[tokio::test]
    async fn setpoint_rejects_out_of_range() {
        let probe = Box::new(FixedProbe {
            readings: vec![36.0],
            idx: 0,
        });
        let mut loop_ =
            TemperatureLoop::new(probe, Box::new(RecordingRelay::default()), 5.0, 0.0, 0.0, 37.0, 1.0, None);
        assert!(!loop_.set_setpoint(150.0));
        assert_eq!(loop_.setpoint(), 37.0);
        assert!(loop_.set_setpoint(38.5));
        assert_eq!(loop_.setpoint(), 38.5);
    }

    #[tokio::test]
    async fn both_channels_disconnected_forces_heater_off_and_resets_integrator() {
        struct BothBad;
        #[async_trait]
        impl TemperatureProbe for BothBad {
            async fn read(&mut self) -> DualReading {
                DualReading {
                    ch1: Reading::NotConnected,
                    ch2: Reading::NotConnected,
                }
            }
        }
        let mut loop_ = TemperatureLoop::new(
            Box::new(BothBad),
            Box::new(RecordingRelay::default()),
            5.0,
            0.0,
            0.0,
            37.0,
            1.0,
            None,
        );
        loop_.control_step().await;
        let status = match loop_.get_status() {
            LoopStatus::Temperature(s) => s,
            _ => unreachable!(),
        };
        assert!(!status.heater_on);
        assert_eq!(status.control_value, None);
    }
}
