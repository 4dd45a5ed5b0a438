use crate::hysteresis::Hysteresis;
use crate::loop_skeleton::ControlLoop;
use crate::status::{HumidityStatus, LoopStatus};
use async_trait::async_trait;
use incubator_hal::{HumidityProbe, Reading, Relay};
use std::ops::RangeInclusive;
use tracing::{error, info};

pub const SETPOINT_RANGE: RangeInclusive<f64> = 0.0..=100.0;

pub struct HumidityLoop {
    probe: Box<dyn HumidityProbe>,
    relay: Box<dyn Relay>,
    hysteresis: Hysteresis,
    humidifier_on: bool,
    last_reading: Option<f64>,
}

impl HumidityLoop {
    pub fn new(
        probe: Box<dyn HumidityProbe>,
        relay: Box<dyn Relay>,
        setpoint: f64,
        hysteresis_width: f64,
    ) -> Self {
        Self {
            probe,
            relay,
            hysteresis: Hysteresis::new(setpoint, hysteresis_width),
            humidifier_on: false,
            last_reading: None,
        }
    }

    pub fn setpoint(&self) -> f64 {
        self.hysteresis.setpoint()
    }

    /// Validates `0 <= value <= 100` and recomputes both thresholds
    /// atomically; rejects and leaves the prior setpoint untouched
    /// otherwise.
    pub fn set_setpoint(&mut self, value: f64) -> bool {
        if SETPOINT_RANGE.contains(&value) {
            self.hysteresis.set_setpoint(value);
            true
        } else {
            false
        }
    }

    fn set_humidifier(&mut self, on: bool) {
        if on != self.humidifier_on {
            if let Err(e) = self.relay.set(on) {
                error!(error = %e, "failed to drive humidifier relay");
                return;
            }
            self.humidifier_on = on;
            info!(on, "humidifier state changed");
        }
    }
}

#[async_trait]
impl ControlLoop for HumidityLoop {
    async fn control_step(&mut self) {
        let reading = self.probe.read().await;
        self.last_reading = reading.value();

        let Reading::Value(value) = reading else {
            self.ensure_actuator_off();
            return;
        };

        let want_on = self.hysteresis.step(value, self.humidifier_on);
        self.set_humidifier(want_on);
    }

    fn ensure_actuator_off(&mut self) {
        self.set_humidifier(false);
    }

    fn reset_control(&mut self) {}

    fn get_status(&self) -> LoopStatus {
        LoopStatus::Humidity(HumidityStatus {
            humidity: self.last_reading,
            setpoint: self.hysteresis.setpoint(),
            hysteresis: self.hysteresis.off_threshold() - self.hysteresis.on_threshold(),
            on_threshold: self.hysteresis.on_threshold(),
            off_threshold: self.hysteresis.off_threshold(),
            humidifier_on: self.humidifier_on,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use incubator_hal::HalError;

    struct ScriptedProbe {
        readings: Vec<Reading>,
        idx: usize,
    }

    #[async_trait]
    impl HumidityProbe for ScriptedProbe {
        async fn read(&mut self) -> Reading {
            let r = self.readings[self.idx.min(self.readings.len() - 1)];
            self.idx += 1;
            r
        }
    }

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
    async fn scenario_s3_toggles_only_at_crossings() {
        let probe = Box::new(ScriptedProbe {
            readings: vec![
                Reading::Value(58.0),
                Reading::Value(59.0),
                Reading::Value(62.0),
                Reading::Value(61.0),
            ],
            idx: 0,
        });
        let mut loop_ = HumidityLoop::new(probe, Box::new(NoopRelay::default()), 60.0, 4.0);

        let mut commands = Vec::new();
        for _ in 0..4 {
            loop_.control_step().await;
            match loop_.get_status() {
                LoopStatus::Humidity(s) => commands.push(s.humidifier_on),
                _ => unreachable!(),
            }
        }

        assert_eq!(commands, vec![true, true, false, false]);
    }

    #[tokio::test]
    async fn setpoint_rejects_out_of_range() {
        let probe = Box::new(ScriptedProbe {
            readings: vec![Reading::Value(50.0)],
            idx: 0,
        });
        let mut loop_ = HumidityLoop::new(probe, Box::new(NoopRelay::default()), 60.0, 4.0);
        assert!(!loop_.set_setpoint(150.0));
        assert_eq!(loop_.setpoint(), 60.0);
        assert!(loop_.set_setpoint(55.0));
        assert_eq!(loop_.setpoint(), 55.0);
    }

    #[tokio::test]
    async fn not_connected_forces_humidifier_off() {
        let probe = Box::new(ScriptedProbe {
            readings: vec![Reading::NotConnected],
            idx: 0,
        });
        let mut loop_ = HumidityLoop::new(probe, Box::new(NoopRelay::default()), 60.0, 4.0);
        loop_.control_step().await;
        match loop_.get_status() {
            LoopStatus::Humidity(s) => assert!(!s.humidifier_on),
            _ => unreachable!(),
        }
    }
}
