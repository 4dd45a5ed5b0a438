use crate::clock::{Clock, SystemClock};
use crate::loop_skeleton::ControlLoop;
use crate::pulse::CooldownGate;
use crate::status::{Co2Status, LoopStatus};
use async_trait::async_trait;
use incubator_hal::{Co2Probe, Reading, Relay};
use std::time::Duration;
use tracing::{error, info};

pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(15);
pub const DEFAULT_PULSE: Duration = Duration::from_millis(100);
pub const DEFAULT_INTER_SOLENOID_DELAY: Duration = Duration::from_secs(1);

/// Dual-solenoid inject-on-low control: a metering manifold where a
/// secondary injector must follow the primary by exactly one spacing
/// interval. This loop injects on low (pulsing when the reading drops
/// *below* the setpoint) rather than venting on high; see DESIGN.md's
/// Open Question resolution for the reasoning.
pub struct Co2Loop {
    probe: Box<dyn Co2Probe>,
    primary_relay: Box<dyn Relay>,
    secondary_relay: Box<dyn Relay>,
    setpoint: f64,
    cooldown: Duration,
    pulse: Duration,
    inter_solenoid_delay: Duration,
    gate: CooldownGate,
    primary_on: bool,
    secondary_on: bool,
    last_reading: Option<f64>,
    clock: Box<dyn Clock>,
}

impl Co2Loop {
    pub fn new(
        probe: Box<dyn Co2Probe>,
        primary_relay: Box<dyn Relay>,
        secondary_relay: Box<dyn Relay>,
        setpoint: f64,
    ) -> Self {
        Self::with_clock(
            probe,
            primary_relay,
            secondary_relay,
            setpoint,
            DEFAULT_COOLDOWN,
            DEFAULT_PULSE,
            DEFAULT_INTER_SOLENOID_DELAY,
            Box::new(SystemClock),
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn with_clock(
        probe: Box<dyn Co2Probe>,
        primary_relay: Box<dyn Relay>,
        secondary_relay: Box<dyn Relay>,
        setpoint: f64,
        cooldown: Duration,
        pulse: Duration,
        inter_solenoid_delay: Duration,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            probe,
            primary_relay,
            secondary_relay,
            setpoint,
            cooldown,
            pulse,
            inter_solenoid_delay,
            gate: CooldownGate::new(),
            primary_on: false,
            secondary_on: false,
            last_reading: None,
            clock,
        }
    }

    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }

    /// CO₂ setpoints must be strictly positive ppm.
    pub fn set_setpoint(&mut self, value: f64) -> bool {
        if value > 0.0 {
            self.setpoint = value;
            true
        } else {
            false
        }
    }

    fn set_primary(&mut self, on: bool) {
        if on != self.primary_on {
            if let Err(e) = self.primary_relay.set(on) {
                error!(error = %e, "failed to drive primary CO2 solenoid");
                return;
            }
            self.primary_on = on;
        }
    }

    fn set_secondary(&mut self, on: bool) {
        if on != self.secondary_on {
            if let Err(e) = self.secondary_relay.set(on) {
                error!(error = %e, "failed to drive secondary CO2 solenoid");
                return;
            }
            self.secondary_on = on;
        }
    }
}

#[async_trait]
impl ControlLoop for Co2Loop {
    async fn control_step(&mut self) {
        let reading = self.probe.read().await;
        self.last_reading = reading.value();

        let Reading::Value(value) = reading else {
            self.ensure_actuator_off();
            return;
        };

        if value >= self.setpoint {
            return;
        }

        let now = self.clock.now();
        if !self.gate.ready(now, self.cooldown) {
            return;
        }

        info!(value, setpoint = self.setpoint, "injecting CO2");
        self.gate.mark(now);

        self.set_primary(true);
        tokio::time::sleep(self.pulse).await;
        self.set_primary(false);

        tokio::time::sleep(self.inter_solenoid_delay).await;

        self.set_secondary(true);
        tokio::time::sleep(self.pulse).await;
        self.set_secondary(false);
    }

    fn ensure_actuator_off(&mut self) {
        self.set_primary(false);
        self.set_secondary(false);
    }

    fn reset_control(&mut self) {
        self.gate.reset();
    }

    fn get_status(&self) -> LoopStatus {
        LoopStatus::Co2(Co2Status {
            co2: self.last_reading,
            setpoint: self.setpoint,
            primary_valve_on: self.primary_on,
            secondary_valve_on: self.secondary_on,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::test_support::FakeClock;
    use incubator_hal::HalError;
    use std::sync::{Arc, Mutex};

    struct ConstantProbe(f64);
    #[async_trait]
    impl Co2Probe for ConstantProbe {
        async fn open(&mut self) -> Result<(), HalError> {
            Ok(())
        }
        async fn read(&mut self) -> Reading {
            Reading::Value(self.0)
        }
    }

    #[derive(Default, Clone)]
    struct RecordingRelay {
        events: Arc<Mutex<Vec<(&'static str, bool)>>>,
        name: &'static str,
    }
    impl Relay for RecordingRelay {
        fn set(&mut self, on: bool) -> Result<(), HalError> {
            self.events.lock().unwrap().push((self.name, on));
            Ok(())
        }
        fn is_on(&self) -> bool {
            false
        }
    }

    #[tokio::test(start_paused = true)]
    async fn sequence_primary_then_secondary_with_one_second_spacing() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let primary = RecordingRelay {
            events: events.clone(),
            name: "primary",
        };
        let secondary = RecordingRelay {
            events: events.clone(),
            name: "secondary",
        };
        let clock = Arc::new(FakeClock::new());

        let mut loop_ = Co2Loop::with_clock(
            Box::new(ConstantProbe(500.0)),
            Box::new(primary),
            Box::new(secondary),
            1000.0,
            Duration::from_secs(15),
            Duration::from_millis(100),
            Duration::from_secs(1),
            Box::new(clock.clone()),
        );

        loop_.control_step().await;

        let recorded = events.lock().unwrap().clone();
        assert_eq!(
            recorded,
            vec![
                ("primary", true),
                ("primary", false),
                ("secondary", true),
                ("secondary", false),
            ]
        );
    }

    #[tokio::test]
    async fn no_pulse_when_reading_at_or_above_setpoint() {
        let mut loop_ = Co2Loop::new(
            Box::new(ConstantProbe(1000.0)),
            Box::new(RecordingRelay::default()),
            Box::new(RecordingRelay::default()),
            1000.0,
        );
        loop_.control_step().await;
        match loop_.get_status() {
            LoopStatus::Co2(s) => {
                assert!(!s.primary_valve_on);
                assert!(!s.secondary_valve_on);
            }
            _ => unreachable!(),
        }
    }
}
