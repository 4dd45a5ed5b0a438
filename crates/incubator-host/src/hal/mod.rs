//! Concrete HAL wiring.
//!
//! The CO2 sensor's serial wire protocol is fully specified, so
//! [`co2_serial::SerialCo2Probe`] is a complete, real implementation.
//! Temperature/humidity/oxygen probes and every relay are chip- and
//! pin-specific (an RTD hub reached over SPI, a humidity/O2 chip over I2C,
//! relays as plain GPIO lines) and out of scope for this workspace, so
//! [`HalBundle`] takes them as trait objects supplied by the caller. The
//! `sim` binary subcommand
//! fills every slot from `incubator-sim`; the `run` subcommand fills only
//! the CO2 slot with [`co2_serial::SerialCo2Probe`] and falls back to
//! `incubator-sim`'s scripted stand-ins for the rest, since this workspace
//! has no concrete chip driver to wire in.

pub mod co2_serial;

use incubator_hal::{Co2Probe, HumidityProbe, OxygenProbe, Relay, TemperatureProbe};

/// Every HAL handle the five control loops need, bundled so
/// `Supervisor::new` can hand one out to each loop without the caller
/// having to know which loop owns which handle.
pub struct HalBundle {
    pub temperature_probe: Box<dyn TemperatureProbe>,
    pub humidity_probe: Box<dyn HumidityProbe>,
    pub oxygen_probe: Box<dyn OxygenProbe>,
    pub co2_probe: Box<dyn Co2Probe>,
    pub heater_relay: Box<dyn Relay>,
    pub humidifier_relay: Box<dyn Relay>,
    pub argon_relay: Box<dyn Relay>,
    pub co2_primary_relay: Box<dyn Relay>,
    pub co2_secondary_relay: Box<dyn Relay>,
    pub air_pump_relay: Box<dyn Relay>,
}
