//! Deterministic mock hardware for the incubator control core.
//!
//! Every probe here plays back a fixed [`scripted::Script`] of readings
//! instead of talking to real silicon, and [`relay::RecordingRelay`] records
//! every command it receives instead of driving a pin. Used by the `sim`
//! subcommand and by this workspace's scenario tests to exercise the
//! control loops deterministically without any physical sensor attached.

mod relay;
mod scripted;

pub use relay::RecordingRelay;
pub use scripted::{
    Script, ScriptedCo2Probe, ScriptedHumidityProbe, ScriptedOxygenProbe, ScriptedTemperatureProbe,
};
