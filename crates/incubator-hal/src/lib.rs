//! Hardware abstraction for the incubator control core.
//!
//! This crate defines the narrow capability each control loop consumes —
//! not a general device model. A loop asks for a `TemperatureProbe` or a
//! `Relay`, never for "the hardware"; the supervisor is the only thing that
//! knows how many physical chips back those capabilities.

mod error;
mod reading;
mod relay;
mod probes;

pub use error::HalError;
pub use reading::{DualReading, Reading};
pub use relay::Relay;
pub use probes::{Co2Probe, HumidityProbe, OxygenProbe, TemperatureProbe};
