use crate::{DualReading, HalError, Reading};
use async_trait::async_trait;

/// Dual-RTD temperature hub. A loop may be fed one or two channels; the
/// degraded-mode fallback when only one channel reads is implemented by
/// the loop, not the probe.
#[async_trait]
pub trait TemperatureProbe: Send {
    async fn read(&mut self) -> DualReading;
}

#[async_trait]
pub trait HumidityProbe: Send {
    async fn read(&mut self) -> Reading;
}

#[async_trait]
pub trait OxygenProbe: Send {
    async fn read(&mut self) -> Reading;
}

/// CO₂ probe. Unlike the other three, opening this probe is itself a
/// fallible multi-step protocol exchange (multiplier query, then
/// polling-mode set) and must happen before the first `read`.
#[async_trait]
pub trait Co2Probe: Send {
    async fn open(&mut self) -> Result<(), HalError>;
    async fn read(&mut self) -> Reading;
}
