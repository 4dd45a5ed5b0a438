use crate::HalError;

/// A digital actuator output.
///
/// Implementations must leave the relay in a known, OFF state as part of
/// construction — a loop should never have to guess whether a freshly
/// built relay is energized. `set`/`is_on` are synchronous: driving a GPIO
/// line never legitimately blocks, but it can still fail (a stuck driver
/// chip, an I2C-backed relay board losing its bus), hence the `Result`.
pub trait Relay: Send {
    fn set(&mut self, on: bool) -> Result<(), HalError>;

    fn is_on(&self) -> bool;

    fn off(&mut self) -> Result<(), HalError> {
        self.set(false)
    }

    fn on(&mut self) -> Result<(), HalError> {
        self.set(true)
    }
}
