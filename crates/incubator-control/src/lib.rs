//! The five periodic control loops and the generic scheduler that runs
//! them under a supervisor-owned gate.

pub mod air_pump;
mod clock;
pub mod co2;
mod dutycycle;
mod flags;
mod hysteresis;
mod loop_skeleton;
pub mod humidity;
pub mod oxygen;
mod pulse;
mod setpoint_sync;
pub mod status;
mod status_publisher;
pub mod temperature;

pub use air_pump::AirPumpLoop;
pub use clock::{Clock, SystemClock};
pub use co2::Co2Loop;
pub use dutycycle::{DutyCycleTimer, Phase};
pub use flags::{ControlFlags, LoopKind, SupervisorFlags};
pub use humidity::HumidityLoop;
pub use hysteresis::Hysteresis;
pub use loop_skeleton::{run_loop, run_loop_with_fault, ControlLoop, LoopFault};
pub use oxygen::OxygenLoop;
pub use pulse::CooldownGate;
pub use setpoint_sync::{HasSetpoint, SetpointSynced};
pub use status::LoopStatus;
pub use status_publisher::StatusPublisher;
pub use temperature::TemperatureLoop;
