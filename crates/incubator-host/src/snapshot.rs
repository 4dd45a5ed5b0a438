//! The flat, serializable view of the supervisor's current state.
//!
//! Everything `get_snapshot()` returns is a point-in-time copy assembled
//! from data other tasks already publish — nothing here triggers fresh
//! sensor I/O.

use incubator_control::status::{
    AirPumpStatus, Co2Status, HumidityStatus, LoopStatus, OxygenStatus, TemperatureStatus,
};
use incubator_control::SupervisorFlags;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub flags: SupervisorFlags,
    pub temperature: TemperatureStatus,
    pub humidity: HumidityStatus,
    pub oxygen: OxygenStatus,
    pub co2: Co2Status,
    pub air_pump: AirPumpStatus,
    /// Loops whose task hit an unexpected lifecycle fault (e.g. a panic
    /// inside `control_step`) since the last time the supervisor was asked
    /// to clear it. Empty in the overwhelming common case.
    pub faulted_loops: Vec<&'static str>,
}

/// Whether the status's own actuator field reports "energized". Used by the
/// supervisor to confirm the defence-in-depth off-command actually landed
/// before `set_enabled`/`set_global_running` return.
pub(crate) fn actuator_commanded_on(status: &LoopStatus) -> bool {
    match status {
        LoopStatus::Temperature(s) => s.heater_on,
        LoopStatus::Humidity(s) => s.humidifier_on,
        LoopStatus::Oxygen(s) => s.argon_valve_on,
        LoopStatus::Co2(s) => s.primary_valve_on || s.secondary_valve_on,
        LoopStatus::AirPump(s) => s.pump_on,
    }
}

pub(crate) fn as_temperature(status: &LoopStatus) -> TemperatureStatus {
    match status {
        LoopStatus::Temperature(s) => s.clone(),
        _ => unreachable!("temperature slot always holds a TemperatureStatus"),
    }
}

pub(crate) fn as_humidity(status: &LoopStatus) -> HumidityStatus {
    match status {
        LoopStatus::Humidity(s) => s.clone(),
        _ => unreachable!("humidity slot always holds a HumidityStatus"),
    }
}

pub(crate) fn as_oxygen(status: &LoopStatus) -> OxygenStatus {
    match status {
        LoopStatus::Oxygen(s) => s.clone(),
        _ => unreachable!("oxygen slot always holds an OxygenStatus"),
    }
}

pub(crate) fn as_co2(status: &LoopStatus) -> Co2Status {
    match status {
        LoopStatus::Co2(s) => s.clone(),
        _ => unreachable!("co2 slot always holds a Co2Status"),
    }
}

pub(crate) fn as_air_pump(status: &LoopStatus) -> AirPumpStatus {
    match status {
        LoopStatus::AirPump(s) => s.clone(),
        _ => unreachable!("air_pump slot always holds an AirPumpStatus"),
    }
}
