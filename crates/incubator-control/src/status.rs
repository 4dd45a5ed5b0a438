use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct TemperatureStatus {
    pub ch1: Option<f64>,
    pub ch2: Option<f64>,
    pub control_value: Option<f64>,
    pub degraded: bool,
    pub setpoint: f64,
    pub heater_on: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HumidityStatus {
    pub humidity: Option<f64>,
    pub setpoint: f64,
    pub hysteresis: f64,
    pub on_threshold: f64,
    pub off_threshold: f64,
    pub humidifier_on: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct OxygenStatus {
    pub o2: Option<f64>,
    pub setpoint: f64,
    pub argon_valve_on: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Co2Status {
    pub co2: Option<f64>,
    pub setpoint: f64,
    pub primary_valve_on: bool,
    pub secondary_valve_on: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AirPumpStatus {
    pub pump_on: bool,
    pub elapsed_in_phase_s: f64,
    pub remaining_in_phase_s: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "loop", rename_all = "snake_case")]
pub enum LoopStatus {
    Temperature(TemperatureStatus),
    Humidity(HumidityStatus),
    Oxygen(OxygenStatus),
    Co2(Co2Status),
    AirPump(AirPumpStatus),
}
