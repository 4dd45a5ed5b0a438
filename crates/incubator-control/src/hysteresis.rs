/// Symmetric-deadband bang-bang control.
///
/// Given a setpoint and a hysteresis width `H`, the actuator turns ON only
/// when the reading falls to or below `setpoint - H/2` while currently OFF,
/// and turns OFF only when the reading rises to or above `setpoint + H/2`
/// while currently ON. Readings strictly between the two thresholds never
/// change the actuator state.
#[derive(Debug, Clone, Copy)]
pub struct Hysteresis {
    setpoint: f64,
    width: f64,
}

impl Hysteresis {
    pub fn new(setpoint: f64, width: f64) -> Self {
        Self { setpoint, width }
    }

    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }

    pub fn set_setpoint(&mut self, setpoint: f64) {
        self.setpoint = setpoint;
    }

    pub fn on_threshold(&self) -> f64 {
        self.setpoint - self.width / 2.0
    }

    pub fn off_threshold(&self) -> f64 {
        self.setpoint + self.width / 2.0
    }

    /// Returns the actuator state that should follow from this reading,
    /// given its current state.
    pub fn step(&self, reading: f64, currently_on: bool) -> bool {
        if currently_on {
            reading < self.off_threshold()
        } else {
            reading <= self.on_threshold()
        }
    }
}
