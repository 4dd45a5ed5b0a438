//! Static configuration loader.
//!
//! One INI file, one `with_context`-wrapped `anyhow::Result` per missing
//! key, one strongly typed struct per `[section]`. This is distinct from
//! the persisted
//! [`incubator_store::GlobalState`] document — that one is the *dynamic*
//! setpoints/flags state rewritten at runtime; this one is the *static*
//! hardware/topology configuration read once at startup.

use anyhow::{Context, Result};
use configparser::ini::Ini;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thermal::SafetyLimits;

/// The `[co2]` section: the serial port the CO2 sensor is attached to.
#[derive(Debug, Clone)]
pub struct Co2SerialConfig {
    pub port: String,
    pub baud_rate: u32,
}

/// The `[temperature]` section: PID gains and the optional thermal-runaway
/// safety envelope.
#[derive(Debug, Clone)]
pub struct TemperatureConfig {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub safety_limits: Option<SafetyLimits<f64>>,
}

/// The `[humidity]` section.
#[derive(Debug, Clone)]
pub struct HumidityConfig {
    pub hysteresis_width: f64,
}

/// The `[store]` section: where the persisted state document and the
/// historian database live.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub state_path: PathBuf,
    pub historian_db_path: PathBuf,
}

/// Holds the entire parsed incubator configuration.
#[derive(Debug, Clone)]
pub struct IncubatorConfig {
    pub co2: Co2SerialConfig,
    pub temperature: TemperatureConfig,
    pub humidity: HumidityConfig,
    pub store: StoreConfig,
    /// How often the historian samples a snapshot and appends a row.
    /// Defaults to 1s, here made supervisor-configurable.
    pub log_interval: Duration,
    /// Shared tick interval for every control loop.
    pub tick_interval: Duration,
}

impl IncubatorConfig {
    /// Loads and parses the configuration file from the given path.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("Failed to load configuration file: {:?}", path))?;

        let co2 = Co2SerialConfig {
            port: config
                .get("co2", "serial_port")
                .context("[co2] serial_port not found")?,
            baud_rate: config
                .getuint("co2", "baud_rate")
                .context("[co2] baud_rate not found")?
                .unwrap_or(9600) as u32,
        };

        let safety_limits = if config
            .getbool("temperature", "safety_enabled")
            .unwrap_or(Some(false))
            .unwrap_or(false)
        {
            Some(SafetyLimits {
                max_temp: config
                    .getfloat("temperature", "safety_max_temp")
                    .context("[temperature] safety_max_temp not found")?
                    .context("[temperature] safety_max_temp not found")?,
                min_heat_gain_temp: config
                    .getfloat("temperature", "safety_min_heat_gain_temp")
                    .context("[temperature] safety_min_heat_gain_temp not found")?
                    .context("[temperature] safety_min_heat_gain_temp not found")?,
                min_heat_gain_time_s: config
                    .getfloat("temperature", "safety_min_heat_gain_time_s")
                    .context("[temperature] safety_min_heat_gain_time_s not found")?
                    .context("[temperature] safety_min_heat_gain_time_s not found")?,
                max_deviation: config
                    .getfloat("temperature", "safety_max_deviation")
                    .context("[temperature] safety_max_deviation not found")?
                    .context("[temperature] safety_max_deviation not found")?,
            })
        } else {
            None
        };

        let temperature = TemperatureConfig {
            kp: config
                .getfloat("temperature", "kp")
                .context("[temperature] kp not found")?
                .context("[temperature] kp not found")?,
            ki: config
                .getfloat("temperature", "ki")
                .context("[temperature] ki not found")?
                .context("[temperature] ki not found")?,
            kd: config
                .getfloat("temperature", "kd")
                .context("[temperature] kd not found")?
                .context("[temperature] kd not found")?,
            safety_limits,
        };

        let humidity = HumidityConfig {
            hysteresis_width: config
                .getfloat("humidity", "hysteresis_width")
                .context("[humidity] hysteresis_width not found")?
                .context("[humidity] hysteresis_width not found")?,
        };

        let store = StoreConfig {
            state_path: config
                .get("store", "state_path")
                .context("[store] state_path not found")?
                .into(),
            historian_db_path: config
                .get("store", "historian_db_path")
                .context("[store] historian_db_path not found")?
                .into(),
        };

        let log_interval_s = config
            .getfloat("logging", "interval_s")
            .unwrap_or(Some(1.0))
            .unwrap_or(1.0);
        let tick_interval_s = config
            .getfloat("supervisor", "tick_interval_s")
            .unwrap_or(Some(1.0))
            .unwrap_or(1.0);

        Ok(Self {
            co2,
            temperature,
            humidity,
            store,
            log_interval: Duration::from_secs_f64(log_interval_s),
            tick_interval: Duration::from_secs_f64(tick_interval_s),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_a_minimal_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("incubator.cfg");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[co2]\nserial_port = /dev/ttyUSB0\nbaud_rate = 9600\n\n\
             [temperature]\nkp = 5.0\nki = 0.1\nkd = 0.0\n\n\
             [humidity]\nhysteresis_width = 4.0\n\n\
             [store]\nstate_path = /tmp/incubator/state.json\nhistorian_db_path = /tmp/incubator/history.db\n"
        )
        .unwrap();

        let cfg = IncubatorConfig::load(&path).unwrap();
        assert_eq!(cfg.co2.port, "/dev/ttyUSB0");
        assert_eq!(cfg.co2.baud_rate, 9600);
        assert_eq!(cfg.temperature.kp, 5.0);
        assert!(cfg.temperature.safety_limits.is_none());
        assert_eq!(cfg.log_interval, Duration::from_secs(1));
    }
}
