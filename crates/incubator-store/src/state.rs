use crate::StoreError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{error, warn};

/// Default setpoints applied when no persisted document exists yet.
pub const DEFAULT_TEMP_SETPOINT: f64 = 37.0;
pub const DEFAULT_HUMIDITY_SETPOINT: f64 = 60.0;
pub const DEFAULT_O2_SETPOINT: f64 = 5.0;
pub const DEFAULT_CO2_SETPOINT: f64 = 1000.0;

/// The persisted document: setpoints, enable flags, and the global run flag.
///
/// Keeping the document either fully valid or absent on restart is the job
/// of [`StateStore::save`], not of this type. This type's own job is just:
/// missing keys fall back to the defaults above (`#[serde(default)]` plus
/// [`Default`] below).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalState {
    pub temp_setpoint: f64,
    pub humidity_setpoint: f64,
    pub o2_setpoint: f64,
    pub co2_setpoint: f64,
    pub incubator_running: bool,
    pub temperature_enabled: bool,
    pub humidity_enabled: bool,
    pub o2_enabled: bool,
    pub co2_enabled: bool,
    pub air_pump_enabled: bool,
}

impl Default for GlobalState {
    fn default() -> Self {
        Self {
            temp_setpoint: DEFAULT_TEMP_SETPOINT,
            humidity_setpoint: DEFAULT_HUMIDITY_SETPOINT,
            o2_setpoint: DEFAULT_O2_SETPOINT,
            co2_setpoint: DEFAULT_CO2_SETPOINT,
            incubator_running: false,
            temperature_enabled: true,
            humidity_enabled: true,
            o2_enabled: true,
            co2_enabled: true,
            air_pump_enabled: true,
        }
    }
}

/// Loads and atomically persists a [`GlobalState`] document at a fixed path.
///
/// A single strongly-typed load function paired with a matching atomic
/// save, since this document is rewritten at runtime rather than only read
/// at startup.
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the document, falling back to defaults (and immediately
    /// re-persisting them) on any read or parse failure, including the
    /// file-absent-on-first-run case.
    pub fn load(&self) -> GlobalState {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => match serde_json::from_str::<GlobalState>(&contents) {
                Ok(state) => state,
                Err(e) => {
                    warn!(error = %e, path = %self.path.display(), "state document failed to parse, falling back to defaults");
                    let defaults = GlobalState::default();
                    self.save(&defaults);
                    defaults
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let defaults = GlobalState::default();
                self.save(&defaults);
                defaults
            }
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "state document unreadable, falling back to defaults");
                let defaults = GlobalState::default();
                self.save(&defaults);
                defaults
            }
        }
    }

    /// Atomically replaces the document: write to a sibling temp file,
    /// fsync, then rename over the real path. Never observing a
    /// half-written document depends entirely on `rename` being atomic on
    /// the target filesystem, which holds for same-directory renames on
    /// every POSIX filesystem this is expected to run on.
    ///
    /// A write failure is logged and swallowed: in-memory state stays
    /// authoritative for the remainder of the run.
    pub fn save(&self, state: &GlobalState) {
        if let Err(e) = self.try_save(state) {
            error!(error = %e, path = %self.path.display(), "failed to persist state document");
        }
    }

    fn try_save(&self, state: &GlobalState) -> Result<(), StoreError> {
        let tmp_path = self.path.with_extension("tmp");
        let json = serde_json::to_string_pretty(state)?;
        {
            let mut file = std::fs::File::create(&tmp_path)?;
            use std::io::Write;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}
