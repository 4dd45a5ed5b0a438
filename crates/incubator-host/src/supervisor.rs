//! The control core's supervisor: owns the HAL, constructs the five loops,
//! loads and persists [`GlobalState`], and starts/stops the loop tasks plus
//! the historian-sampling task.
//!
//! One `Arc`/`watch`-shared flags-and-setpoints state, one task per
//! concurrent concern (one per loop, plus the historian sampler), and a
//! single bounded shutdown sequence that cancels every task and waits for
//! it to finish.

use crate::config::IncubatorConfig;
use crate::error::{FacadeError, SupervisorError};
use crate::hal::HalBundle;
use crate::snapshot::{
    actuator_commanded_on, as_air_pump, as_co2, as_humidity, as_oxygen, as_temperature, Snapshot,
};
use incubator_control::status::LoopStatus;
use incubator_control::{
    humidity, oxygen, temperature, AirPumpLoop, Co2Loop, ControlFlags, HumidityLoop, LoopFault,
    LoopKind, OxygenLoop, SetpointSynced, StatusPublisher, SupervisorFlags, TemperatureLoop,
};
use incubator_store::{Historian, Sample, StateStore};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// The five loop identifiers the external control surface names.
pub const LOOP_NAMES: [&str; 5] = ["temperature", "humidity", "o2", "co2", "air_pump"];

/// Owns the HAL and static configuration before any task has started.
///
/// Split from [`SupervisorHandle`] so that construction can fail (opening
/// the CO2 probe, opening the historian database) while running cannot —
/// by the time `run` is called every fallible step is already behind it.
pub struct Supervisor {
    tick_interval: Duration,
    log_interval: Duration,
    temperature_cfg: crate::config::TemperatureConfig,
    humidity_cfg: crate::config::HumidityConfig,
    hal: HalBundle,
    state_store: StateStore,
    historian: Historian,
}

impl Supervisor {
    /// Opens the CO2 probe's init sequence and the historian database.
    /// Everything else (loop construction, state load/apply) happens in
    /// [`Supervisor::run`], which cannot fail.
    pub async fn new(cfg: &IncubatorConfig, mut hal: HalBundle) -> Result<Self, SupervisorError> {
        hal.co2_probe.open().await?;
        let historian = Historian::open(cfg.store.historian_db_path.clone()).await?;
        let state_store = StateStore::new(cfg.store.state_path.clone());

        Ok(Self {
            tick_interval: cfg.tick_interval,
            log_interval: cfg.log_interval,
            temperature_cfg: cfg.temperature.clone(),
            humidity_cfg: cfg.humidity.clone(),
            hal,
            state_store,
            historian,
        })
    }

    /// Loads persisted state (load-then-apply, no forced override of
    /// `incubator_running` — see DESIGN.md's Open Question decision),
    /// constructs the five loops with it, and starts every loop task plus
    /// the historian-sampling task.
    pub fn run(self) -> SupervisorHandle {
        let state = self.state_store.load();
        info!(?state, "applying persisted state at startup");

        let flags_tx = watch::channel(SupervisorFlags {
            global_run: state.incubator_running,
            temperature_enabled: state.temperature_enabled,
            humidity_enabled: state.humidity_enabled,
            o2_enabled: state.o2_enabled,
            co2_enabled: state.co2_enabled,
            air_pump_enabled: state.air_pump_enabled,
        })
        .0;

        let (temp_sp_tx, temp_sp_rx) = watch::channel(state.temp_setpoint);
        let (humidity_sp_tx, humidity_sp_rx) = watch::channel(state.humidity_setpoint);
        let (o2_sp_tx, o2_sp_rx) = watch::channel(state.o2_setpoint);
        let (co2_sp_tx, co2_sp_rx) = watch::channel(state.co2_setpoint);

        let temperature_status = Arc::new(Mutex::new(LoopStatus::Temperature(
            incubator_control::status::TemperatureStatus {
                ch1: None,
                ch2: None,
                control_value: None,
                degraded: false,
                setpoint: state.temp_setpoint,
                heater_on: false,
            },
        )));
        let humidity_status = Arc::new(Mutex::new(LoopStatus::Humidity(
            incubator_control::status::HumidityStatus {
                humidity: None,
                setpoint: state.humidity_setpoint,
                hysteresis: self.humidity_cfg.hysteresis_width,
                on_threshold: state.humidity_setpoint - self.humidity_cfg.hysteresis_width / 2.0,
                off_threshold: state.humidity_setpoint + self.humidity_cfg.hysteresis_width / 2.0,
                humidifier_on: false,
            },
        )));
        let oxygen_status = Arc::new(Mutex::new(LoopStatus::Oxygen(
            incubator_control::status::OxygenStatus {
                o2: None,
                setpoint: state.o2_setpoint,
                argon_valve_on: false,
            },
        )));
        let co2_status = Arc::new(Mutex::new(LoopStatus::Co2(
            incubator_control::status::Co2Status {
                co2: None,
                setpoint: state.co2_setpoint,
                primary_valve_on: false,
                secondary_valve_on: false,
            },
        )));
        let air_pump_status = Arc::new(Mutex::new(LoopStatus::AirPump(
            incubator_control::status::AirPumpStatus {
                pump_on: false,
                elapsed_in_phase_s: 0.0,
                remaining_in_phase_s: 0.0,
            },
        )));

        let statuses = Statuses {
            temperature: temperature_status.clone(),
            humidity: humidity_status.clone(),
            oxygen: oxygen_status.clone(),
            co2: co2_status.clone(),
            air_pump: air_pump_status.clone(),
        };

        let faults = Faults {
            temperature: Arc::new(AtomicBool::new(false)),
            humidity: Arc::new(AtomicBool::new(false)),
            oxygen: Arc::new(AtomicBool::new(false)),
            co2: Arc::new(AtomicBool::new(false)),
            air_pump: Arc::new(AtomicBool::new(false)),
        };

        let HalBundle {
            temperature_probe,
            humidity_probe,
            oxygen_probe,
            co2_probe,
            heater_relay,
            humidifier_relay,
            argon_relay,
            co2_primary_relay,
            co2_secondary_relay,
            air_pump_relay,
        } = self.hal;

        let dt_s = self.tick_interval.as_secs_f64();
        let temperature_loop = TemperatureLoop::new(
            temperature_probe,
            heater_relay,
            self.temperature_cfg.kp,
            self.temperature_cfg.ki,
            self.temperature_cfg.kd,
            state.temp_setpoint,
            dt_s,
            self.temperature_cfg.safety_limits.clone(),
        );
        let humidity_loop = HumidityLoop::new(
            humidity_probe,
            humidifier_relay,
            state.humidity_setpoint,
            self.humidity_cfg.hysteresis_width,
        );
        let oxygen_loop = OxygenLoop::new(oxygen_probe, argon_relay, state.o2_setpoint);
        let co2_loop = Co2Loop::new(co2_probe, co2_primary_relay, co2_secondary_relay, state.co2_setpoint);
        let air_pump_loop = AirPumpLoop::new(air_pump_relay);

        let temperature_loop = StatusPublisher::new(
            SetpointSynced::new(temperature_loop, temp_sp_rx),
            temperature_status,
        );
        let humidity_loop = StatusPublisher::new(
            SetpointSynced::new(humidity_loop, humidity_sp_rx),
            humidity_status,
        );
        let oxygen_loop =
            StatusPublisher::new(SetpointSynced::new(oxygen_loop, o2_sp_rx), oxygen_status);
        let co2_loop = StatusPublisher::new(SetpointSynced::new(co2_loop, co2_sp_rx), co2_status);
        let air_pump_loop = StatusPublisher::new(air_pump_loop, air_pump_status);

        let mut tasks = Vec::new();
        tasks.push(spawn_loop(
            temperature_loop,
            &flags_tx,
            LoopKind::Temperature,
            "temperature",
            self.tick_interval,
            faults.temperature.clone(),
        ));
        tasks.push(spawn_loop(
            humidity_loop,
            &flags_tx,
            LoopKind::Humidity,
            "humidity",
            self.tick_interval,
            faults.humidity.clone(),
        ));
        tasks.push(spawn_loop(
            oxygen_loop,
            &flags_tx,
            LoopKind::Oxygen,
            "o2",
            self.tick_interval,
            faults.oxygen.clone(),
        ));
        tasks.push(spawn_loop(
            co2_loop,
            &flags_tx,
            LoopKind::Co2,
            "co2",
            self.tick_interval,
            faults.co2.clone(),
        ));
        tasks.push(spawn_loop(
            air_pump_loop,
            &flags_tx,
            LoopKind::AirPump,
            "air_pump",
            self.tick_interval,
            faults.air_pump.clone(),
        ));

        let historian = self.historian;
        let historian_cancel = CancellationToken::new();
        let historian_task = spawn_historian_task(
            historian.clone(),
            statuses.clone(),
            SetpointsSnapshot {
                temp: temp_sp_tx.subscribe(),
                humidity: humidity_sp_tx.subscribe(),
                o2: o2_sp_tx.subscribe(),
                co2: co2_sp_tx.subscribe(),
            },
            self.log_interval,
            historian_cancel.clone(),
        );

        SupervisorHandle {
            flags_tx,
            setpoints: Setpoints {
                temp: temp_sp_tx,
                humidity: humidity_sp_tx,
                o2: o2_sp_tx,
                co2: co2_sp_tx,
            },
            statuses,
            faults,
            live_state: Arc::new(Mutex::new(state)),
            state_store: self.state_store,
            historian,
            tick_interval: self.tick_interval,
            tasks,
            historian_task: Some((historian_task, historian_cancel)),
        }
    }
}

#[derive(Clone)]
struct Statuses {
    temperature: Arc<Mutex<LoopStatus>>,
    humidity: Arc<Mutex<LoopStatus>>,
    oxygen: Arc<Mutex<LoopStatus>>,
    co2: Arc<Mutex<LoopStatus>>,
    air_pump: Arc<Mutex<LoopStatus>>,
}

impl Statuses {
    fn get(&self, loop_name: &str) -> Option<&Arc<Mutex<LoopStatus>>> {
        match loop_name {
            "temperature" => Some(&self.temperature),
            "humidity" => Some(&self.humidity),
            "o2" => Some(&self.oxygen),
            "co2" => Some(&self.co2),
            "air_pump" => Some(&self.air_pump),
            _ => None,
        }
    }
}

struct Faults {
    temperature: LoopFault,
    humidity: LoopFault,
    oxygen: LoopFault,
    co2: LoopFault,
    air_pump: LoopFault,
}

impl Faults {
    fn snapshot(&self) -> Vec<&'static str> {
        let mut faulted = Vec::new();
        if self.temperature.load(Ordering::SeqCst) {
            faulted.push("temperature");
        }
        if self.humidity.load(Ordering::SeqCst) {
            faulted.push("humidity");
        }
        if self.oxygen.load(Ordering::SeqCst) {
            faulted.push("o2");
        }
        if self.co2.load(Ordering::SeqCst) {
            faulted.push("co2");
        }
        if self.air_pump.load(Ordering::SeqCst) {
            faulted.push("air_pump");
        }
        faulted
    }
}

struct Setpoints {
    temp: watch::Sender<f64>,
    humidity: watch::Sender<f64>,
    o2: watch::Sender<f64>,
    co2: watch::Sender<f64>,
}

struct SetpointsSnapshot {
    temp: watch::Receiver<f64>,
    humidity: watch::Receiver<f64>,
    o2: watch::Receiver<f64>,
    co2: watch::Receiver<f64>,
}

struct LoopTask {
    name: &'static str,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

fn spawn_loop<L>(
    control: L,
    flags_tx: &watch::Sender<SupervisorFlags>,
    kind: LoopKind,
    name: &'static str,
    tick_interval: Duration,
    fault: LoopFault,
) -> LoopTask
where
    L: incubator_control::ControlLoop + 'static,
{
    let flags = ControlFlags::new(flags_tx.subscribe(), kind);
    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    let handle = tokio::spawn(incubator_control::run_loop_with_fault(
        control,
        flags,
        name,
        tick_interval,
        cancel_clone,
        Some(fault),
    ));
    LoopTask {
        name,
        cancel,
        handle,
    }
}

fn spawn_historian_task(
    historian: Historian,
    statuses: Statuses,
    mut setpoints: SetpointsSnapshot,
    log_interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(log_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = cancel.cancelled() => {
                    info!("historian sampling task stopped");
                    return;
                }
            }

            let temperature = as_temperature(&statuses.temperature.lock());
            let humidity = as_humidity(&statuses.humidity.lock());
            let oxygen = as_oxygen(&statuses.oxygen.lock());
            let co2 = as_co2(&statuses.co2.lock());

            let timestamp = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs_f64();

            let sample = Sample {
                timestamp,
                temperature_avg: temperature.control_value,
                temperature_ch1: temperature.ch1,
                temperature_ch2: temperature.ch2,
                humidity: humidity.humidity,
                o2: oxygen.o2,
                co2: co2.co2,
                temp_setpoint: *setpoints.temp.borrow_and_update(),
                humidity_setpoint: *setpoints.humidity.borrow_and_update(),
                o2_setpoint: *setpoints.o2.borrow_and_update(),
                co2_setpoint: *setpoints.co2.borrow_and_update(),
            };

            if let Err(e) = historian.append(sample).await {
                warn!(error = %e, "failed to append historian sample");
            }
        }
    })
}

/// The live, running supervisor. Everything fallible already happened in
/// [`Supervisor::new`]; every method here either cannot fail or reports a
/// [`FacadeError`] for its documented boundary conditions.
pub struct SupervisorHandle {
    flags_tx: watch::Sender<SupervisorFlags>,
    setpoints: Setpoints,
    statuses: Statuses,
    faults: Faults,
    live_state: Arc<Mutex<incubator_store::GlobalState>>,
    state_store: StateStore,
    historian: Historian,
    tick_interval: Duration,
    tasks: Vec<LoopTask>,
    historian_task: Option<(JoinHandle<()>, CancellationToken)>,
}

impl SupervisorHandle {
    /// Non-blocking: returns the latest known values without forcing fresh
    /// I/O.
    pub fn get_snapshot(&self) -> Snapshot {
        Snapshot {
            flags: *self.flags_tx.borrow(),
            temperature: as_temperature(&self.statuses.temperature.lock()),
            humidity: as_humidity(&self.statuses.humidity.lock()),
            oxygen: as_oxygen(&self.statuses.oxygen.lock()),
            co2: as_co2(&self.statuses.co2.lock()),
            air_pump: as_air_pump(&self.statuses.air_pump.lock()),
            faulted_loops: self.faults.snapshot(),
        }
    }

    pub fn historian(&self) -> &Historian {
        &self.historian
    }

    /// Validates each setpoint against its loop's domain, applies only the
    /// ones that actually differ from the current value, and persists the
    /// full state document iff at least one changed.
    pub fn update_setpoints(
        &self,
        updates: HashMap<String, f64>,
    ) -> HashMap<String, Result<f64, FacadeError>> {
        let mut results = HashMap::new();
        let mut any_changed = false;

        for (key, value) in updates {
            let outcome = self.apply_one_setpoint(&key, value, &mut any_changed);
            results.insert(key, outcome);
        }

        if any_changed {
            self.state_store.save(&self.live_state.lock().clone());
        }
        results
    }

    fn apply_one_setpoint(
        &self,
        key: &str,
        value: f64,
        any_changed: &mut bool,
    ) -> Result<f64, FacadeError> {
        let (valid, tx, field_setter): (bool, &watch::Sender<f64>, fn(&mut incubator_store::GlobalState, f64)) =
            match key {
                "temp_setpoint" => (
                    temperature::SETPOINT_RANGE.contains(&value),
                    &self.setpoints.temp,
                    |s, v| s.temp_setpoint = v,
                ),
                "humidity_setpoint" => (
                    humidity::SETPOINT_RANGE.contains(&value),
                    &self.setpoints.humidity,
                    |s, v| s.humidity_setpoint = v,
                ),
                "o2_setpoint" => (
                    oxygen::SETPOINT_RANGE.contains(&value),
                    &self.setpoints.o2,
                    |s, v| s.o2_setpoint = v,
                ),
                "co2_setpoint" => (value > 0.0, &self.setpoints.co2, |s, v| s.co2_setpoint = v),
                other => {
                    return Err(FacadeError::NotFound {
                        loop_name: other.to_string(),
                    })
                }
            };

        if !valid {
            return Err(FacadeError::BadRequest {
                key: key.to_string(),
            });
        }

        let mut state = self.live_state.lock();
        let current = *tx.borrow();
        if (current - value).abs() > f64::EPSILON {
            tx.send(value).ok();
            field_setter(&mut state, value);
            *any_changed = true;
        }
        Ok(value)
    }

    /// Flips a loop's enable flag. Disabling forces that loop's actuator off
    /// (the gate-change wakeup in `run_loop` forces it within one
    /// scheduling opportunity, not a full tick) and this call waits, up to
    /// twice the tick interval, for that to be confirmed before returning —
    /// as close to "synchronous" as the owned-relay concurrency model
    /// allows, since the supervisor cannot flip a loop's relay itself.
    pub async fn set_enabled(&self, loop_name: &str, enabled: bool) -> Result<(), FacadeError> {
        if !LOOP_NAMES.contains(&loop_name) {
            return Err(FacadeError::NotFound {
                loop_name: loop_name.to_string(),
            });
        }

        let changed = {
            let mut state = self.live_state.lock();
            let field = enabled_field(&mut state, loop_name);
            if *field == enabled {
                false
            } else {
                *field = enabled;
                true
            }
        };

        if changed {
            self.flags_tx.send_modify(|f| set_enabled_flag(f, loop_name, enabled));
            self.state_store.save(&self.live_state.lock().clone());
            if !enabled {
                self.wait_actuator_off(loop_name).await;
            }
        }
        Ok(())
    }

    /// Flips the global run flag; on `false`, waits (bounded) for every
    /// loop to confirm its actuator off before returning.
    pub async fn set_global_running(&self, running: bool) {
        let changed = {
            let mut state = self.live_state.lock();
            if state.incubator_running == running {
                false
            } else {
                state.incubator_running = running;
                true
            }
        };

        self.flags_tx.send_modify(|f| f.global_run = running);

        if changed {
            self.state_store.save(&self.live_state.lock().clone());
        }

        if !running {
            for name in LOOP_NAMES {
                self.wait_actuator_off(name).await;
            }
        }
    }

    async fn wait_actuator_off(&self, loop_name: &str) {
        let Some(status) = self.statuses.get(loop_name) else {
            return;
        };
        let deadline = Instant::now() + self.tick_interval * 2;
        loop {
            if !actuator_commanded_on(&status.lock()) {
                return;
            }
            if Instant::now() >= deadline {
                warn!(loop_name, "actuator-off not confirmed within the wait budget");
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Forces every actuator off, cancels every task, awaits completion
    /// with a bounded timeout, and drops the HAL/historian handles.
    pub async fn shutdown(mut self) {
        info!("supervisor shutdown requested");
        self.flags_tx.send_modify(|f| {
            f.global_run = false;
        });

        for name in LOOP_NAMES {
            self.wait_actuator_off(name).await;
        }

        let shutdown_budget = self.tick_interval * 4 + Duration::from_secs(1);
        for task in self.tasks.drain(..) {
            task.cancel.cancel();
            match tokio::time::timeout(shutdown_budget, task.handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(loop_name = task.name, error = %e, "loop task join error"),
                Err(_) => error!(loop_name = task.name, "loop task did not stop within the shutdown budget"),
            }
        }

        if let Some((handle, cancel)) = self.historian_task.take() {
            cancel.cancel();
            if let Err(e) = tokio::time::timeout(shutdown_budget, handle).await {
                error!(error = %e, "historian task did not stop within the shutdown budget");
            }
        }

        info!("supervisor shutdown complete");
    }
}

fn enabled_field<'a>(state: &'a mut incubator_store::GlobalState, loop_name: &str) -> &'a mut bool {
    match loop_name {
        "temperature" => &mut state.temperature_enabled,
        "humidity" => &mut state.humidity_enabled,
        "o2" => &mut state.o2_enabled,
        "co2" => &mut state.co2_enabled,
        "air_pump" => &mut state.air_pump_enabled,
        _ => unreachable!("loop_name validated against LOOP_NAMES by the caller"),
    }
}

fn set_enabled_flag(flags: &mut SupervisorFlags, loop_name: &str, value: bool) {
    match loop_name {
        "temperature" => flags.temperature_enabled = value,
        "humidity" => flags.humidity_enabled = value,
        "o2" => flags.o2_enabled = value,
        "co2" => flags.co2_enabled = value,
        "air_pump" => flags.air_pump_enabled = value,
        _ => unreachable!("loop_name validated against LOOP_NAMES by the caller"),
    }
}
