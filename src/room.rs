//! Per-room device controller.
//!
//! Owns the room's capability state and orchestrates generation-correct
//! vendor calls on poll ticks and user actions. Built by composition: the
//! client handle, resolver, capability bag, settings and interval manager
//! are plain members, not base classes.

use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::capabilities::{Capabilities, CapabilityValue};
use crate::client::TadoClient;
use crate::control::DEFAULT_BOOST_SECONDS;
use crate::error::{Error, Result};
use crate::generation::GenerationResolver;
use crate::intervals::{IntervalManager, IntervalSpec};
use crate::migrations::MigrationLog;
use crate::models::{HomeId, RoomId};
use crate::store::{DeviceStore, SettingsStore};
use crate::types::{Generation, Termination};

const ROOM_STATE_TIMER: &str = "ROOM_STATE";
const EARLY_START_TIMER: &str = "EARLY_START";

/// Set-points below this turn the room off instead.
const OFF_THRESHOLD_CELSIUS: f64 = 5.0;

pub struct RoomDevice {
    home: HomeId,
    room: RoomId,
    client: Arc<TadoClient>,
    resolver: GenerationResolver,
    caps: Capabilities,
    settings: Arc<dyn SettingsStore>,
    intervals: Mutex<Option<Arc<IntervalManager>>>,
}

impl RoomDevice {
    pub fn new(
        client: Arc<TadoClient>,
        home: HomeId,
        room: RoomId,
        device_store: Arc<dyn DeviceStore>,
        settings: Arc<dyn SettingsStore>,
    ) -> Arc<Self> {
        let caps = Capabilities::new();
        for cap in [
            "onoff",
            "target_temperature",
            "measure_temperature",
            "measure_humidity",
            "tado_presence_mode",
            "tado_resume_schedule",
            "button.restart_polling",
        ] {
            caps.add(cap);
        }
        caps.set_number_bounds("target_temperature", 5.0, 25.0);

        Arc::new(Self {
            home,
            room,
            client,
            resolver: GenerationResolver::new(home, device_store),
            caps,
            settings,
            intervals: Mutex::new(None),
        })
    }

    /// Device-init lifecycle hook: migrate, then start polling.
    pub async fn init(self: &Arc<Self>) {
        self.migrate().await;

        let manager = IntervalManager::new(self.interval_specs(), Arc::clone(&self.settings));
        manager.start();
        if self.caps.has("onoff.early_start") {
            manager.start_one(EARLY_START_TIMER);
        }
        *self.intervals.lock().unwrap() = Some(manager);
    }

    /// Device-uninit lifecycle hook.
    pub fn uninit(&self) {
        if let Some(manager) = self.intervals.lock().unwrap().take() {
            manager.stop();
        }
    }

    /// Settings-changed lifecycle hook; restarts affected timers after the
    /// manager's debounce.
    pub fn on_settings_changed(&self, changed_keys: &[String]) {
        if let Some(manager) = self.manager() {
            manager.restart_by_settings(changed_keys);
        }
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    fn manager(&self) -> Option<Arc<IntervalManager>> {
        self.intervals.lock().unwrap().clone()
    }

    fn interval_specs(self: &Arc<Self>) -> Vec<IntervalSpec> {
        let dev = Arc::downgrade(self);
        let room_state = IntervalSpec::new(ROOM_STATE_TIMER, move || {
            let dev = dev.clone();
            Box::pin(async move {
                let Some(dev) = dev.upgrade() else { return };
                if let Err(e) = dev.sync_room_state().await {
                    warn!(room = %dev.room, error = %e, "failed to sync room state");
                }
            })
        })
        .setting("room_state_polling_interval");

        let dev = Arc::downgrade(self);
        let early_start = IntervalSpec::new(EARLY_START_TIMER, move || {
            let dev = dev.clone();
            Box::pin(async move {
                let Some(dev) = dev.upgrade() else { return };
                if let Err(e) = dev.sync_early_start().await {
                    warn!(room = %dev.room, error = %e, "failed to sync early start");
                }
            })
        })
        .setting("early_start_polling_interval")
        .manual_start();

        vec![room_state, early_start]
    }

    async fn migrate(&self) {
        // Capabilities added after first release; safe to re-add.
        for cap in [
            "tado_boost_heating",
            "tado_heating_power",
            "onoff.smart_schedule",
            "alarm_open_window_detected",
        ] {
            self.caps.add(cap);
        }

        let log = MigrationLog::new(Arc::clone(&self.settings), "room");
        log.apply("generation-backfill", || async {
            match self.resolver.resolve(&self.client).await {
                Generation::Unknown => Err(Error::GenerationUnresolved),
                _ => Ok(()),
            }
        })
        .await;

        // Early start and the extended set-point range depend on the
        // resolved generation; reconciled on every start.
        match self.resolver.resolve(&self.client).await {
            Generation::Current => {
                self.caps.remove("onoff.early_start");
                self.caps.set_number_bounds("target_temperature", 5.0, 30.0);
            }
            Generation::Legacy => self.caps.add("onoff.early_start"),
            Generation::Unknown => {}
        }
    }

    // -- Interval handlers --

    /// Fetches a fresh snapshot and projects it onto the capability set.
    /// Fields keep their last good value when the fetch fails.
    pub async fn sync_room_state(&self) -> Result<()> {
        let control = self.resolver.control(&self.client).await?;
        let snap = control.room_snapshot(self.room).await?;

        self.caps.set("measure_humidity", snap.humidity)?;
        self.caps.set("measure_temperature", snap.measured_temperature)?;
        if let Some(presence) = snap.presence {
            self.caps.set("tado_presence_mode", presence.as_str())?;
        }
        self.caps.set("onoff.smart_schedule", snap.smart_schedule)?;
        self.caps.set("alarm_open_window_detected", snap.open_window)?;
        self.caps.set("onoff", snap.power_on)?;

        // A room reported off with no set-point keeps showing its last
        // known set-point.
        if snap.target_temperature.is_some() || snap.power_on {
            self.caps
                .set("target_temperature", snap.target_temperature.unwrap_or(5.0))?;
        }
        if let Some(heating_power) = snap.heating_power {
            self.caps.set("tado_heating_power", heating_power)?;
        }
        Ok(())
    }

    pub async fn sync_early_start(&self) -> Result<()> {
        let control = self.resolver.control(&self.client).await?;
        if let Some(enabled) = control.early_start(self.room).await?
            && self.caps.has("onoff.early_start")
        {
            self.caps.set("onoff.early_start", enabled)?;
        }
        Ok(())
    }

    // -- User actions --

    pub async fn set_target_temperature(&self, value: f64) -> Result<()> {
        self.write_target_temperature(value, Termination::Auto).await
    }

    async fn write_target_temperature(&self, value: f64, termination: Termination) -> Result<()> {
        let is_off = value < OFF_THRESHOLD_CELSIUS;
        let previous = self.caps.get("target_temperature");

        let control = self.resolver.control(&self.client).await?;
        match control.set_room_temperature(self.room, value, termination).await {
            Ok(()) => {
                // Turning off must not move the displayed set-point.
                if is_off {
                    self.caps.restore("target_temperature", previous);
                } else {
                    self.caps.set("target_temperature", value.max(0.0))?;
                }
                self.caps.set("onoff", !is_off)?;
                Ok(())
            }
            Err(e) => {
                self.caps.restore("target_temperature", previous);
                Err(e)
            }
        }
    }

    pub async fn set_on_off(&self, on: bool) -> Result<()> {
        if on {
            self.resume_schedule().await
        } else {
            self.write_target_temperature(0.0, Termination::Manual).await
        }
    }

    pub async fn resume_schedule(&self) -> Result<()> {
        let control = self.resolver.control(&self.client).await?;
        control.resume_schedule(Some(self.room)).await?;
        self.caps.set("onoff.smart_schedule", true)?;
        Ok(())
    }

    pub async fn boost_heating(&self, duration_seconds: u32) -> Result<()> {
        let control = self.resolver.control(&self.client).await?;
        control.boost_heating(&[self.room], duration_seconds).await
    }

    /// Capability write; silently ignored on generation X.
    pub async fn set_early_start(&self, enabled: bool) -> Result<()> {
        let control = self.resolver.control(&self.client).await?;
        control.set_early_start(self.room, enabled).await
    }

    /// Flow action; rejected on generation X.
    pub async fn action_set_early_start(&self, enabled: bool) -> Result<()> {
        if self.resolver.is_current_generation(&self.client).await {
            return Err(Error::Unsupported(
                "early start is not available on tado X".to_string(),
            ));
        }
        self.set_early_start(enabled).await
    }

    /// Flow condition: early start enabled for this room; always false on
    /// generation X.
    pub async fn condition_early_start_enabled(&self) -> Result<bool> {
        let control = self.resolver.control(&self.client).await?;
        Ok(control.early_start(self.room).await?.unwrap_or(false))
    }

    /// Dispatch for host capability-write listeners.
    pub async fn handle_capability_write(&self, capability: &str, value: CapabilityValue) -> Result<()> {
        match capability {
            "target_temperature" => {
                let v = number_arg(&value, capability)?;
                self.set_target_temperature(v).await
            }
            "onoff" => self.set_on_off(bool_arg(&value, capability)?).await,
            "onoff.early_start" => self.set_early_start(bool_arg(&value, capability)?).await,
            "tado_boost_heating" => {
                if bool_arg(&value, capability)? {
                    self.boost_heating(DEFAULT_BOOST_SECONDS).await
                } else {
                    Ok(())
                }
            }
            "tado_resume_schedule" => self.resume_schedule().await,
            "button.restart_polling" => {
                if let Some(manager) = self.manager() {
                    manager.restart();
                }
                Ok(())
            }
            other => Err(Error::Validation(format!("no listener for capability: {other}"))),
        }
    }
}

fn bool_arg(value: &CapabilityValue, capability: &str) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| Error::Validation(format!("{capability} expects a boolean")))
}

fn number_arg(value: &CapabilityValue, capability: &str) -> Result<f64> {
    value
        .as_number()
        .ok_or_else(|| Error::Validation(format!("{capability} expects a number")))
}
