//! Whole-home device controller.
//!
//! Mirrors home-wide state (presence, weather, room count, energy meters)
//! and carries the two feature gates: Auto Assist (geofencing) from the
//! home's skills list and Energy IQ (metering) from its eligibility flag.

use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::capabilities::{Capabilities, CapabilityValue};
use crate::client::{TadoClient, date_string};
use crate::error::{Error, Result};
use crate::flows::{BoostHeatingArgs, MeterReadingArgs};
use crate::generation::GenerationResolver;
use crate::intervals::{IntervalManager, IntervalSpec};
use crate::models::{HomeId, MobileDevice, Presence, RoomId};
use crate::store::{DeviceStore, SettingValue, SettingsStore};
use crate::types::GeofencingMode;

const GEOFENCING_TIMER: &str = "GEOFENCING_MODE";
const HOME_INFO_TIMER: &str = "HOME_INFO";
const GAS_METER_TIMER: &str = "GAS_METER_READING";
const ENERGY_TIMER: &str = "ENERGY_CONSUMPTION";
const WEATHER_TIMER: &str = "WEATHER_STATE";

const AUTO_ASSIST_SKILL: &str = "AUTO_ASSIST";
const AUTO_ASSIST_SETTING: &str = "auto_assist_enabled";
const ENERGY_IQ_SETTING: &str = "energy_iq_enabled";

const ENERGY_IQ_CAPABILITIES: [&str; 4] = [
    "meter_gas",
    "meter_power.daily_consumption",
    "meter_power.daily_consumption_average",
    "meter_power.monthly_consumption",
];
const ENERGY_IQ_TIMERS: [&str; 2] = [GAS_METER_TIMER, ENERGY_TIMER];

pub struct HomeDevice {
    home: HomeId,
    client: Arc<TadoClient>,
    resolver: GenerationResolver,
    caps: Capabilities,
    settings: Arc<dyn SettingsStore>,
    intervals: Mutex<Option<Arc<IntervalManager>>>,
}

impl HomeDevice {
    pub fn new(
        client: Arc<TadoClient>,
        home: HomeId,
        device_store: Arc<dyn DeviceStore>,
        settings: Arc<dyn SettingsStore>,
    ) -> Arc<Self> {
        let caps = Capabilities::new();
        for cap in [
            "tado_geofencing_mode",
            "tado_presence_mode",
            "tado_is_anyone_home",
            "tado_room_count",
            "tado_resume_schedule",
            "button.restart_polling",
            "tado_weather_state",
            "measure_temperature.outside",
            "tado_solar_intensity",
        ] {
            caps.add(cap);
        }

        Arc::new(Self {
            home,
            client,
            resolver: GenerationResolver::new(home, device_store),
            caps,
            settings,
            intervals: Mutex::new(None),
        })
    }

    pub async fn init(self: &Arc<Self>) {
        // Restore the Energy IQ capability set before its gated timers can
        // fire; the first HOME_INFO sync re-derives the gate.
        let energy_iq = self.setting_flag(ENERGY_IQ_SETTING);
        let manager = IntervalManager::new(self.interval_specs(), Arc::clone(&self.settings));
        *self.intervals.lock().unwrap() = Some(Arc::clone(&manager));
        self.apply_energy_iq_gate(energy_iq);
        manager.start();
    }

    pub fn uninit(&self) {
        if let Some(manager) = self.intervals.lock().unwrap().take() {
            manager.stop();
        }
    }

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

    fn setting_flag(&self, key: &str) -> bool {
        self.settings
            .get(key)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    fn interval_specs(self: &Arc<Self>) -> Vec<IntervalSpec> {
        fn handler<F, Fut>(
            dev: &Arc<HomeDevice>,
            what: &'static str,
            run: F,
        ) -> impl Fn() -> crate::intervals::BoxFuture + Send + Sync + 'static
        where
            F: Fn(Arc<HomeDevice>) -> Fut + Send + Sync + Copy + 'static,
            Fut: Future<Output = Result<()>> + Send + 'static,
        {
            let dev = Arc::downgrade(dev);
            move || {
                let dev = dev.clone();
                Box::pin(async move {
                    let Some(dev) = dev.upgrade() else { return };
                    if let Err(e) = run(dev).await {
                        warn!(sync = what, error = %e, "home sync failed");
                    }
                })
            }
        }

        vec![
            IntervalSpec::new(
                GEOFENCING_TIMER,
                handler(self, "geofencing", |d| async move { d.sync_geofencing_mode().await }),
            )
            .setting("geofencing_mode_polling_interval"),
            IntervalSpec::new(
                HOME_INFO_TIMER,
                handler(self, "home info", |d| async move { d.sync_home_info().await }),
            )
            .setting("home_info_polling_interval"),
            IntervalSpec::new(
                GAS_METER_TIMER,
                handler(self, "gas meter", |d| async move { d.sync_gas_meter_reading().await }),
            )
            .setting("gas_meter_reading_polling_interval")
            .manual_start(),
            IntervalSpec::new(
                ENERGY_TIMER,
                handler(self, "energy consumption", |d| async move {
                    d.sync_energy_consumption().await
                }),
            )
            .setting("energy_consumption_polling_interval")
            .manual_start(),
            IntervalSpec::new(
                WEATHER_TIMER,
                handler(self, "weather", |d| async move { d.sync_weather().await }),
            )
            .default_secs(3600),
        ]
    }

    // -- Geofencing --

    fn is_auto_assist_enabled(&self) -> bool {
        self.setting_flag(AUTO_ASSIST_SETTING)
    }

    async fn current_geofencing_mode(&self) -> Result<String> {
        let state = self.client.get_home_state(self.home).await?;
        self.caps.set("tado_presence_mode", state.presence.as_str())?;

        let auto_assist = self.is_auto_assist_enabled();
        // Without Auto Assist, presence detection falls back to mobile
        // device locations.
        let anyone_home = if auto_assist {
            state.presence == Presence::Home
        } else {
            self.client.is_anyone_at_home(self.home).await?
        };
        self.caps.set("tado_is_anyone_home", anyone_home)?;

        let locked = state.presence_locked.unwrap_or(false);
        if locked || !auto_assist {
            Ok(state.presence.as_str().to_string())
        } else {
            Ok(GeofencingMode::Auto.as_str().to_string())
        }
    }

    pub async fn sync_geofencing_mode(&self) -> Result<()> {
        let mode = self.current_geofencing_mode().await?;
        self.caps.set("tado_geofencing_mode", mode)?;
        Ok(())
    }

    /// Switches the geofencing mode. `Auto` requires Auto Assist and at
    /// least one mobile device with location tracking enabled.
    pub async fn set_geofencing_mode(&self, mode: GeofencingMode) -> Result<()> {
        if mode == GeofencingMode::Auto {
            if !self.is_auto_assist_enabled() {
                return Err(Error::Validation("Auto Assist is not enabled".to_string()));
            }
            let devices = self.client.get_mobile_devices(self.home).await?;
            if !devices.iter().any(MobileDevice::is_geo_tracked) {
                return Err(Error::Validation(
                    "no mobile device has location tracking enabled".to_string(),
                ));
            }
        }
        self.client.set_presence(self.home, mode).await?;

        if let Err(e) = self.sync_geofencing_mode().await {
            warn!(error = %e, "geofencing resync after mode change failed");
        }
        Ok(())
    }

    // -- Home info and feature gates --

    pub async fn sync_home_info(&self) -> Result<()> {
        let info = self.client.get_home(self.home).await?;

        if let Some(count) = info.zones_count {
            self.caps.set("tado_room_count", count as f64)?;
        }

        let auto_assist = info.skills.iter().any(|s| s == AUTO_ASSIST_SKILL);
        self.settings.set(AUTO_ASSIST_SETTING, SettingValue::Bool(auto_assist));

        let energy_iq = info.is_energy_iq_eligible.unwrap_or(false);
        self.settings.set(ENERGY_IQ_SETTING, SettingValue::Bool(energy_iq));
        self.apply_energy_iq_gate(energy_iq);
        Ok(())
    }

    /// Adds/removes the metering capability set and starts/stops its
    /// timers. Reapplying the same state is a no-op.
    fn apply_energy_iq_gate(&self, enabled: bool) {
        let manager = self.manager();

        if !enabled && let Some(manager) = &manager {
            for timer in ENERGY_IQ_TIMERS {
                manager.stop_one(timer);
            }
        }

        for cap in ENERGY_IQ_CAPABILITIES {
            if enabled {
                self.caps.add(cap);
            } else {
                self.caps.remove(cap);
            }
        }

        if enabled && let Some(manager) = &manager {
            for timer in ENERGY_IQ_TIMERS {
                if !manager.is_active(timer) {
                    manager.start_one(timer);
                }
            }
        }
    }

    // -- Meters and weather --

    pub async fn sync_gas_meter_reading(&self) -> Result<()> {
        if !self.caps.has("meter_gas") {
            return Ok(());
        }
        match self.client.get_meter_readings(self.home).await {
            Ok(meter) => {
                let reading = meter.readings.first().map(|r| r.reading).unwrap_or(0.0);
                self.caps.set("meter_gas", reading)?;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "unable to retrieve meter readings");
                Ok(())
            }
        }
    }

    pub async fn sync_energy_consumption(&self) -> Result<()> {
        if !self.caps.has("meter_power.monthly_consumption") {
            return Ok(());
        }
        let month = date_string(None, true);
        let details = self.client.get_consumption_details(self.home, &month).await?;

        self.caps.set(
            "meter_power.daily_consumption_average",
            details.summary.average_daily_consumption,
        )?;
        self.caps
            .set("meter_power.monthly_consumption", details.summary.consumption)?;

        let per_date = &details
            .graph_consumption
            .monthly_aggregation
            .requested_month
            .consumption_per_date;
        let daily = per_date.last().map(|c| c.consumption).unwrap_or(0.0);
        self.caps.set("meter_power.daily_consumption", daily)?;
        Ok(())
    }

    pub async fn sync_weather(&self) -> Result<()> {
        let weather = self.client.get_weather(self.home).await?;
        self.caps
            .set("tado_weather_state", weather.weather_state.value)?;
        self.caps
            .set("measure_temperature.outside", weather.outside_temperature.celsius)?;
        self.caps
            .set("tado_solar_intensity", weather.solar_intensity.percentage)?;
        Ok(())
    }

    // -- Home-wide actions --

    /// Resumes the schedule for the given rooms, or the whole home.
    pub async fn resume_schedule(&self, rooms: &[RoomId]) -> Result<()> {
        let control = self.resolver.control(&self.client).await?;
        if rooms.is_empty() {
            control.resume_schedule(None).await?;
        } else {
            for room in rooms {
                control.resume_schedule(Some(*room)).await?;
            }
        }
        Ok(())
    }

    pub async fn boost_heating(&self, rooms: &[RoomId], duration_seconds: u32) -> Result<()> {
        let control = self.resolver.control(&self.client).await?;
        if rooms.is_empty() {
            let all = control.active_room_ids().await?;
            control.boost_heating(&all, duration_seconds).await
        } else {
            control.boost_heating(rooms, duration_seconds).await
        }
    }

    // -- Flow actions --

    pub async fn action_meter_reading_report(&self, args: &MeterReadingArgs) -> Result<()> {
        let date = args.report_date()?;
        self.client.add_meter_reading(self.home, &date, args.reading).await
    }

    pub async fn action_resume_schedule(&self) -> Result<()> {
        self.resume_schedule(&[]).await
    }

    pub async fn action_boost_heating(&self, args: &BoostHeatingArgs) -> Result<()> {
        self.boost_heating(&[], args.duration_seconds()).await
    }

    /// Flow condition: any geo-tracked mobile device currently at home.
    pub async fn condition_anyone_at_home(&self) -> Result<bool> {
        self.client.is_anyone_at_home(self.home).await
    }

    /// Dispatch for host capability-write listeners.
    pub async fn handle_capability_write(&self, capability: &str, value: CapabilityValue) -> Result<()> {
        match capability {
            "tado_geofencing_mode" => {
                let mode = value
                    .as_text()
                    .and_then(GeofencingMode::parse)
                    .ok_or_else(|| Error::Validation("unknown geofencing mode".to_string()))?;
                self.set_geofencing_mode(mode).await
            }
            "tado_resume_schedule" => {
                if value.as_bool().unwrap_or(false) {
                    self.resume_schedule(&[]).await
                } else {
                    Ok(())
                }
            }
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
