//! Wire models for the tado° cloud API, both generations.
//!
//! V2 ("zone") shapes live under `/api/v2`; X ("room") shapes under the
//! hops API. Only the fields the integration reads are modeled; unknown
//! fields are ignored on deserialization.

use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HomeId(pub i64);

impl std::fmt::Display for HomeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub i64);

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Power {
    On,
    Off,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Presence {
    Home,
    Away,
}

impl Presence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Presence::Home => "home",
            Presence::Away => "away",
        }
    }
}

/// `GET /me` — account summary used during pairing.
#[derive(Debug, Clone, Deserialize)]
pub struct Me {
    #[serde(default)]
    pub homes: Vec<HomeSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HomeSummary {
    pub id: HomeId,
    pub name: String,
}

/// `GET /homes/{id}` — metadata carrying the generation tag and feature
/// eligibility.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Home {
    pub id: HomeId,
    pub name: String,
    #[serde(default)]
    pub generation: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub zones_count: Option<i64>,
    #[serde(default)]
    pub is_energy_iq_eligible: Option<bool>,
}

/// `GET /homes/{id}/state` — presence and presence lock.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeState {
    pub presence: Presence,
    #[serde(default)]
    pub presence_locked: Option<bool>,
}

/// `GET /homes/{id}/zones` entry (V2).
#[derive(Debug, Clone, Deserialize)]
pub struct Zone {
    pub id: RoomId,
    pub name: String,
    #[serde(rename = "type", default)]
    pub zone_type: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct TemperaturePair {
    pub celsius: f64,
    pub fahrenheit: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PercentageDataPoint {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub percentage: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneSensorDataPoints {
    pub inside_temperature: TemperaturePair,
    pub humidity: PercentageDataPoint,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneActivityDataPoints {
    #[serde(default)]
    pub heating_power: Option<PercentageDataPoint>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ZoneSetting {
    pub power: Power,
    #[serde(default)]
    pub temperature: Option<TemperaturePair>,
}

/// `GET /homes/{h}/zones/{z}/state` (V2).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneState {
    pub tado_mode: Presence,
    #[serde(default)]
    pub overlay_type: Option<String>,
    pub setting: ZoneSetting,
    #[serde(default)]
    pub open_window: Option<serde_json::Value>,
    pub sensor_data_points: ZoneSensorDataPoints,
    #[serde(default)]
    pub activity_data_points: Option<ZoneActivityDataPoints>,
}

/// `GET /homes/{h}/rooms` entry (X).
#[derive(Debug, Clone, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct ValueTemperature {
    pub value: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSensorDataPoints {
    pub inside_temperature: ValueTemperature,
    pub humidity: PercentageDataPoint,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoomSetting {
    pub power: Power,
    #[serde(default)]
    pub temperature: Option<ValueTemperature>,
}

/// `GET /hops/homes/{h}/rooms/{r}` (X). Geo presence is not included here
/// and is read from the home state instead.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomState {
    pub sensor_data_points: RoomSensorDataPoints,
    pub setting: RoomSetting,
    #[serde(default)]
    pub manual_control_termination: Option<serde_json::Value>,
    #[serde(default)]
    pub heating_power: Option<PercentageDataPoint>,
    #[serde(default)]
    pub open_window: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MobileDeviceSettings {
    #[serde(default)]
    pub geo_tracking_enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MobileDeviceLocation {
    #[serde(default)]
    pub at_home: bool,
}

/// `GET /homes/{h}/mobileDevices` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct MobileDevice {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    pub settings: MobileDeviceSettings,
    #[serde(default)]
    pub location: Option<MobileDeviceLocation>,
}

impl MobileDevice {
    pub fn is_geo_tracked(&self) -> bool {
        self.settings.geo_tracking_enabled
    }

    pub fn is_at_home(&self) -> bool {
        self.is_geo_tracked() && self.location.as_ref().is_some_and(|l| l.at_home)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherValue {
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherTemperature {
    pub celsius: f64,
}

/// `GET /homes/{h}/weather`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Weather {
    pub solar_intensity: PercentageDataPoint,
    pub outside_temperature: WeatherTemperature,
    pub weather_state: WeatherValue,
}

/// `GET /homes/{h}/energyIQ/meterReadings`. Readings are returned newest
/// first.
#[derive(Debug, Clone, Deserialize)]
pub struct MeterReadings {
    #[serde(default)]
    pub readings: Vec<MeterReading>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeterReading {
    #[serde(default)]
    pub date: Option<String>,
    pub reading: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionSummary {
    pub consumption: f64,
    pub average_daily_consumption: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionPerDate {
    #[serde(default)]
    pub date: Option<String>,
    pub consumption: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyConsumption {
    #[serde(default)]
    pub consumption_per_date: Vec<ConsumptionPerDate>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyAggregation {
    pub requested_month: MonthlyConsumption,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphConsumption {
    pub monthly_aggregation: MonthlyAggregation,
}

/// `GET /homes/{h}/energyIQ/consumptionDetails`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionDetails {
    pub summary: ConsumptionSummary,
    pub graph_consumption: GraphConsumption,
}

/// `GET/PUT /homes/{h}/zones/{z}/earlyStart` (V2 only).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EarlyStart {
    pub enabled: bool,
}
