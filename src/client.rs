use std::sync::Arc;

use chrono::{Datelike, Local, NaiveDate};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::*;
use crate::types::GeofencingMode;

pub const DEFAULT_API_URL: &str = "https://my.tado.com/api/v2";
pub const DEFAULT_HOPS_URL: &str = "https://hops.tado.com";

/// Supplies bearer tokens for vendor requests. Token exchange and refresh
/// live behind this seam; the client never mutates its own auth.
#[async_trait::async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// Fixed-token source for tests and short-lived tooling.
pub struct StaticTokenSource {
    token: String,
}

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait::async_trait]
impl TokenSource for StaticTokenSource {
    async fn access_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}

pub struct TadoClientBuilder {
    api_url: String,
    hops_url: String,
    tokens: Option<Arc<dyn TokenSource>>,
}

impl TadoClientBuilder {
    pub fn new() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            hops_url: DEFAULT_HOPS_URL.to_string(),
            tokens: None,
        }
    }

    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn hops_url(mut self, url: impl Into<String>) -> Self {
        self.hops_url = url.into();
        self
    }

    pub fn token_source(mut self, tokens: Arc<dyn TokenSource>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn build(self) -> TadoClient {
        let http = reqwest::Client::builder()
            .build()
            .expect("failed to build HTTP client");

        TadoClient {
            http,
            api_url: self.api_url,
            hops_url: self.hops_url,
            tokens: self
                .tokens
                .unwrap_or_else(|| Arc::new(NoTokenSource)),
        }
    }
}

impl Default for TadoClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

struct NoTokenSource;

#[async_trait::async_trait]
impl TokenSource for NoTokenSource {
    async fn access_token(&self) -> Result<String> {
        Err(Error::MissingToken)
    }
}

/// HTTP client for the tado° cloud, covering the V2 and X endpoint sets.
/// Read-only after construction; every call is an independent request.
pub struct TadoClient {
    http: reqwest::Client,
    api_url: String,
    hops_url: String,
    tokens: Arc<dyn TokenSource>,
}

impl TadoClient {
    pub fn builder() -> TadoClientBuilder {
        TadoClientBuilder::new()
    }

    fn api(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    fn hops(&self, path: &str) -> String {
        format!("{}{}", self.hops_url, path)
    }

    async fn send(&self, method: Method, url: String, body: Option<&Value>) -> Result<reqwest::Response> {
        let token = self.tokens.access_token().await?;
        debug!(%method, %url, "vendor request");

        let mut req = self
            .http
            .request(method, &url)
            .bearer_auth(token)
            .header("Accept", "application/json");
        if let Some(b) = body {
            req = req.json(b);
        }

        let resp = req.send().await?;
        let status = resp.status().as_u16();
        if (200..300).contains(&status) {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(classify_api_error(status, body))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T> {
        let resp = self.send(Method::GET, url, None).await?;
        Ok(resp.json().await?)
    }

    async fn send_no_content(&self, method: Method, url: String, body: Option<&Value>) -> Result<()> {
        self.send(method, url, body).await?;
        Ok(())
    }

    // -- Account / home metadata --

    pub async fn get_me(&self) -> Result<Me> {
        self.get_json(self.api("/me")).await
    }

    pub async fn get_home(&self, home: HomeId) -> Result<Home> {
        self.get_json(self.api(&format!("/homes/{home}"))).await
    }

    pub async fn get_home_state(&self, home: HomeId) -> Result<HomeState> {
        self.get_json(self.api(&format!("/homes/{home}/state"))).await
    }

    pub async fn get_mobile_devices(&self, home: HomeId) -> Result<Vec<MobileDevice>> {
        self.get_json(self.api(&format!("/homes/{home}/mobileDevices"))).await
    }

    /// True when any geo-tracked mobile device reports itself at home.
    pub async fn is_anyone_at_home(&self, home: HomeId) -> Result<bool> {
        let devices = self.get_mobile_devices(home).await?;
        Ok(devices.iter().any(MobileDevice::is_at_home))
    }

    pub async fn set_presence(&self, home: HomeId, mode: GeofencingMode) -> Result<()> {
        match mode {
            GeofencingMode::Auto => {
                self.send_no_content(Method::DELETE, self.api(&format!("/homes/{home}/presenceLock")), None)
                    .await
            }
            GeofencingMode::Home | GeofencingMode::Away => {
                let body = json!({ "homePresence": mode.as_str().to_ascii_uppercase() });
                self.send_no_content(
                    Method::PUT,
                    self.api(&format!("/homes/{home}/presenceLock")),
                    Some(&body),
                )
                .await
            }
        }
    }

    // -- V2 zones --

    pub async fn get_zones(&self, home: HomeId) -> Result<Vec<Zone>> {
        self.get_json(self.api(&format!("/homes/{home}/zones"))).await
    }

    pub async fn get_zone_state(&self, home: HomeId, zone: RoomId) -> Result<ZoneState> {
        self.get_json(self.api(&format!("/homes/{home}/zones/{zone}/state"))).await
    }

    /// Batched overlay write; one request covers every entry.
    pub async fn set_zone_overlays(&self, home: HomeId, overlays: Vec<Value>) -> Result<()> {
        let body = json!({ "overlays": overlays });
        self.send_no_content(Method::POST, self.api(&format!("/homes/{home}/overlay")), Some(&body))
            .await
    }

    /// Clears overlays for the given zones in one request.
    pub async fn delete_zone_overlays(&self, home: HomeId, zones: &[RoomId]) -> Result<()> {
        let rooms = zones
            .iter()
            .map(|z| z.0.to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.send_no_content(
            Method::DELETE,
            self.api(&format!("/homes/{home}/overlay?rooms={rooms}")),
            None,
        )
        .await
    }

    pub async fn is_zone_early_start_enabled(&self, home: HomeId, zone: RoomId) -> Result<bool> {
        let early: EarlyStart = self
            .get_json(self.api(&format!("/homes/{home}/zones/{zone}/earlyStart")))
            .await?;
        Ok(early.enabled)
    }

    pub async fn set_zone_early_start(&self, home: HomeId, zone: RoomId, enabled: bool) -> Result<()> {
        let body = json!({ "enabled": enabled });
        self.send_no_content(
            Method::PUT,
            self.api(&format!("/homes/{home}/zones/{zone}/earlyStart")),
            Some(&body),
        )
        .await
    }

    // -- X rooms --

    pub async fn get_rooms(&self, home: HomeId) -> Result<Vec<Room>> {
        self.get_json(self.hops(&format!("/homes/{home}/rooms"))).await
    }

    pub async fn get_room_state(&self, home: HomeId, room: RoomId) -> Result<RoomState> {
        self.get_json(self.hops(&format!("/homes/{home}/rooms/{room}"))).await
    }

    pub async fn set_manual_control(&self, home: HomeId, room: RoomId, payload: &Value) -> Result<()> {
        self.send_no_content(
            Method::POST,
            self.hops(&format!("/homes/{home}/rooms/{room}/manualControl")),
            Some(payload),
        )
        .await
    }

    pub async fn resume_schedule_room(&self, home: HomeId, room: RoomId) -> Result<()> {
        self.send_no_content(
            Method::POST,
            self.hops(&format!("/homes/{home}/rooms/{room}/resumeSchedule")),
            None,
        )
        .await
    }

    pub async fn resume_schedule_home(&self, home: HomeId) -> Result<()> {
        self.send_no_content(
            Method::POST,
            self.hops(&format!("/homes/{home}/quickActions/resumeSchedule")),
            None,
        )
        .await
    }

    // -- Weather and Energy IQ --

    pub async fn get_weather(&self, home: HomeId) -> Result<Weather> {
        self.get_json(self.api(&format!("/homes/{home}/weather"))).await
    }

    pub async fn get_meter_readings(&self, home: HomeId) -> Result<MeterReadings> {
        self.get_json(self.api(&format!("/homes/{home}/energyIQ/meterReadings"))).await
    }

    /// Reports a meter reading for the given `YYYY-MM-DD` date.
    pub async fn add_meter_reading(&self, home: HomeId, date: &str, reading: f64) -> Result<()> {
        let body = json!({ "date": date, "reading": reading });
        self.send_no_content(
            Method::POST,
            self.api(&format!("/homes/{home}/energyIQ/meterReadings")),
            Some(&body),
        )
        .await
    }

    /// Consumption details for a `YYYY-MM` month.
    pub async fn get_consumption_details(&self, home: HomeId, month: &str) -> Result<ConsumptionDetails> {
        self.get_json(self.api(&format!("/homes/{home}/energyIQ/consumptionDetails?month={month}")))
            .await
    }
}

/// `YYYY-MM-DD` (or `YYYY-MM` with `month_only`) for the given date,
/// defaulting to today on the local calendar.
pub fn date_string(date: Option<NaiveDate>, month_only: bool) -> String {
    let d = date.unwrap_or_else(|| Local::now().date_naive());
    if month_only {
        format!("{:04}-{:02}", d.year(), d.month())
    } else {
        format!("{:04}-{:02}-{:02}", d.year(), d.month(), d.day())
    }
}

fn classify_api_error(status: u16, body: String) -> Error {
    let auth_status = status == 401 || status == 403;
    if auth_status && (body.contains("invalid_grant") || body.contains("Access token expired")) {
        return Error::SessionExpired;
    }
    Error::Api { status, body }
}
