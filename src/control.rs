//! Generation-polymorphic home control.
//!
//! One [`HomeControl`] capability interface, two implementations: V2 homes
//! speak timed overlays with Celsius/Fahrenheit pairs, X homes speak direct
//! manual-control calls with bare Celsius values. Call sites pick an
//! implementation once (via the resolver) and never branch on generation.

use serde_json::{Value, json};
use tracing::trace;

use crate::client::TadoClient;
use crate::error::{Error, Result};
use crate::models::{HomeId, Power, RoomId};
use crate::types::{Generation, RoomInfo, RoomSnapshot, Termination};

pub const DEFAULT_BOOST_SECONDS: u32 = 1800;

const BOOST_CELSIUS: f64 = 25.0;
const BOOST_FAHRENHEIT: f64 = 77.0;

/// Below this set-point the room is commanded off instead.
const OFF_THRESHOLD_CELSIUS: f64 = 5.0;

const V2_MAX_CELSIUS: f64 = 25.0;
const X_MAX_CELSIUS: f64 = 30.0;

#[async_trait::async_trait]
pub trait HomeControl: Send + Sync {
    /// Rooms currently known to the home.
    async fn rooms(&self) -> Result<Vec<RoomInfo>>;

    /// Fresh normalized state for one room.
    async fn room_snapshot(&self, room: RoomId) -> Result<RoomSnapshot>;

    /// Boost heating in the given rooms for `duration_seconds`.
    async fn boost_heating(&self, rooms: &[RoomId], duration_seconds: u32) -> Result<()>;

    /// Command a set-point. Values below 5.0 °C turn the room off.
    async fn set_room_temperature(&self, room: RoomId, value: f64, termination: Termination) -> Result<()>;

    /// Drop manual overrides for one room, or the whole home when `None`.
    async fn resume_schedule(&self, room: Option<RoomId>) -> Result<()>;

    /// Early-start flag; `None` where the generation has no such feature.
    async fn early_start(&self, room: RoomId) -> Result<Option<bool>>;

    async fn set_early_start(&self, room: RoomId, enabled: bool) -> Result<()>;

    async fn active_room_ids(&self) -> Result<Vec<RoomId>> {
        Ok(self.rooms().await?.into_iter().map(|r| r.id).collect())
    }
}

/// Selects the control implementation for a resolved generation.
pub fn control_for(
    generation: Generation,
    client: &TadoClient,
    home: HomeId,
) -> Result<Box<dyn HomeControl + '_>> {
    match generation {
        Generation::Legacy => Ok(Box::new(V2Control { client, home })),
        Generation::Current => Ok(Box::new(XControl { client, home })),
        Generation::Unknown => Err(Error::GenerationUnresolved),
    }
}

/// Legacy ("V2") implementation: zones and overlays.
pub struct V2Control<'a> {
    client: &'a TadoClient,
    home: HomeId,
}

impl<'a> V2Control<'a> {
    pub fn new(client: &'a TadoClient, home: HomeId) -> Self {
        Self { client, home }
    }
}

#[async_trait::async_trait]
impl HomeControl for V2Control<'_> {
    async fn rooms(&self) -> Result<Vec<RoomInfo>> {
        let zones = self.client.get_zones(self.home).await?;
        Ok(zones
            .into_iter()
            .map(|z| RoomInfo {
                id: z.id,
                name: z.name,
                zone_type: z.zone_type,
            })
            .collect())
    }

    async fn room_snapshot(&self, room: RoomId) -> Result<RoomSnapshot> {
        let state = self.client.get_zone_state(self.home, room).await?;

        let heating_power = state
            .activity_data_points
            .as_ref()
            .and_then(|adp| adp.heating_power.as_ref())
            .map(|hp| match hp.kind.as_deref() {
                Some("PERCENTAGE") => hp.percentage,
                _ => 0.0,
            });

        Ok(RoomSnapshot {
            power_on: state.setting.power == Power::On,
            target_temperature: state.setting.temperature.map(|t| t.celsius),
            measured_temperature: state.sensor_data_points.inside_temperature.celsius,
            humidity: state.sensor_data_points.humidity.percentage,
            open_window: state.open_window.is_some(),
            smart_schedule: state.overlay_type.is_none(),
            heating_power,
            presence: Some(state.tado_mode),
        })
    }

    async fn boost_heating(&self, rooms: &[RoomId], duration_seconds: u32) -> Result<()> {
        // One batched overlay call regardless of room count.
        let overlays = rooms
            .iter()
            .map(|room| {
                json!({
                    "room": room.0,
                    "overlay": {
                        "setting": {
                            "type": "HEATING",
                            "power": "ON",
                            "isBoost": true,
                            "temperature": {
                                "celsius": BOOST_CELSIUS,
                                "fahrenheit": BOOST_FAHRENHEIT,
                            },
                        },
                        "termination": v2_termination(Termination::Seconds(duration_seconds)),
                    },
                })
            })
            .collect();
        self.client.set_zone_overlays(self.home, overlays).await
    }

    async fn set_room_temperature(&self, room: RoomId, value: f64, termination: Termination) -> Result<()> {
        let setting = if value < OFF_THRESHOLD_CELSIUS {
            json!({ "type": "HEATING", "power": "OFF" })
        } else {
            let celsius = clamp_target(value, V2_MAX_CELSIUS);
            json!({
                "type": "HEATING",
                "power": "ON",
                "temperature": {
                    "celsius": celsius,
                    "fahrenheit": celsius * 9.0 / 5.0 + 32.0,
                },
            })
        };
        let overlay = json!({
            "room": room.0,
            "overlay": {
                "setting": setting,
                "termination": v2_termination(termination),
            },
        });
        self.client.set_zone_overlays(self.home, vec![overlay]).await
    }

    async fn resume_schedule(&self, room: Option<RoomId>) -> Result<()> {
        let rooms = match room {
            Some(id) => vec![id],
            None => self.active_room_ids().await?,
        };
        self.client.delete_zone_overlays(self.home, &rooms).await
    }

    async fn early_start(&self, room: RoomId) -> Result<Option<bool>> {
        let enabled = self.client.is_zone_early_start_enabled(self.home, room).await?;
        Ok(Some(enabled))
    }

    async fn set_early_start(&self, room: RoomId, enabled: bool) -> Result<()> {
        self.client.set_zone_early_start(self.home, room, enabled).await
    }
}

/// Current ("X") implementation: rooms and manual control.
pub struct XControl<'a> {
    client: &'a TadoClient,
    home: HomeId,
}

impl<'a> XControl<'a> {
    pub fn new(client: &'a TadoClient, home: HomeId) -> Self {
        Self { client, home }
    }
}

#[async_trait::async_trait]
impl HomeControl for XControl<'_> {
    async fn rooms(&self) -> Result<Vec<RoomInfo>> {
        let rooms = self.client.get_rooms(self.home).await?;
        Ok(rooms
            .into_iter()
            .map(|r| RoomInfo {
                id: r.id,
                name: r.name,
                zone_type: None,
            })
            .collect())
    }

    async fn room_snapshot(&self, room: RoomId) -> Result<RoomSnapshot> {
        let state = self.client.get_room_state(self.home, room).await?;
        // The hops room payload carries no geo data; presence comes from
        // the home state.
        let home_state = self.client.get_home_state(self.home).await?;

        Ok(RoomSnapshot {
            power_on: state.setting.power == Power::On,
            target_temperature: state.setting.temperature.map(|t| t.value),
            measured_temperature: state.sensor_data_points.inside_temperature.value,
            humidity: state.sensor_data_points.humidity.percentage,
            open_window: state.open_window.is_some(),
            smart_schedule: state.manual_control_termination.is_none(),
            heating_power: state.heating_power.map(|hp| hp.percentage),
            presence: Some(home_state.presence),
        })
    }

    async fn boost_heating(&self, rooms: &[RoomId], duration_seconds: u32) -> Result<()> {
        // One manual-control call per room; there is no batched endpoint.
        let payload = json!({
            "setting": {
                "power": "ON",
                "temperature": { "value": BOOST_CELSIUS },
            },
            "termination": x_termination(Termination::Seconds(duration_seconds)),
        });
        for room in rooms {
            self.client.set_manual_control(self.home, *room, &payload).await?;
        }
        Ok(())
    }

    async fn set_room_temperature(&self, room: RoomId, value: f64, termination: Termination) -> Result<()> {
        let setting = if value < OFF_THRESHOLD_CELSIUS {
            json!({ "power": "OFF" })
        } else {
            json!({
                "power": "ON",
                "temperature": { "value": clamp_target(value, X_MAX_CELSIUS) },
            })
        };
        let payload = json!({
            "setting": setting,
            "termination": x_termination(termination),
        });
        self.client.set_manual_control(self.home, room, &payload).await
    }

    async fn resume_schedule(&self, room: Option<RoomId>) -> Result<()> {
        match room {
            Some(id) => self.client.resume_schedule_room(self.home, id).await,
            None => self.client.resume_schedule_home(self.home).await,
        }
    }

    async fn early_start(&self, _room: RoomId) -> Result<Option<bool>> {
        trace!("early start not available on generation X");
        Ok(None)
    }

    async fn set_early_start(&self, _room: RoomId, _enabled: bool) -> Result<()> {
        trace!("early start not available on generation X, ignoring write");
        Ok(())
    }
}

fn clamp_target(value: f64, max: f64) -> f64 {
    value.clamp(OFF_THRESHOLD_CELSIUS, max)
}

fn v2_termination(termination: Termination) -> Value {
    match termination {
        Termination::Manual => json!({ "typeSkillBasedApp": "MANUAL" }),
        Termination::NextTimeBlock => json!({ "typeSkillBasedApp": "NEXT_TIME_BLOCK" }),
        Termination::Auto => json!({ "typeSkillBasedApp": "TADO_MODE" }),
        Termination::Seconds(secs) => json!({
            "typeSkillBasedApp": "TIMER",
            "durationInSeconds": secs,
        }),
    }
}

fn x_termination(termination: Termination) -> Value {
    match termination {
        Termination::Manual => json!({ "type": "MANUAL" }),
        // AUTO maps to the next scheduled time block on this generation.
        Termination::Auto | Termination::NextTimeBlock => json!({ "type": "NEXT_TIME_BLOCK" }),
        Termination::Seconds(secs) => json!({
            "type": "TIMER",
            "durationInSeconds": secs,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_respects_generation_maximum() {
        assert_eq!(clamp_target(28.0, V2_MAX_CELSIUS), 25.0);
        assert_eq!(clamp_target(28.0, X_MAX_CELSIUS), 28.0);
        assert_eq!(clamp_target(40.0, X_MAX_CELSIUS), 30.0);
        assert_eq!(clamp_target(18.5, V2_MAX_CELSIUS), 18.5);
    }

    #[test]
    fn v2_termination_shapes() {
        assert_eq!(v2_termination(Termination::Manual)["typeSkillBasedApp"], "MANUAL");
        assert_eq!(v2_termination(Termination::Auto)["typeSkillBasedApp"], "TADO_MODE");
        let timed = v2_termination(Termination::Seconds(900));
        assert_eq!(timed["typeSkillBasedApp"], "TIMER");
        assert_eq!(timed["durationInSeconds"], 900);
    }

    #[test]
    fn x_termination_translates_auto_to_next_time_block() {
        assert_eq!(x_termination(Termination::Auto)["type"], "NEXT_TIME_BLOCK");
        assert_eq!(x_termination(Termination::NextTimeBlock)["type"], "NEXT_TIME_BLOCK");
        assert_eq!(x_termination(Termination::Manual)["type"], "MANUAL");
        assert_eq!(x_termination(Termination::Seconds(600))["durationInSeconds"], 600);
    }

    #[tokio::test]
    async fn unknown_generation_has_no_control() {
        let client = TadoClient::builder().build();
        assert!(matches!(
            control_for(Generation::Unknown, &client, HomeId(1)),
            Err(Error::GenerationUnresolved)
        ));
    }
}
