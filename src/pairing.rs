//! Device discovery during pairing.
//!
//! Lists the account's homes and rooms as pairable device descriptors;
//! the pairing-session UI itself is host-provided.

use tracing::debug;

use crate::client::TadoClient;
use crate::control::control_for;
use crate::error::Result;
use crate::models::{HomeId, RoomId};
use crate::types::Generation;

#[derive(Debug, Clone, PartialEq)]
pub struct PairableHome {
    pub name: String,
    pub home_id: HomeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PairableRoom {
    /// Display name, `"Home / Room"`.
    pub name: String,
    pub home_id: HomeId,
    pub room_id: RoomId,
    pub zone_type: Option<String>,
}

pub async fn list_pairable_homes(client: &TadoClient) -> Result<Vec<PairableHome>> {
    let me = client.get_me().await?;
    Ok(me
        .homes
        .into_iter()
        .map(|h| PairableHome {
            name: h.name,
            home_id: h.id,
        })
        .collect())
}

/// All rooms across the account's homes, listed through each home's
/// generation-correct API.
pub async fn list_pairable_rooms(client: &TadoClient) -> Result<Vec<PairableRoom>> {
    let me = client.get_me().await?;
    let mut devices = Vec::new();

    for summary in me.homes {
        let home = client.get_home(summary.id).await?;
        let generation = home
            .generation
            .as_deref()
            .map(Generation::from_vendor_tag)
            .unwrap_or(Generation::Legacy);
        let control = control_for(generation, client, summary.id)?;

        let rooms = control.rooms().await?;
        debug!(home = %summary.id, %generation, rooms = rooms.len(), "listing pairable rooms");
        devices.extend(rooms.into_iter().map(|room| PairableRoom {
            name: format!("{} / {}", summary.name, room.name),
            home_id: summary.id,
            room_id: room.id,
            zone_type: room.zone_type,
        }));
    }

    Ok(devices)
}
