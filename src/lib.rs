mod capabilities;
mod client;
mod control;
mod error;
mod flows;
mod generation;
mod home;
mod intervals;
mod migrations;
mod models;
mod pairing;
mod room;
mod store;
mod types;

pub use capabilities::{Capabilities, CapabilityValue};
pub use client::{
    DEFAULT_API_URL, DEFAULT_HOPS_URL, StaticTokenSource, TadoClient, TadoClientBuilder,
    TokenSource, date_string,
};
pub use control::{DEFAULT_BOOST_SECONDS, HomeControl, V2Control, XControl, control_for};
pub use error::{Error, Result};
pub use flows::{BoostHeatingArgs, MeterReadingArgs, format_flow_arg_date};
pub use generation::GenerationResolver;
pub use home::HomeDevice;
pub use intervals::{FALLBACK_INTERVAL_SECS, IntervalManager, IntervalSpec};
pub use migrations::MigrationLog;
pub use models::*;
pub use pairing::{PairableHome, PairableRoom, list_pairable_homes, list_pairable_rooms};
pub use room::RoomDevice;
pub use store::{
    DeviceStore, MemoryDeviceStore, MemorySettings, SettingValue, SettingsStore,
};
pub use types::*;
