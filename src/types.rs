use std::fmt;

use crate::models::{Presence, RoomId};

/// Vendor API platform version of a home. Resolved once per device and
/// persisted; `Unknown` only before the first successful resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Generation {
    /// V2 API, "zones" with timed overlays.
    Legacy,
    /// X line, "rooms" with direct manual control.
    Current,
    #[default]
    Unknown,
}

impl Generation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Generation::Legacy => "legacy",
            Generation::Current => "current",
            Generation::Unknown => "unknown",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "legacy" => Some(Generation::Legacy),
            "current" => Some(Generation::Current),
            "unknown" => Some(Generation::Unknown),
            _ => None,
        }
    }

    /// Maps the vendor's home-metadata tag onto a generation.
    pub fn from_vendor_tag(tag: &str) -> Self {
        match tag {
            "LINE_X" => Generation::Current,
            _ => Generation::Legacy,
        }
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rule governing when a manual override reverts to the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Meta-value: let the active generation pick its default reversion
    /// (next scheduled time block).
    Auto,
    NextTimeBlock,
    /// Stays until manually resumed.
    Manual,
    /// Fixed duration in seconds.
    Seconds(u32),
}

impl Termination {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "AUTO" => Some(Termination::Auto),
            "NEXT_TIME_BLOCK" => Some(Termination::NextTimeBlock),
            "MANUAL" => Some(Termination::Manual),
            other => other.parse::<u32>().ok().map(Termination::Seconds),
        }
    }
}

/// User-facing geofencing mode. `Auto` hands presence switching to the
/// vendor's location tracking and is only valid with Auto Assist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeofencingMode {
    Home,
    Away,
    Auto,
}

impl GeofencingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeofencingMode::Home => "home",
            GeofencingMode::Away => "away",
            GeofencingMode::Auto => "auto",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "home" => Some(GeofencingMode::Home),
            "away" => Some(GeofencingMode::Away),
            "auto" => Some(GeofencingMode::Auto),
            _ => None,
        }
    }
}

impl fmt::Display for GeofencingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized per-poll room state, identical for both generations after
/// projection.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomSnapshot {
    pub power_on: bool,
    /// Commanded set-point in °C; absent when the room is off.
    pub target_temperature: Option<f64>,
    pub measured_temperature: f64,
    pub humidity: f64,
    pub open_window: bool,
    /// True when no manual override is active.
    pub smart_schedule: bool,
    pub heating_power: Option<f64>,
    pub presence: Option<Presence>,
}

/// Room listing entry used by pairing and home-wide operations.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomInfo {
    pub id: RoomId,
    pub name: String,
    pub zone_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_round_trips_through_str() {
        for g in [Generation::Legacy, Generation::Current, Generation::Unknown] {
            assert_eq!(Generation::from_str(g.as_str()), Some(g));
        }
    }

    #[test]
    fn vendor_tag_mapping() {
        assert_eq!(Generation::from_vendor_tag("LINE_X"), Generation::Current);
        assert_eq!(Generation::from_vendor_tag("PRE_LINE_X"), Generation::Legacy);
    }

    #[test]
    fn termination_parses_named_and_numeric() {
        assert_eq!(Termination::parse("AUTO"), Some(Termination::Auto));
        assert_eq!(Termination::parse("MANUAL"), Some(Termination::Manual));
        assert_eq!(Termination::parse("1800"), Some(Termination::Seconds(1800)));
        assert_eq!(Termination::parse("whenever"), None);
    }

    #[test]
    fn geofencing_mode_parse_is_case_insensitive() {
        assert_eq!(GeofencingMode::parse("AUTO"), Some(GeofencingMode::Auto));
        assert_eq!(GeofencingMode::parse("home"), Some(GeofencingMode::Home));
        assert_eq!(GeofencingMode::parse("gone"), None);
    }
}
