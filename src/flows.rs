//! Typed argument bags for automation-flow actions.
//!
//! The hub hands flow arguments over as loosely-typed bags; validation
//! errors here surface to the end user as action failures.

use chrono::NaiveDate;

use crate::client::date_string;
use crate::control::DEFAULT_BOOST_SECONDS;
use crate::error::{Error, Result};

/// Converts the hub's `DD-MM-YYYY` date tag to the vendor's `YYYY-MM-DD`,
/// defaulting to today.
pub fn format_flow_arg_date(date: Option<&str>) -> Result<String> {
    let Some(raw) = date else {
        return Ok(date_string(None, false));
    };
    let trimmed = raw.trim();
    let well_formed = trimmed.len() == 10
        && trimmed
            .char_indices()
            .all(|(i, c)| if i == 2 || i == 5 { c == '-' } else { c.is_ascii_digit() });
    if !well_formed {
        return Err(Error::Validation(
            "invalid date format, please use DD-MM-YYYY".to_string(),
        ));
    }
    let parsed = NaiveDate::parse_from_str(trimmed, "%d-%m-%Y")
        .map_err(|_| Error::Validation(format!("not a calendar date: {trimmed}")))?;
    Ok(date_string(Some(parsed), false))
}

/// Arguments of the meter-reading report action.
#[derive(Debug, Clone)]
pub struct MeterReadingArgs {
    /// `DD-MM-YYYY`; today when absent.
    pub date: Option<String>,
    pub reading: f64,
}

impl MeterReadingArgs {
    pub fn report_date(&self) -> Result<String> {
        format_flow_arg_date(self.date.as_deref())
    }
}

/// Arguments of the boost-heating action. The hub delivers durations in
/// milliseconds.
#[derive(Debug, Clone, Default)]
pub struct BoostHeatingArgs {
    pub duration_ms: Option<u64>,
}

impl BoostHeatingArgs {
    pub fn duration_seconds(&self) -> u32 {
        match self.duration_ms {
            Some(ms) => (ms / 1000) as u32,
            None => DEFAULT_BOOST_SECONDS,
        }
    }
}
