//! Typed capability state mirrored to the host UI.
//!
//! A capability holds the last vendor-confirmed value; sync handlers and
//! user actions write through here. Adding or removing a capability that
//! is already in the desired state is a no-op.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum CapabilityValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl CapabilityValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CapabilityValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CapabilityValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CapabilityValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for CapabilityValue {
    fn from(b: bool) -> Self {
        CapabilityValue::Bool(b)
    }
}

impl From<f64> for CapabilityValue {
    fn from(n: f64) -> Self {
        CapabilityValue::Number(n)
    }
}

impl From<&str> for CapabilityValue {
    fn from(s: &str) -> Self {
        CapabilityValue::Text(s.to_string())
    }
}

impl From<String> for CapabilityValue {
    fn from(s: String) -> Self {
        CapabilityValue::Text(s)
    }
}

#[derive(Default)]
struct CapabilityEntry {
    value: Option<CapabilityValue>,
    /// Host-facing option range for number capabilities.
    bounds: Option<(f64, f64)>,
}

#[derive(Default)]
pub struct Capabilities {
    inner: Mutex<BTreeMap<String, CapabilityEntry>>,
}

impl Capabilities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a capability; keeps any existing value.
    pub fn add(&self, id: &str) {
        self.inner
            .lock()
            .unwrap()
            .entry(id.to_string())
            .or_default();
    }

    pub fn remove(&self, id: &str) {
        self.inner.lock().unwrap().remove(id);
    }

    pub fn has(&self, id: &str) -> bool {
        self.inner.lock().unwrap().contains_key(id)
    }

    /// Registered capability ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        self.inner.lock().unwrap().keys().cloned().collect()
    }

    pub fn get(&self, id: &str) -> Option<CapabilityValue> {
        self.inner.lock().unwrap().get(id).and_then(|e| e.value.clone())
    }

    pub fn set(&self, id: &str, value: impl Into<CapabilityValue>) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        match inner.get_mut(id) {
            Some(entry) => {
                entry.value = Some(value.into());
                Ok(())
            }
            None => Err(Error::Validation(format!("unknown capability: {id}"))),
        }
    }

    /// Restores a previously-read value, clearing it when there was none.
    pub fn restore(&self, id: &str, value: Option<CapabilityValue>) {
        if let Some(entry) = self.inner.lock().unwrap().get_mut(id) {
            entry.value = value;
        }
    }

    pub fn set_number_bounds(&self, id: &str, min: f64, max: f64) {
        if let Some(entry) = self.inner.lock().unwrap().get_mut(id) {
            entry.bounds = Some((min, max));
        }
    }

    pub fn number_bounds(&self, id: &str) -> Option<(f64, f64)> {
        self.inner.lock().unwrap().get(id).and_then(|e| e.bounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_is_idempotent_and_keeps_value() {
        let caps = Capabilities::new();
        caps.add("onoff");
        caps.set("onoff", true).unwrap();
        caps.add("onoff");
        assert_eq!(caps.get("onoff"), Some(CapabilityValue::Bool(true)));
    }

    #[test]
    fn set_on_unregistered_capability_fails() {
        let caps = Capabilities::new();
        let err = caps.set("target_temperature", 21.0).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn remove_then_add_clears_value() {
        let caps = Capabilities::new();
        caps.add("meter_gas");
        caps.set("meter_gas", 12.5).unwrap();
        caps.remove("meter_gas");
        caps.add("meter_gas");
        assert_eq!(caps.get("meter_gas"), None);
    }

    #[test]
    fn bounds_follow_registration() {
        let caps = Capabilities::new();
        caps.add("target_temperature");
        caps.set_number_bounds("target_temperature", 5.0, 30.0);
        assert_eq!(caps.number_bounds("target_temperature"), Some((5.0, 30.0)));
        caps.remove("target_temperature");
        assert_eq!(caps.number_bounds("target_temperature"), None);
    }
}
