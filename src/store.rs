//! Storage seams supplied by the host platform.
//!
//! The hub persists two stores per device: an opaque key/value device
//! store (generation tag, session linkage) and user-visible settings
//! (polling intervals, gate flags). Backends are host-provided; the
//! in-memory implementations here back tests and standalone use.

use std::collections::HashMap;
use std::sync::Mutex;

/// Opaque per-device storage, persisted by the host.
pub trait DeviceStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl SettingValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            SettingValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SettingValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// User-configurable settings, persisted by the host.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Option<SettingValue>;
    fn set(&self, key: &str, value: SettingValue);
}

/// Period in whole seconds from a settings key, when present and positive.
pub fn setting_seconds(settings: &dyn SettingsStore, key: &str) -> Option<u64> {
    let secs = settings.get(key)?.as_number()?;
    if secs >= 1.0 { Some(secs as u64) } else { None }
}

#[derive(Default)]
pub struct MemoryDeviceStore {
    inner: Mutex<HashMap<String, String>>,
}

impl MemoryDeviceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DeviceStore for MemoryDeviceStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.inner.lock().unwrap().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.inner.lock().unwrap().remove(key);
    }
}

#[derive(Default)]
pub struct MemorySettings {
    inner: Mutex<HashMap<String, SettingValue>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<SettingValue> {
        self.inner.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: SettingValue) {
        self.inner.lock().unwrap().insert(key.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setting_seconds_ignores_non_numeric_and_non_positive() {
        let settings = MemorySettings::new();
        assert_eq!(setting_seconds(&settings, "poll"), None);

        settings.set("poll", SettingValue::Text("fast".into()));
        assert_eq!(setting_seconds(&settings, "poll"), None);

        settings.set("poll", SettingValue::Number(0.0));
        assert_eq!(setting_seconds(&settings, "poll"), None);

        settings.set("poll", SettingValue::Number(120.0));
        assert_eq!(setting_seconds(&settings, "poll"), Some(120));
    }
}
