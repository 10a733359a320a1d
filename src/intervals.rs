//! Named polling timers with user-configurable periods.
//!
//! Each device owns one manager built from a static list of
//! [`IntervalSpec`]s: timer name, handler, the settings key controlling
//! its period, a default period, and whether `start()` launches it.
//! Settings changes restart only the affected timers, after a short
//! debounce that coalesces rapid successive edits.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::store::{SettingsStore, setting_seconds};

/// Period used when neither a setting nor a spec default applies.
pub const FALLBACK_INTERVAL_SECS: u64 = 600;

const SETTINGS_DEBOUNCE: Duration = Duration::from_secs(1);

pub type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
pub type IntervalHandler = Arc<dyn Fn() -> BoxFuture + Send + Sync>;

pub struct IntervalSpec {
    name: &'static str,
    setting: Option<&'static str>,
    default_secs: Option<u64>,
    auto_start: bool,
    handler: IntervalHandler,
}

impl IntervalSpec {
    pub fn new<F>(name: &'static str, handler: F) -> Self
    where
        F: Fn() -> BoxFuture + Send + Sync + 'static,
    {
        Self {
            name,
            setting: None,
            default_secs: None,
            auto_start: true,
            handler: Arc::new(handler),
        }
    }

    /// Settings key holding the period in seconds.
    pub fn setting(mut self, key: &'static str) -> Self {
        self.setting = Some(key);
        self
    }

    pub fn default_secs(mut self, secs: u64) -> Self {
        self.default_secs = Some(secs);
        self
    }

    /// Excluded from `start()`; launched explicitly, e.g. by a feature gate.
    pub fn manual_start(mut self) -> Self {
        self.auto_start = false;
        self
    }
}

pub struct IntervalManager {
    specs: Vec<IntervalSpec>,
    settings: Arc<dyn SettingsStore>,
    tasks: Mutex<HashMap<&'static str, JoinHandle<()>>>,
    debounce: Mutex<Option<JoinHandle<()>>>,
}

impl IntervalManager {
    pub fn new(specs: Vec<IntervalSpec>, settings: Arc<dyn SettingsStore>) -> Arc<Self> {
        Arc::new(Self {
            specs,
            settings,
            tasks: Mutex::new(HashMap::new()),
            debounce: Mutex::new(None),
        })
    }

    fn spec(&self, name: &str) -> Option<&IntervalSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    /// Resolved period: user setting, then spec default, then fallback.
    pub fn period_for(&self, name: &str) -> Duration {
        let secs = self
            .spec(name)
            .and_then(|spec| {
                spec.setting
                    .and_then(|key| setting_seconds(self.settings.as_ref(), key))
                    .or(spec.default_secs)
            })
            .unwrap_or(FALLBACK_INTERVAL_SECS);
        Duration::from_secs(secs)
    }

    /// Launches every auto-start timer.
    pub fn start(&self) {
        for spec in &self.specs {
            if spec.auto_start {
                self.start_one(spec.name);
            }
        }
    }

    /// (Re)launches one timer; the handler runs immediately, then once per
    /// period. Returns false for unknown names.
    pub fn start_one(&self, name: &str) -> bool {
        let Some(spec) = self.spec(name) else {
            warn!(timer = name, "no such interval");
            return false;
        };
        let period = self.period_for(name);
        let handler = Arc::clone(&spec.handler);
        let task_name = spec.name;
        debug!(timer = task_name, period_secs = period.as_secs(), "starting interval");

        let handle = tokio::spawn(async move {
            loop {
                handler().await;
                tokio::time::sleep(period).await;
            }
        });

        if let Some(previous) = self.tasks.lock().unwrap().insert(task_name, handle) {
            previous.abort();
        }
        true
    }

    pub fn stop_one(&self, name: &str) {
        if let Some(handle) = self.tasks.lock().unwrap().remove(name) {
            debug!(timer = name, "stopping interval");
            handle.abort();
        }
    }

    pub fn stop(&self) {
        if let Some(handle) = self.debounce.lock().unwrap().take() {
            handle.abort();
        }
        let mut tasks = self.tasks.lock().unwrap();
        for (name, handle) in tasks.drain() {
            debug!(timer = name, "stopping interval");
            handle.abort();
        }
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.tasks
            .lock()
            .unwrap()
            .get(name)
            .is_some_and(|h| !h.is_finished())
    }

    /// Restarts every currently-active timer with freshly-resolved periods.
    pub fn restart(&self) {
        let active: Vec<&'static str> = self
            .specs
            .iter()
            .map(|s| s.name)
            .filter(|name| self.is_active(name))
            .collect();
        for name in active {
            self.start_one(name);
        }
    }

    /// Restarts the timers whose settings key is among `changed`, after a
    /// short debounce; a later call supersedes a pending one.
    pub fn restart_by_settings(self: &Arc<Self>, changed: &[String]) {
        let names: Vec<&'static str> = self
            .specs
            .iter()
            .filter(|s| s.setting.is_some_and(|key| changed.iter().any(|c| c == key)))
            .map(|s| s.name)
            .collect();
        if names.is_empty() {
            return;
        }

        let manager = Arc::clone(self);
        let mut debounce = self.debounce.lock().unwrap();
        if let Some(pending) = debounce.take() {
            pending.abort();
        }
        *debounce = Some(tokio::spawn(async move {
            tokio::time::sleep(SETTINGS_DEBOUNCE).await;
            for name in names {
                if manager.is_active(name) {
                    manager.start_one(name);
                }
            }
        }));
    }
}

impl Drop for IntervalManager {
    fn drop(&mut self) {
        if let Some(handle) = self.debounce.get_mut().unwrap().take() {
            handle.abort();
        }
        for (_, handle) in self.tasks.get_mut().unwrap().drain() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemorySettings, SettingValue};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_spec(name: &'static str, counter: Arc<AtomicUsize>) -> IntervalSpec {
        IntervalSpec::new(name, move || {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        })
    }

    #[tokio::test(start_paused = true)]
    async fn timer_runs_immediately_then_per_period() {
        let settings = Arc::new(MemorySettings::new());
        let counter = Arc::new(AtomicUsize::new(0));
        let manager = IntervalManager::new(
            vec![counting_spec("SYNC", Arc::clone(&counter)).default_secs(30)],
            settings,
        );

        manager.start();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        manager.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn setting_overrides_default_period() {
        let settings = Arc::new(MemorySettings::new());
        settings.set("sync_interval", SettingValue::Number(5.0));
        let counter = Arc::new(AtomicUsize::new(0));
        let manager = IntervalManager::new(
            vec![
                counting_spec("SYNC", Arc::clone(&counter))
                    .setting("sync_interval")
                    .default_secs(600),
            ],
            settings,
        );

        assert_eq!(manager.period_for("SYNC"), Duration::from_secs(5));
        manager.start();
        tokio::time::sleep(Duration::from_secs(16)).await;
        // immediate run plus three 5 s ticks
        assert_eq!(counter.load(Ordering::SeqCst), 4);
        manager.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn manual_start_excluded_from_start() {
        let settings = Arc::new(MemorySettings::new());
        let counter = Arc::new(AtomicUsize::new(0));
        let manager = IntervalManager::new(
            vec![counting_spec("GATED", Arc::clone(&counter)).manual_start()],
            settings,
        );

        manager.start();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!manager.is_active("GATED"));
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        manager.start_one("GATED");
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(manager.is_active("GATED"));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        manager.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_settings_changes_coalesce_into_one_restart() {
        let settings = Arc::new(MemorySettings::new());
        let counter = Arc::new(AtomicUsize::new(0));
        let manager = IntervalManager::new(
            vec![
                counting_spec("SYNC", Arc::clone(&counter))
                    .setting("sync_interval")
                    .default_secs(600),
            ],
            Arc::clone(&settings) as Arc<dyn SettingsStore>,
        );

        manager.start();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        settings.set("sync_interval", SettingValue::Number(60.0));
        let changed = vec!["sync_interval".to_string()];
        manager.restart_by_settings(&changed);
        tokio::time::sleep(Duration::from_millis(200)).await;
        manager.restart_by_settings(&changed);

        // Each restart reruns the handler immediately; coalescing means one
        // extra run, not two.
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        manager.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn unrelated_setting_changes_do_not_restart() {
        let settings = Arc::new(MemorySettings::new());
        let counter = Arc::new(AtomicUsize::new(0));
        let manager = IntervalManager::new(
            vec![
                counting_spec("SYNC", Arc::clone(&counter))
                    .setting("sync_interval")
                    .default_secs(600),
            ],
            settings,
        );

        manager.start();
        tokio::time::sleep(Duration::from_millis(10)).await;
        manager.restart_by_settings(&["brightness".to_string()]);
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        manager.stop();
    }
}
