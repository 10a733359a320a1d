//! One-time upgrade actions, applied in call order at startup.
//!
//! Each migration is named, idempotent, and recorded individually; the
//! record is only written on success so a failed migration is retried on
//! the next start.

use std::future::Future;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::Result;
use crate::store::{SettingValue, SettingsStore};

pub struct MigrationLog {
    settings: Arc<dyn SettingsStore>,
    scope: String,
}

impl MigrationLog {
    pub fn new(settings: Arc<dyn SettingsStore>, scope: impl Into<String>) -> Self {
        Self {
            settings,
            scope: scope.into(),
        }
    }

    fn key(&self, name: &str) -> String {
        format!("migration.{}.{}", self.scope, name)
    }

    pub fn is_applied(&self, name: &str) -> bool {
        self.settings
            .get(&self.key(name))
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    /// Runs `action` unless already recorded; records it only on success.
    pub async fn apply<F, Fut>(&self, name: &str, action: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        if self.is_applied(name) {
            return;
        }
        info!(migration = name, "running migration");
        match action().await {
            Ok(()) => {
                self.settings.set(&self.key(name), SettingValue::Bool(true));
                info!(migration = name, "migration completed");
            }
            Err(e) => {
                warn!(migration = name, error = %e, "migration failed, will retry on next start");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::store::MemorySettings;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn applies_once() {
        let log = MigrationLog::new(Arc::new(MemorySettings::new()), "room");
        let runs = AtomicUsize::new(0);

        for _ in 0..3 {
            log.apply("add-capabilities", || async {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;
        }

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(log.is_applied("add-capabilities"));
    }

    #[tokio::test]
    async fn failure_is_not_recorded_and_retries() {
        let log = MigrationLog::new(Arc::new(MemorySettings::new()), "room");
        let runs = AtomicUsize::new(0);

        log.apply("backfill", || async {
            runs.fetch_add(1, Ordering::SeqCst);
            Err(Error::GenerationUnresolved)
        })
        .await;
        assert!(!log.is_applied("backfill"));

        log.apply("backfill", || async {
            runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert!(log.is_applied("backfill"));
    }

    #[tokio::test]
    async fn scopes_are_independent() {
        let settings: Arc<MemorySettings> = Arc::new(MemorySettings::new());
        let room = MigrationLog::new(Arc::clone(&settings) as Arc<dyn SettingsStore>, "room");
        let home = MigrationLog::new(settings, "home");

        room.apply("shared-name", || async { Ok(()) }).await;
        assert!(room.is_applied("shared-name"));
        assert!(!home.is_applied("shared-name"));
    }
}
