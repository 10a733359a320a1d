use std::sync::Arc;

use tracing::{debug, warn};

use crate::client::TadoClient;
use crate::control::{HomeControl, control_for};
use crate::error::Result;
use crate::models::HomeId;
use crate::store::DeviceStore;
use crate::types::Generation;

const STORE_KEY: &str = "api_generation";

/// Resolves a home's API generation once and answers from the device
/// store afterwards.
pub struct GenerationResolver {
    home: HomeId,
    store: Arc<dyn DeviceStore>,
}

impl GenerationResolver {
    pub fn new(home: HomeId, store: Arc<dyn DeviceStore>) -> Self {
        Self { home, store }
    }

    fn stored(&self) -> Generation {
        self.store
            .get(STORE_KEY)
            .and_then(|s| Generation::from_str(&s))
            .unwrap_or(Generation::Unknown)
    }

    /// Cached generation tag, fetching home metadata on the first call.
    /// A failed fetch is logged and leaves the tag `Unknown`; the next
    /// call retries.
    pub async fn resolve(&self, client: &TadoClient) -> Generation {
        let stored = self.stored();
        if stored != Generation::Unknown {
            return stored;
        }

        match client.get_home(self.home).await {
            Ok(home) => {
                let generation = home
                    .generation
                    .as_deref()
                    .map(Generation::from_vendor_tag)
                    .unwrap_or(Generation::Legacy);
                debug!(home = %self.home, %generation, "resolved home generation");
                self.store.set(STORE_KEY, generation.as_str());
                generation
            }
            Err(e) => {
                warn!(home = %self.home, error = %e, "generation resolution failed, staying unknown");
                Generation::Unknown
            }
        }
    }

    pub async fn is_current_generation(&self, client: &TadoClient) -> bool {
        self.resolve(client).await == Generation::Current
    }

    /// The control implementation matching the resolved generation.
    pub async fn control<'a>(&self, client: &'a TadoClient) -> Result<Box<dyn HomeControl + 'a>> {
        let generation = self.resolve(client).await;
        control_for(generation, client, self.home)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryDeviceStore;

    #[test]
    fn stored_tag_is_authoritative() {
        let store = Arc::new(MemoryDeviceStore::new());
        store.set(STORE_KEY, "current");
        let resolver = GenerationResolver::new(HomeId(7), store);
        assert_eq!(resolver.stored(), Generation::Current);
    }

    #[test]
    fn garbage_in_store_reads_as_unknown() {
        let store = Arc::new(MemoryDeviceStore::new());
        store.set(STORE_KEY, "v3");
        let resolver = GenerationResolver::new(HomeId(7), store);
        assert_eq!(resolver.stored(), Generation::Unknown);
    }
}
