use crate::substrate::Substrate;
use look_later_core::{Preferences, Result, StoreError};
use std::sync::Arc;
use tracing::{debug, warn};

/// Substrate key holding the popup preferences.
pub const PREFS_KEY: &str = "prefs";

/// Loads and saves [`Preferences`], independent of the links.
#[derive(Debug)]
pub struct PrefsStore<S> {
    substrate: Arc<S>,
}

impl<S: Substrate> PrefsStore<S> {
    pub fn new(substrate: Arc<S>) -> Self {
        Self { substrate }
    }

    /// Returns the saved preferences, or the defaults if none were saved.
    pub async fn load(&self) -> Result<Preferences> {
        let Some(stored) = self.substrate.get(PREFS_KEY).await? else {
            debug!("no saved preferences, using defaults");
            return Ok(Preferences::default());
        };

        serde_json::from_value(stored.value).map_err(|e| {
            warn!(error = %e, "saved preferences are malformed");
            StoreError::InvalidData(format!("invalid preferences: {e}"))
        })
    }

    pub async fn save(&self, prefs: &Preferences) -> Result<()> {
        let value = serde_json::to_value(prefs)
            .map_err(|e| StoreError::Write(format!("failed to serialize preferences: {e}")))?;
        self.substrate.set(PREFS_KEY, value).await?;
        debug!(font = %prefs.font, size = prefs.size, "preferences saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InMemorySubstrate, KvLinkStore, StoreSettings};
    use look_later_core::{LinkRecord, LinkStore, ReadLinkStore};

    #[tokio::test]
    async fn load_defaults_when_unsaved() {
        let prefs = PrefsStore::new(Arc::new(InMemorySubstrate::new()));

        assert_eq!(prefs.load().await.unwrap(), Preferences::default());
    }

    #[tokio::test]
    async fn save_then_load() {
        let prefs = PrefsStore::new(Arc::new(InMemorySubstrate::new()));
        let saved = Preferences {
            font: "serif".to_string(),
            size: 110,
        };

        prefs.save(&saved).await.unwrap();

        assert_eq!(prefs.load().await.unwrap(), saved);
    }

    #[tokio::test]
    async fn prefs_and_links_share_a_substrate_independently() {
        let substrate = Arc::new(InMemorySubstrate::new());
        let prefs = PrefsStore::new(Arc::clone(&substrate));
        let links = KvLinkStore::from_shared(Arc::clone(&substrate), StoreSettings::default());

        links
            .upsert(LinkRecord::new(1, "https://a.example", "a", "b.example/"))
            .await
            .unwrap();
        prefs.save(&Preferences::default()).await.unwrap();

        assert_eq!(links.get_all().await.unwrap().len(), 1);
        assert_eq!(prefs.load().await.unwrap(), Preferences::default());
    }
}
