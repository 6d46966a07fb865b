use std::sync::Arc;

use crate::domain::models::character::CharacterConfig;
use crate::domain::repositories::config_repository::ConfigRepository;

/// Use-case façade over the persistence engine.
///
/// The UI reads through [`ConfigService::character`] and
/// [`ConfigService::characters`]; the scanner glue records observations with
/// [`ConfigService::update`]. None of these calls can fail: persistence
/// trouble is logged and notified, never raised.
pub struct ConfigService {
    config_repository: Arc<dyn ConfigRepository>,
}

impl ConfigService {
    pub fn new(config_repository: Arc<dyn ConfigRepository>) -> Self {
        Self { config_repository }
    }

    /// Reload every character record from disk.
    pub async fn load_all(&self) {
        tracing::debug!("Reloading all character records");
        self.config_repository.load_all().await;
    }

    /// Load one character record, creating a default when none exists.
    pub async fn load(&self, id: u64) -> CharacterConfig {
        self.config_repository.load(id).await
    }

    /// Apply a mutation to a character's record and queue it for saving.
    ///
    /// The record is created on first use, so scanners do not need to care
    /// whether a character has been seen before.
    pub async fn update(&self, id: u64, mutate: impl FnOnce(&mut CharacterConfig)) {
        let mut config = self
            .config_repository
            .get(id)
            .await
            .unwrap_or_else(CharacterConfig::new);

        mutate(&mut config);

        self.config_repository.save(id, config).await;
    }

    /// Queue the given record for saving.
    pub async fn save(&self, id: u64, config: CharacterConfig) {
        self.config_repository.save(id, config).await;
    }

    /// Save the currently active character, if any.
    pub async fn save_current(&self) {
        self.config_repository.save_current().await;
    }

    /// Save every tracked character, guarded against concurrent instances.
    pub async fn save_all(&self) {
        self.config_repository.save_all().await;
    }

    /// Forget a character and remove its file.
    pub async fn delete(&self, id: u64) {
        tracing::info!("Deleting character {}", id);
        self.config_repository.delete(id).await;
    }

    /// Cached record for one character.
    pub async fn character(&self, id: u64) -> Option<CharacterConfig> {
        self.config_repository.get(id).await
    }

    /// Snapshot of every cached record, for display purposes. The snapshot
    /// may go stale; re-query for freshness.
    pub async fn characters(&self) -> Vec<(u64, CharacterConfig)> {
        self.config_repository.records().await
    }
}
