use async_trait::async_trait;

use crate::domain::context::{NO_ACTIVE_CHARACTER, Notification};
use crate::domain::models::character::CharacterConfig;
use crate::domain::repositories::config_repository::ConfigRepository;
use crate::infrastructure::persistence::file_system::{
    delete_file, file_modified_time, list_files_with_extension, read_text_file,
};

use super::{FileConfigRepository, Inner, PendingSave, parse_identifier};

impl Inner {
    /// Read one record from disk and install it in the cache.
    ///
    /// The read is attempted a bounded number of times because the host (or
    /// another instance) may briefly hold the file locked. When every attempt
    /// fails, or the content does not parse, a fresh default record is used
    /// instead: persistence trouble must never leave the application without
    /// a usable record.
    pub(super) async fn load_config(&self, id: u64) -> CharacterConfig {
        let path = self.config_file(id);
        let mut contents = String::new();

        for attempt in 1..=self.options.read_attempts {
            match read_text_file(&path).await {
                Ok(text) => {
                    contents = text;
                    break;
                }
                Err(error) => {
                    tracing::warn!(
                        "Config file read failed {}/{}: {}",
                        attempt,
                        self.options.read_attempts,
                        error
                    );

                    if attempt == self.options.read_attempts {
                        self.notifier.notify(Notification::warning(
                            "Load failed",
                            format!("Character {} could not be read from disk", id),
                        ));
                    }
                }
            }
        }

        let config = if contents.is_empty() {
            CharacterConfig::new()
        } else {
            match serde_json::from_str(&contents) {
                Ok(config) => config,
                Err(error) => {
                    tracing::warn!(
                        "Failed to parse character {}: {}. Loading a new default config instead.",
                        id,
                        error
                    );
                    CharacterConfig::new()
                }
            }
        };

        let modified = file_modified_time(&path).await;
        self.write_times.set(id, modified).await;
        self.cache.set(id, config.clone()).await;

        config
    }

    /// Back up the current file, then hand the record to the writer worker.
    pub(super) async fn enqueue_save(&self, id: u64, config: CharacterConfig) {
        self.rotate_backups(id).await;

        let pending = PendingSave {
            id,
            path: self.config_file(id),
            config,
        };

        if self.save_queue.send(pending).is_err() {
            tracing::warn!("Save queue is closed; dropping save for character {}", id);
        }
    }
}

#[async_trait]
impl ConfigRepository for FileConfigRepository {
    async fn load_all(&self) {
        let files = match list_files_with_extension(&self.inner.config_dir, "json").await {
            Ok(files) => files,
            Err(error) => {
                tracing::error!("Failed to enumerate configuration directory: {}", error);
                return;
            }
        };

        let mut loaded = 0usize;
        for path in files {
            if let Some(id) = parse_identifier(&path) {
                self.inner.load_config(id).await;
                loaded += 1;
            }
        }

        tracing::info!("Loaded {} character record(s)", loaded);
    }

    async fn load(&self, id: u64) -> CharacterConfig {
        self.inner.load_config(id).await
    }

    async fn save(&self, id: u64, config: CharacterConfig) {
        self.inner.cache.set(id, config.clone()).await;
        self.inner.enqueue_save(id, config).await;
    }

    async fn save_current(&self) {
        let active = self.inner.session.active_character();
        if active == NO_ACTIVE_CHARACTER {
            tracing::error!("Save requested while no character is active");
            return;
        }

        let Some(config) = self.inner.cache.get(active).await else {
            return;
        };

        self.inner.enqueue_save(active, config).await;
    }

    async fn save_all(&self) {
        // Soft cross-process guard: bulk saves race badly when a second host
        // instance runs its own engine over the same directory
        if self.inner.host.host_instance_count() > 1 {
            tracing::debug!("More than one host instance running; skipping bulk save");
            return;
        }

        for (id, config) in self.inner.cache.all().await {
            self.inner.enqueue_save(id, config).await;
        }
    }

    async fn delete(&self, id: u64) {
        if !self.inner.cache.remove(id).await {
            return;
        }

        self.inner.write_times.remove(id).await;

        // Deletion is logically complete even if the file refuses to go;
        // backups are left alone on purpose
        if let Err(error) = delete_file(&self.inner.config_file(id)).await {
            tracing::error!("Error while deleting character save file: {}", error);
        }
    }

    async fn get(&self, id: u64) -> Option<CharacterConfig> {
        self.inner.cache.get(id).await
    }

    async fn records(&self) -> Vec<(u64, CharacterConfig)> {
        self.inner.cache.all().await
    }
}
