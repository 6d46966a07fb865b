use async_trait::async_trait;

use crate::domain::models::character::CharacterConfig;

/// Repository interface for per-character tracker records.
///
/// Persistence trouble never crosses this boundary: every operation either
/// succeeds, degrades to a usable default, or becomes a logged no-op.
/// Durability of `save` is asynchronous and best-effort.
#[async_trait]
pub trait ConfigRepository: Send + Sync {
    /// Load every record found in the configuration directory into the cache.
    async fn load_all(&self);

    /// Load one record from disk, falling back to a fresh default when the
    /// file is missing or unreadable. The result is also cached.
    async fn load(&self, id: u64) -> CharacterConfig;

    /// Queue a record for durable storage and return immediately.
    async fn save(&self, id: u64, config: CharacterConfig);

    /// Save the record of the currently active character, if any.
    async fn save_current(&self);

    /// Save every tracked record, unless another host instance is running.
    async fn save_all(&self);

    /// Forget a character and remove its file on disk (best effort).
    async fn delete(&self, id: u64);

    /// Read a cached record without touching the disk.
    async fn get(&self, id: u64) -> Option<CharacterConfig>;

    /// Snapshot of every cached record, for display purposes.
    async fn records(&self) -> Vec<(u64, CharacterConfig)>;
}
