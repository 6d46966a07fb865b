use std::collections::HashMap;
use std::time::SystemTime;

use tokio::sync::RwLock;

use crate::domain::models::character::CharacterConfig;

/// Thread-safe in-memory store of character records.
///
/// Shared between caller threads, the writer worker and the change watcher.
/// `set` always replaces the whole record; nothing here touches the disk.
pub(crate) struct RecordCache {
    records: RwLock<HashMap<u64, CharacterConfig>>,
}

impl RecordCache {
    pub(crate) fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) async fn get(&self, id: u64) -> Option<CharacterConfig> {
        self.records.read().await.get(&id).cloned()
    }

    pub(crate) async fn set(&self, id: u64, config: CharacterConfig) {
        self.records.write().await.insert(id, config);
    }

    /// Remove a record; returns false when the identifier was not tracked.
    pub(crate) async fn remove(&self, id: u64) -> bool {
        self.records.write().await.remove(&id).is_some()
    }

    /// Cloned snapshot of every tracked record.
    pub(crate) async fn all(&self) -> Vec<(u64, CharacterConfig)> {
        self.records
            .read()
            .await
            .iter()
            .map(|(id, config)| (*id, config.clone()))
            .collect()
    }
}

/// Last on-disk modification time the engine has seen per identifier.
///
/// After a successful engine write this matches the real file time, which is
/// how the watcher tells "we wrote this" apart from "someone else did".
pub(crate) struct WriteTimes {
    times: RwLock<HashMap<u64, SystemTime>>,
}

impl WriteTimes {
    pub(crate) fn new() -> Self {
        Self {
            times: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) async fn get(&self, id: u64) -> Option<SystemTime> {
        self.times.read().await.get(&id).copied()
    }

    pub(crate) async fn set(&self, id: u64, time: SystemTime) {
        self.times.write().await.insert(id, time);
    }

    pub(crate) async fn remove(&self, id: u64) {
        self.times.write().await.remove(&id);
    }
}
