use std::sync::Arc;

use tokio::time::sleep;

use crate::infrastructure::persistence::file_system::{
    file_modified_time, list_files_with_extension,
};

use super::{Inner, parse_identifier};

/// Polls the configuration directory and adopts external changes.
///
/// Another process instance, a manual edit or a restored backup all show up
/// as a modification time that differs from the one the engine recorded.
/// Reconciliation is coarse and eventually consistent; there is no locking
/// between cooperating processes.
pub(super) async fn run(inner: Arc<Inner>) {
    loop {
        tokio::select! {
            _ = inner.cancel.cancelled() => break,
            _ = sleep(inner.options.watch_interval) => {}
        }

        inner.reconcile().await;
    }

    tracing::debug!("Change watcher stopped");
}

impl Inner {
    pub(super) async fn reconcile(&self) {
        let files = match list_files_with_extension(&self.config_dir, "json").await {
            Ok(files) => files,
            Err(error) => {
                tracing::warn!("Failed to scan configuration directory: {}", error);
                return;
            }
        };

        let active = self.session.active_character();

        for path in files {
            let Some(id) = parse_identifier(&path) else {
                continue;
            };

            // The active character's in-memory record is already newer than disk
            if id == active {
                continue;
            }

            let modified = file_modified_time(&path).await;
            if self.write_times.get(id).await != Some(modified) {
                tracing::debug!("Adopting external change to character {}", id);
                self.write_times.set(id, modified).await;
                self.load_config(id).await;
            }
        }
    }
}
