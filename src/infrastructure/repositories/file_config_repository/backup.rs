use std::path::PathBuf;
use std::time::SystemTime;

use chrono::Local;
use tokio::fs;

use crate::infrastructure::persistence::file_system::{
    delete_file, file_modified_time, list_files_with_prefix,
};

use super::Inner;

impl Inner {
    /// Copy the current on-disk file aside before a save is queued.
    ///
    /// Backups are a safety net, not part of the durability contract: every
    /// failure in here is logged and swallowed so the save itself proceeds.
    /// The backup name carries an hour-granularity stamp, so repeated saves
    /// within the same hour collapse into one backup.
    pub(super) async fn rotate_backups(&self, id: u64) {
        let source = self.config_file(id);
        if !source.exists() {
            // First save for this character, nothing to back up yet
            return;
        }

        self.prune_backups(id).await;

        let stamp = Local::now().format("%Y%m%d%H").to_string();
        let backup_path = self.backup_file(id, &stamp);

        if let Err(error) = fs::copy(&source, &backup_path).await {
            tracing::warn!(
                "Failed to create backup {:?}: {}",
                backup_path.file_name().unwrap_or_default(),
                error
            );
        }
    }

    /// Delete the oldest backups so that adding one more stays within the cap.
    async fn prune_backups(&self, id: u64) {
        let keep = self.options.max_backups.saturating_sub(1);

        let backups = match list_files_with_prefix(&self.misc_dir, &Self::backup_prefix(id)).await {
            Ok(backups) => backups,
            Err(error) => {
                tracing::warn!("Failed to list backups for character {}: {}", id, error);
                return;
            }
        };

        if backups.len() <= keep {
            return;
        }

        let mut stamped: Vec<(PathBuf, SystemTime)> = Vec::with_capacity(backups.len());
        for path in backups {
            let modified = file_modified_time(&path).await;
            stamped.push((path, modified));
        }

        // Newest first; everything past the keep mark goes
        stamped.sort_by(|(_, a), (_, b)| b.cmp(a));

        for (path, _) in stamped.into_iter().skip(keep) {
            if let Err(error) = delete_file(&path).await {
                tracing::warn!("Failed to remove old backup {:?}: {}", path, error);
            }
        }
    }
}
