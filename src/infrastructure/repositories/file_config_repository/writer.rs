use std::sync::Arc;

use tokio::fs;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::sleep;

use crate::domain::context::Notification;
use crate::infrastructure::persistence::file_system::{
    delete_file, file_modified_time, write_json_file,
};

use super::{Inner, PendingSave};

/// Single consumer of the save queue.
///
/// Wakes on a fixed interval and drains at most one request per wake, so all
/// durability I/O is serialized through this one task. Bounded write latency
/// in exchange for queuing delay under heavy save volume.
pub(super) async fn run(inner: Arc<Inner>, mut queue: UnboundedReceiver<PendingSave>) {
    loop {
        tokio::select! {
            _ = inner.cancel.cancelled() => break,
            _ = sleep(inner.options.write_interval) => {}
        }

        let Ok(pending) = queue.try_recv() else {
            continue;
        };

        inner.write_pending(pending).await;
    }

    tracing::debug!("Writer worker stopped");
}

impl Inner {
    /// Serialize one record and move it into place atomically.
    ///
    /// The record stays in the cache whatever happens here; a failed write
    /// delays durability, it does not lose data.
    async fn write_pending(&self, pending: PendingSave) {
        let temp_path = self.temp_file(pending.id);

        // A stale temp file means a previous write never finished
        if delete_file(&temp_path).await.is_err() {
            return;
        }

        if write_json_file(&temp_path, &pending.config).await.is_err() {
            // Failure already logged; the next save for this id retries from scratch
            return;
        }

        for attempt in 1..=self.options.write_attempts {
            match fs::rename(&temp_path, &pending.path).await {
                Ok(()) => {
                    let modified = file_modified_time(&pending.path).await;
                    self.write_times.set(pending.id, modified).await;
                    return;
                }
                Err(error) => {
                    tracing::warn!(
                        "Config file couldn't be moved {}/{}: {}",
                        attempt,
                        self.options.write_attempts,
                        error
                    );

                    if attempt == self.options.write_attempts {
                        self.notifier.notify(Notification::warning(
                            "Save failed",
                            format!(
                                "Character {} could not be written to disk",
                                pending.id
                            ),
                        ));
                    } else {
                        tokio::select! {
                            _ = self.cancel.cancelled() => return,
                            _ = sleep(self.options.write_retry_delay) => {}
                        }
                    }
                }
            }
        }
    }
}
