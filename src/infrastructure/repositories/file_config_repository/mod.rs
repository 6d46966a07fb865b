use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::domain::context::{HostMonitor, NotificationSink, SessionContext};
use crate::domain::models::character::CharacterConfig;
use crate::infrastructure::persistence::file_system::DataDirectory;

mod backup;
mod cache;
mod repository;
mod watcher;
mod writer;

#[cfg(test)]
mod tests;

use self::cache::{RecordCache, WriteTimes};

/// Timing and retry knobs for the persistence engine.
#[derive(Debug, Clone)]
pub struct PersistenceOptions {
    /// How often the writer worker wakes to drain one queued save.
    pub write_interval: Duration,
    /// How often the change watcher rescans the configuration directory.
    pub watch_interval: Duration,
    /// Attempts made to read a record file before falling back to a default.
    pub read_attempts: u32,
    /// Attempts made to move a finished write into place.
    pub write_attempts: u32,
    /// Pause between write attempts.
    pub write_retry_delay: Duration,
    /// Backups kept per character, counting the one being created.
    pub max_backups: usize,
}

impl Default for PersistenceOptions {
    fn default() -> Self {
        Self {
            write_interval: Duration::from_millis(100),
            watch_interval: Duration::from_secs(5),
            read_attempts: 5,
            write_attempts: 5,
            write_retry_delay: Duration::from_millis(30),
            max_backups: 5,
        }
    }
}

/// A queued durability request.
///
/// Several entries for the same identifier may sit in the queue at once; the
/// most recent one wins because the queue drains in FIFO order and every
/// write replaces the whole file.
struct PendingSave {
    id: u64,
    path: PathBuf,
    config: CharacterConfig,
}

/// State shared between the repository façade and its background tasks.
struct Inner {
    config_dir: PathBuf,
    misc_dir: PathBuf,
    options: PersistenceOptions,
    cache: RecordCache,
    write_times: WriteTimes,
    session: Arc<dyn SessionContext>,
    host: Arc<dyn HostMonitor>,
    notifier: Arc<dyn NotificationSink>,
    save_queue: mpsc::UnboundedSender<PendingSave>,
    cancel: CancellationToken,
}

impl Inner {
    fn config_file(&self, id: u64) -> PathBuf {
        self.config_dir.join(format!("{id}.json"))
    }

    fn temp_file(&self, id: u64) -> PathBuf {
        self.misc_dir.join(format!("{id}.json.tmp"))
    }

    fn backup_file(&self, id: u64, stamp: &str) -> PathBuf {
        self.misc_dir.join(format!("{id}.json.bak.{stamp}"))
    }

    fn backup_prefix(id: u64) -> String {
        format!("{id}.json.bak.")
    }
}

/// Identifier encoded in a record file name, if the file is one of ours.
fn parse_identifier(path: &Path) -> Option<u64> {
    if path.extension()? != "json" {
        return None;
    }

    path.file_stem()?.to_str()?.parse().ok()
}

/// File-based character record repository.
///
/// Records live as `<id>.json` directly inside the configuration root; the
/// `Misc` subdirectory holds timestamped backups and write-in-progress files.
/// Saves are queued and drained by a single writer task, and a second task
/// polls the directory to adopt changes made by other processes. Both tasks
/// run until [`FileConfigRepository::shutdown`] is called.
pub struct FileConfigRepository {
    inner: Arc<Inner>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl FileConfigRepository {
    /// Create a repository with the default timing options.
    ///
    /// Must be called from within a tokio runtime; the writer worker and the
    /// change watcher are spawned immediately.
    pub fn new(
        data_directory: &DataDirectory,
        session: Arc<dyn SessionContext>,
        host: Arc<dyn HostMonitor>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self::with_options(
            data_directory,
            session,
            host,
            notifier,
            PersistenceOptions::default(),
        )
    }

    /// Create a repository with custom timing options.
    pub fn with_options(
        data_directory: &DataDirectory,
        session: Arc<dyn SessionContext>,
        host: Arc<dyn HostMonitor>,
        notifier: Arc<dyn NotificationSink>,
        options: PersistenceOptions,
    ) -> Self {
        let (save_queue, queue_rx) = mpsc::unbounded_channel();

        let inner = Arc::new(Inner {
            config_dir: data_directory.root().to_path_buf(),
            misc_dir: data_directory.misc().to_path_buf(),
            options,
            cache: RecordCache::new(),
            write_times: WriteTimes::new(),
            session,
            host,
            notifier,
            save_queue,
            cancel: CancellationToken::new(),
        });

        let writer = tokio::spawn(writer::run(inner.clone(), queue_rx));
        let watcher = tokio::spawn(watcher::run(inner.clone()));

        Self {
            inner,
            workers: Mutex::new(vec![writer, watcher]),
        }
    }

    /// Stop both background tasks.
    ///
    /// Saves still sitting in the queue are lost; callers that care flush
    /// with `save_all` and a drain pause beforehand.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut workers = self.workers.lock().await;
        for worker in workers.drain(..) {
            if let Err(error) = worker.await {
                tracing::warn!("Persistence worker did not stop cleanly: {}", error);
            }
        }
    }
}
