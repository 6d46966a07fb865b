use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use filetime::FileTime;
use rand::random;
use tokio::fs;
use tokio::time::sleep;

use crate::domain::context::{Notification, NotificationSink};
use crate::domain::models::character::{CharacterConfig, Currency, ItemResult};
use crate::domain::repositories::config_repository::ConfigRepository;
use crate::infrastructure::host::StaticHostMonitor;
use crate::infrastructure::persistence::file_system::DataDirectory;
use crate::infrastructure::session::SharedSession;

use super::{FileConfigRepository, PersistenceOptions};

struct CountingNotifier {
    count: AtomicUsize,
}

impl CountingNotifier {
    fn new() -> Self {
        Self {
            count: AtomicUsize::new(0),
        }
    }

    fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl NotificationSink for CountingNotifier {
    fn notify(&self, _notification: Notification) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

fn unique_temp_root() -> PathBuf {
    std::env::temp_dir().join(format!("lootledger-engine-{}", random::<u64>()))
}

/// Options short enough that background work finishes within a test.
fn fast_options() -> PersistenceOptions {
    PersistenceOptions {
        write_interval: Duration::from_millis(10),
        watch_interval: Duration::from_millis(50),
        write_retry_delay: Duration::from_millis(5),
        ..PersistenceOptions::default()
    }
}

fn sample_config(name: &str) -> CharacterConfig {
    let mut config = CharacterConfig::new();
    config.character_name = name.to_string();
    config.world = "Coeurl".to_string();
    config.record_currency_gain(Currency::Gil, 5000);
    config.record_venture(3, ItemResult::new(27, 2, false), ItemResult::default());
    config
}

struct Harness {
    repository: FileConfigRepository,
    session: Arc<SharedSession>,
    notifier: Arc<CountingNotifier>,
    root: PathBuf,
}

impl Harness {
    fn config_path(&self, id: u64) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }

    fn misc_dir(&self) -> PathBuf {
        self.root.join(DataDirectory::MISC_DIR)
    }

    async fn backup_count(&self, id: u64) -> usize {
        let prefix = format!("{id}.json.bak.");
        let mut count = 0;
        let mut entries = fs::read_dir(self.misc_dir()).await.expect("read misc dir");
        while let Some(entry) = entries.next_entry().await.expect("read misc entry") {
            if entry.file_name().to_string_lossy().starts_with(&prefix) {
                count += 1;
            }
        }
        count
    }

    async fn write_external(&self, id: u64, config: &CharacterConfig) {
        let json = serde_json::to_string_pretty(config).expect("serialize external record");
        fs::write(self.config_path(id), json)
            .await
            .expect("write external record");
    }

    /// Give a file a modification time the engine has definitely not seen.
    fn stamp_mtime(&self, path: &std::path::Path, unix_seconds: i64) {
        filetime::set_file_mtime(path, FileTime::from_unix_time(unix_seconds, 0))
            .expect("set file mtime");
    }

    async fn read_disk(&self, id: u64) -> Option<CharacterConfig> {
        let contents = fs::read_to_string(self.config_path(id)).await.ok()?;
        serde_json::from_str(&contents).ok()
    }

    async fn teardown(self) {
        self.repository.shutdown().await;
        let _ = fs::remove_dir_all(&self.root).await;
    }
}

async fn setup(instances: usize) -> Harness {
    let root = unique_temp_root();
    let data_directory = DataDirectory::new(root.clone());
    data_directory
        .initialize()
        .await
        .expect("create data directories");

    let session = Arc::new(SharedSession::new());
    let notifier = Arc::new(CountingNotifier::new());
    let repository = FileConfigRepository::with_options(
        &data_directory,
        session.clone(),
        Arc::new(StaticHostMonitor::new(instances)),
        notifier.clone(),
        fast_options(),
    );

    Harness {
        repository,
        session,
        notifier,
        root,
    }
}

async fn wait_for(description: &str, mut condition: impl AsyncFnMut() -> bool) {
    for _ in 0..300 {
        if condition().await {
            return;
        }
        sleep(Duration::from_millis(10)).await;
    }

    panic!("timed out waiting for {description}");
}

#[tokio::test]
async fn save_reaches_disk_and_survives_a_fresh_load() {
    let harness = setup(1).await;
    let config = sample_config("Aki Vance");

    harness.repository.save(42, config.clone()).await;

    wait_for("record to reach disk", async || {
        harness.read_disk(42).await.as_ref() == Some(&config)
    })
    .await;

    // A second engine over the same directory starts from an empty cache
    let data_directory = DataDirectory::new(harness.root.clone());
    let reloaded_repository = FileConfigRepository::with_options(
        &data_directory,
        Arc::new(SharedSession::new()),
        Arc::new(StaticHostMonitor::new(1)),
        Arc::new(CountingNotifier::new()),
        fast_options(),
    );

    let reloaded = reloaded_repository.load(42).await;
    assert_eq!(reloaded, config);

    reloaded_repository.shutdown().await;
    harness.teardown().await;
}

#[tokio::test]
async fn later_save_wins_before_the_queue_drains() {
    let harness = setup(1).await;
    let first = sample_config("First");
    let second = sample_config("Second");

    harness.repository.save(42, first).await;
    harness.repository.save(42, second.clone()).await;

    wait_for("second record to reach disk", async || {
        harness.read_disk(42).await.as_ref() == Some(&second)
    })
    .await;

    assert_eq!(harness.repository.get(42).await, Some(second));

    harness.teardown().await;
}

#[tokio::test]
async fn backups_never_exceed_the_cap() {
    let harness = setup(1).await;
    let config = sample_config("Backed Up");

    harness.write_external(9, &config).await;

    // Six stale backups, oldest first
    for index in 0..6u64 {
        let backup = harness.misc_dir().join(format!("9.json.bak.20240101{:02}", index));
        fs::write(&backup, "{}").await.expect("seed backup");
        harness.stamp_mtime(&backup, 1_700_000_000 + index as i64 * 3600);
    }

    harness.repository.save(9, config).await;

    assert!(harness.backup_count(9).await <= 5);

    // The two oldest seeded backups are the ones that went
    assert!(!harness.misc_dir().join("9.json.bak.2024010100").exists());
    assert!(!harness.misc_dir().join("9.json.bak.2024010101").exists());
    assert!(harness.misc_dir().join("9.json.bak.2024010105").exists());

    harness.teardown().await;
}

#[tokio::test]
async fn external_change_is_adopted_for_inactive_characters() {
    let harness = setup(1).await;
    let original = sample_config("Original");
    let edited = sample_config("Edited Elsewhere");

    harness.repository.save(7, original.clone()).await;
    wait_for("original record to reach disk", async || {
        harness.read_disk(7).await.as_ref() == Some(&original)
    })
    .await;

    harness.write_external(7, &edited).await;
    let path = harness.config_path(7);
    harness.stamp_mtime(&path, 1_600_000_000);

    wait_for("watcher to adopt the external edit", async || {
        harness.repository.get(7).await.as_ref() == Some(&edited)
    })
    .await;

    harness.teardown().await;
}

#[tokio::test]
async fn active_character_is_exempt_from_reconciliation() {
    let harness = setup(1).await;
    let original = sample_config("Mine");
    let edited = sample_config("Not Mine");

    harness.session.set_active(7);
    harness.repository.save(7, original.clone()).await;
    wait_for("record to reach disk", async || {
        harness.read_disk(7).await.is_some()
    })
    .await;

    harness.write_external(7, &edited).await;
    let path = harness.config_path(7);
    harness.stamp_mtime(&path, 1_600_000_000);

    // Several watcher wakes later the cached record is still ours
    sleep(Duration::from_millis(300)).await;
    assert_eq!(harness.repository.get(7).await, Some(original));

    harness.teardown().await;
}

#[tokio::test]
async fn watcher_discovers_records_written_by_another_instance() {
    let harness = setup(1).await;
    let foreign = sample_config("From Another Instance");

    harness.write_external(33, &foreign).await;

    wait_for("watcher to pick up the new record", async || {
        harness.repository.get(33).await.as_ref() == Some(&foreign)
    })
    .await;

    harness.teardown().await;
}

#[tokio::test]
async fn load_of_missing_file_falls_back_to_default() {
    let harness = setup(1).await;

    let loaded = harness.repository.load(123).await;

    assert_eq!(loaded, CharacterConfig::new());
    // One warning after the final read attempt, not one per attempt
    assert_eq!(harness.notifier.count(), 1);
    assert_eq!(harness.repository.get(123).await, Some(CharacterConfig::new()));

    harness.teardown().await;
}

#[tokio::test]
async fn load_of_corrupt_file_falls_back_to_default() {
    let harness = setup(1).await;

    fs::write(harness.config_path(55), "not json {{")
        .await
        .expect("write corrupt file");

    let loaded = harness.repository.load(55).await;

    assert_eq!(loaded, CharacterConfig::new());
    // Corrupt content is not a read failure; no notification is raised
    assert_eq!(harness.notifier.count(), 0);

    harness.teardown().await;
}

#[tokio::test]
async fn exhausted_write_retries_notify_once_and_keep_the_record() {
    let harness = setup(1).await;
    let config = sample_config("Stubborn");

    // A directory squatting on the target path makes every rename fail
    fs::create_dir(harness.config_path(7))
        .await
        .expect("block target path");

    harness.repository.save(7, config.clone()).await;

    wait_for("write retries to exhaust", async || {
        harness.notifier.count() >= 1
    })
    .await;

    // No further notifications from the same save, and no data loss
    sleep(Duration::from_millis(100)).await;
    assert_eq!(harness.notifier.count(), 1);
    assert_eq!(harness.repository.get(7).await, Some(config));

    harness.teardown().await;
}

#[tokio::test]
async fn delete_removes_the_file_but_not_its_backups() {
    let harness = setup(1).await;
    let config = sample_config("Doomed");

    harness.repository.save(9, config).await;
    wait_for("record to reach disk", async || {
        harness.read_disk(9).await.is_some()
    })
    .await;

    for index in 0..3u64 {
        let backup = harness.misc_dir().join(format!("9.json.bak.20240101{:02}", index));
        fs::write(&backup, "{}").await.expect("seed backup");
    }

    harness.repository.delete(9).await;

    assert!(!harness.config_path(9).exists());
    assert_eq!(harness.backup_count(9).await, 3);
    assert!(harness.repository.records().await.is_empty());

    harness.repository.load_all().await;
    assert!(harness.repository.records().await.is_empty());

    harness.teardown().await;
}

#[tokio::test]
async fn save_current_without_an_active_character_does_nothing() {
    let harness = setup(1).await;

    harness.repository.save_current().await;

    sleep(Duration::from_millis(100)).await;
    assert!(!harness.config_path(0).exists());
    assert_eq!(harness.backup_count(0).await, 0);

    harness.teardown().await;
}

#[tokio::test]
async fn save_current_persists_the_active_character() {
    let harness = setup(1).await;
    let config = sample_config("Active");

    harness.session.set_active(11);
    harness.repository.save(11, config.clone()).await;
    wait_for("record to reach disk", async || {
        harness.read_disk(11).await.is_some()
    })
    .await;

    // Mutate the cached record the way the scanner glue does, then save again
    let mut updated = harness.repository.get(11).await.expect("cached record");
    updated.record_currency_gain(Currency::Mgp, 333);
    harness.repository.save(11, updated.clone()).await;
    harness.repository.save_current().await;

    wait_for("updated record to reach disk", async || {
        harness.read_disk(11).await.as_ref() == Some(&updated)
    })
    .await;

    harness.teardown().await;
}

#[tokio::test]
async fn save_all_is_skipped_when_another_instance_runs() {
    let harness = setup(2).await;
    let config = sample_config("Contended");

    harness.write_external(1, &config).await;
    harness.repository.load(1).await;
    fs::remove_file(harness.config_path(1))
        .await
        .expect("remove record file");

    harness.repository.save_all().await;

    sleep(Duration::from_millis(150)).await;
    assert!(!harness.config_path(1).exists());

    harness.teardown().await;
}

#[tokio::test]
async fn save_all_persists_every_tracked_character() {
    let harness = setup(1).await;
    let first = sample_config("One");
    let second = sample_config("Two");

    harness.write_external(1, &first).await;
    harness.write_external(2, &second).await;
    harness.repository.load(1).await;
    harness.repository.load(2).await;

    fs::remove_file(harness.config_path(1))
        .await
        .expect("remove first record file");
    fs::remove_file(harness.config_path(2))
        .await
        .expect("remove second record file");

    harness.repository.save_all().await;

    wait_for("both records to come back", async || {
        harness.config_path(1).exists() && harness.config_path(2).exists()
    })
    .await;

    harness.teardown().await;
}

#[tokio::test]
async fn stale_temp_file_is_cleaned_up_by_the_next_save() {
    let harness = setup(1).await;
    let config = sample_config("Recovered");

    let temp_path = harness.misc_dir().join("42.json.tmp");
    fs::write(&temp_path, "half a record")
        .await
        .expect("seed stale temp file");

    harness.repository.save(42, config.clone()).await;

    wait_for("record to reach disk", async || {
        harness.read_disk(42).await.as_ref() == Some(&config)
    })
    .await;

    assert!(!temp_path.exists());

    harness.teardown().await;
}

#[tokio::test]
async fn saving_after_shutdown_is_a_quiet_noop() {
    let harness = setup(1).await;

    harness.repository.shutdown().await;
    harness.repository.save(42, sample_config("Too Late")).await;

    sleep(Duration::from_millis(100)).await;
    assert!(!harness.config_path(42).exists());

    let _ = fs::remove_dir_all(&harness.root).await;
}

#[tokio::test]
async fn cache_replaces_records_wholesale() {
    let cache = super::cache::RecordCache::new();

    let mut first = sample_config("Before");
    first.record_currency_gain(Currency::Gil, 100);
    cache.set(5, first).await;

    let second = sample_config("After");
    cache.set(5, second.clone()).await;

    assert_eq!(cache.get(5).await, Some(second));
    assert_eq!(cache.all().await.len(), 1);

    assert!(cache.remove(5).await);
    assert!(!cache.remove(5).await);
    assert!(cache.get(5).await.is_none());
}
