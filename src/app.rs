use std::path::Path;
use std::sync::Arc;

use crate::application::services::config_service::ConfigService;
use crate::domain::context::{HostMonitor, NotificationSink, SessionContext};
use crate::domain::errors::DomainError;
use crate::domain::repositories::config_repository::ConfigRepository;
use crate::infrastructure::logging::logger;
use crate::infrastructure::persistence::file_system::DataDirectory;
use crate::infrastructure::repositories::file_config_repository::{
    FileConfigRepository, PersistenceOptions,
};

/// Root object wiring the tracker backend together.
///
/// The host glue constructs one of these at login-screen time, hands it the
/// session, host-monitor and notification ports, and keeps it alive for the
/// life of the process. Everything else goes through the config service.
pub struct AppState {
    data_directory: DataDirectory,
    config_repository: Arc<FileConfigRepository>,
    config_service: Arc<ConfigService>,
}

impl AppState {
    /// Initialize the backend with default engine timing.
    pub async fn new(
        data_root: &Path,
        session: Arc<dyn SessionContext>,
        host: Arc<dyn HostMonitor>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Result<Self, DomainError> {
        Self::with_options(
            data_root,
            session,
            host,
            notifier,
            PersistenceOptions::default(),
        )
        .await
    }

    /// Initialize the backend with custom engine timing.
    pub async fn with_options(
        data_root: &Path,
        session: Arc<dyn SessionContext>,
        host: Arc<dyn HostMonitor>,
        notifier: Arc<dyn NotificationSink>,
        options: PersistenceOptions,
    ) -> Result<Self, DomainError> {
        tracing::info!("Initializing tracker with data root: {:?}", data_root);

        let data_directory = DataDirectory::new(data_root.to_path_buf());
        data_directory.initialize().await?;

        if let Err(error) = logger::init_logger(data_directory.logs()) {
            eprintln!("Failed to initialize logger: {}", error);
        }

        let config_repository = Arc::new(FileConfigRepository::with_options(
            &data_directory,
            session,
            host,
            notifier,
            options,
        ));

        config_repository.load_all().await;

        let config_service = Arc::new(ConfigService::new(
            config_repository.clone() as Arc<dyn ConfigRepository>
        ));

        tracing::info!("Tracker initialized");

        Ok(Self {
            data_directory,
            config_repository,
            config_service,
        })
    }

    pub fn data_directory(&self) -> &DataDirectory {
        &self.data_directory
    }

    pub fn config_service(&self) -> Arc<ConfigService> {
        self.config_service.clone()
    }

    /// Stop the persistence workers. Queued saves that have not drained yet
    /// are lost, so callers save what matters before getting here.
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down persistence workers");
        self.config_repository.shutdown().await;
    }
}
