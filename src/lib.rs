//! Companion data tracker backend: per-character records persisted to local
//! disk with an asynchronous write queue, backup rotation and reconciliation
//! of changes made by other processes.

mod app;
pub mod application;
pub mod domain;
pub mod infrastructure;

pub use app::AppState;
pub use application::services::config_service::ConfigService;
pub use domain::context::{
    HostMonitor, NO_ACTIVE_CHARACTER, Notification, NotificationSink, SessionContext, Severity,
};
pub use domain::models::character::CharacterConfig;
pub use domain::repositories::config_repository::ConfigRepository;
pub use infrastructure::repositories::file_config_repository::{
    FileConfigRepository, PersistenceOptions,
};
