// Infrastructure layer - implements interfaces defined in the domain layer
pub mod host;
pub mod logging;
pub mod notifications;
pub mod persistence;
pub mod repositories;
pub mod session;
