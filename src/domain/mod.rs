// Domain layer - models, ports and repository interfaces
pub mod context;
pub mod errors;
pub mod models;
pub mod repositories;
