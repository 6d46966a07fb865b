pub mod file_config_repository;
