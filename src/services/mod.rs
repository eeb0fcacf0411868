pub mod artifact_downloader;
pub mod config_store;
pub mod event_bus;
pub mod feed_client;
pub mod install_executor;
pub mod notification_scheduler;
pub mod periodic;
pub mod quit_coordinator;
pub mod release_notes;
pub mod update_machine;
pub mod update_service;
