//! Configuration and file management for the GitHub PR tracker
//!
//! This crate provides:
//! - Configuration file loading (TOML)
//! - Application configuration (AppConfig) shared by the server and the watcher
//! - XDG config and cache directories

pub mod app_config;
pub mod config_file;
pub mod paths;

pub use app_config::AppConfig;
pub use config_file::{load_config_file, load_config_file_from};
pub use paths::{cache_dir, config_dir};
