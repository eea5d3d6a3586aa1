//! Startup configuration for Annexx: environment selection, env files, and
//! layered settings.

pub mod env_files;
pub mod settings;

pub use env_files::{EnvFileLoader, LoadWarning, LoadedEnv};
pub use settings::{Environment, Settings, SettingsLoader};
