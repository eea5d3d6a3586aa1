//! Annexx application bootstrap.
//!
//! Startup order: resolve the environment, merge env files and config layers
//! into [`Settings`], install telemetry, then build the database router.

use std::sync::Arc;

use anyhow::Context;

use annexx_db::DatabaseRouter;
use annexx_kernel::{LoadedEnv, Settings, SettingsLoader};

/// Configured application, shared by the server binary and the CLI.
pub struct Application {
    pub settings: Settings,
    pub env_files: LoadedEnv,
    pub databases: Arc<DatabaseRouter>,
}

impl Application {
    /// Load settings and build one lazily-connecting pool per database role.
    ///
    /// Must be called within a Tokio runtime. No connection is opened here.
    pub fn configure(loader: &SettingsLoader) -> anyhow::Result<Self> {
        let (settings, env_files) = loader
            .load()
            .with_context(|| "failed to load Annexx settings")?;

        let databases = DatabaseRouter::from_settings(&settings.database)
            .with_context(|| "failed to configure database roles")?;

        Ok(Self {
            settings,
            env_files,
            databases: Arc::new(databases),
        })
    }

    /// Install the tracing subscriber and report how configuration was loaded.
    pub fn init_telemetry(&self) -> anyhow::Result<()> {
        annexx_telemetry::init(&self.settings.telemetry)?;
        self.env_files.log_summary();
        tracing::info!(
            env = self.settings.environment.as_str(),
            force_ssl = self.settings.server.force_ssl,
            "annexx configured"
        );
        Ok(())
    }

    pub async fn serve(&self) -> anyhow::Result<()> {
        annexx_http::start_server(&self.settings, Arc::clone(&self.databases)).await
    }
}
