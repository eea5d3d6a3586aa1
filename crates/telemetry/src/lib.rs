//! Logging bootstrap for Annexx binaries.

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

use annexx_kernel::settings::{LogFormat, TelemetrySettings};

/// Build the filter, preferring `RUST_LOG` over the configured level.
pub fn env_filter(settings: &TelemetrySettings) -> anyhow::Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&settings.log_level)
            .with_context(|| format!("invalid log level '{}'", settings.log_level)),
    }
}

/// Install the global subscriber. Later calls are ignored.
pub fn init(settings: &TelemetrySettings) -> anyhow::Result<()> {
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
    let fmt_layer = match settings.log_format {
        LogFormat::Json => fmt_layer.json().boxed(),
        LogFormat::Pretty => fmt_layer.boxed(),
    };

    let registry = Registry::default().with(env_filter(settings)?).with(fmt_layer);

    if registry.try_init().is_err() {
        tracing::debug!(target: "annexx-telemetry", "global subscriber already installed");
    }

    Ok(())
}
