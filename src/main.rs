use annexx_app::Application;
use annexx_kernel::SettingsLoader;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app = Application::configure(&SettingsLoader::from_process()?)?;
    app.init_telemetry()?;

    tracing::info!("annexx-app bootstrap complete");
    app.serve().await
}
