use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};

use annexx_app::Application;
use annexx_db::DatabaseRole;
use annexx_kernel::{Environment, SettingsLoader};

/// Exit code when at least one database is unreachable.
const UNHEALTHY: u8 = 2;

#[derive(Debug, Parser)]
#[command(name = "annexx", version, about = "Annexx operator commands")]
struct Cli {
    /// Deployment environment
    #[arg(long, short = 'e', global = true, env = "ANNEXX_ENV", default_value = "development")]
    environment: String,

    /// Application root holding `.env` files and `config/`
    #[arg(long, global = true, env = "ANNEXX_ROOT")]
    root: Option<PathBuf>,

    /// Directory with `base.toml` and `<environment>.toml`
    #[arg(long, global = true, env = "ANNEXX_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show which env files were loaded and the keys they define
    Env {
        /// Print values as well as keys
        #[arg(long)]
        show_values: bool,
    },
    /// Database role commands
    Db {
        #[command(subcommand)]
        command: DbCommand,
    },
    /// Run the HTTP server
    Serve,
}

#[derive(Debug, Subcommand)]
enum DbCommand {
    /// Check connectivity of every role, or of one role
    Status {
        #[arg(long)]
        role: Option<String>,
    },
}

impl Cli {
    fn settings_loader(&self) -> anyhow::Result<SettingsLoader> {
        let environment: Environment = self.environment.parse()?;
        let root = match &self.root {
            Some(root) => root.clone(),
            None => std::env::current_dir().context("unable to resolve current directory")?,
        };

        let mut loader = SettingsLoader::new(environment, root);
        if let Some(dir) = &self.config_dir {
            loader = loader.with_config_dir(dir);
        }
        Ok(loader)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let loader = cli.settings_loader()?;

    match cli.command {
        Command::Env { show_values } => {
            let (_, env_files) = loader.load().with_context(|| "failed to load settings")?;
            println!("environment: {}", env_files.environment());
            for source in env_files.sources() {
                println!("source: {}", source.display());
            }
            for warning in env_files.warnings() {
                println!("warning: {warning}");
            }
            for (key, value) in env_files.entries() {
                if show_values {
                    println!("{key}={value}");
                } else {
                    println!("{key}");
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Db {
            command: DbCommand::Status { role },
        } => {
            let role = role.map(|name| name.parse::<DatabaseRole>()).transpose()?;
            let app = Application::configure(&loader)?;

            let healthy = match role {
                Some(role) => {
                    let status = app.databases.status_of(role).await;
                    println!("{}", serde_json::to_string_pretty(&status)?);
                    status.ok
                }
                None => {
                    let status = app.databases.status_all().await;
                    println!("{}", serde_json::to_string_pretty(&status)?);
                    status.all_ok()
                }
            };

            if healthy {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::from(UNHEALTHY))
            }
        }
        Command::Serve => {
            let app = Application::configure(&loader)?;
            app.init_telemetry()?;
            tracing::info!(env = ?app.settings.environment, "annexx serve");
            app.serve().await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
