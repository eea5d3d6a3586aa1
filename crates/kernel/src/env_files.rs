//! Loading of dotenv-style `KEY=VALUE` files.
//!
//! Two files are consulted under the application root: the environment file
//! `.env.<environment>` and the shared base file `.env`. Entries from the
//! environment file are authoritative; base entries only fill keys the
//! environment file does not define. Missing or malformed files never abort
//! startup, they are recorded as [`LoadWarning`]s and logged.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Name of the base env file shared by every environment.
pub const BASE_FILE: &str = ".env";

/// Non-fatal problem encountered while loading env files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// The environment-specific file does not exist.
    MissingConfigFile { path: PathBuf },
    /// A file exists but could not be read or parsed; none of its entries were used.
    Unreadable { path: PathBuf, message: String },
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadWarning::MissingConfigFile { path } => write!(
                f,
                "environment file {} not found, using default configuration",
                path.display()
            ),
            LoadWarning::Unreadable { path, message } => {
                write!(f, "failed to read {}: {}", path.display(), message)
            }
        }
    }
}

/// Immutable result of merging the env files for one environment.
#[derive(Debug, Clone, Default)]
pub struct LoadedEnv {
    environment: String,
    entries: BTreeMap<String, String>,
    sources: Vec<PathBuf>,
    warnings: Vec<LoadWarning>,
}

impl LoadedEnv {
    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Merged entries, sorted by key.
    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    /// Files that contributed entries, in load order.
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    pub fn warnings(&self) -> &[LoadWarning] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Emit the load outcome through `tracing`.
    ///
    /// Loading usually happens before the subscriber is installed, so the
    /// bootstrap calls this once telemetry is up.
    pub fn log_summary(&self) {
        for source in &self.sources {
            tracing::info!(
                target: "annexx-kernel",
                environment = %self.environment,
                path = %source.display(),
                "loaded environment configuration"
            );
        }
        for warning in &self.warnings {
            tracing::warn!(
                target: "annexx-kernel",
                environment = %self.environment,
                "{warning}"
            );
        }
    }

    /// Copy entries into the process environment, skipping variables that are
    /// already set. Returns how many variables were exported.
    ///
    /// Settings never read from here; this exists for child processes that
    /// only understand real environment variables.
    pub fn export_missing(&self) -> usize {
        let mut exported = 0;
        for (key, value) in &self.entries {
            if std::env::var_os(key).is_none() {
                std::env::set_var(key, value);
                exported += 1;
            }
        }
        exported
    }
}

/// Locates and merges env files relative to an application root.
#[derive(Debug, Clone)]
pub struct EnvFileLoader {
    root: PathBuf,
}

impl EnvFileLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn base_file(&self) -> PathBuf {
        self.root.join(BASE_FILE)
    }

    pub fn environment_file(&self, environment: &str) -> PathBuf {
        self.root.join(format!("{BASE_FILE}.{environment}"))
    }

    /// Merge `.env.<environment>` and `.env`, the former winning on conflict.
    pub fn load(&self, environment: &str) -> LoadedEnv {
        let mut loaded = LoadedEnv {
            environment: environment.to_string(),
            ..LoadedEnv::default()
        };

        let environment_path = self.environment_file(environment);
        if environment_path.is_file() {
            merge_file(&mut loaded, environment_path);
        } else {
            tracing::debug!(
                target: "annexx-kernel",
                path = %environment_path.display(),
                "environment file missing"
            );
            loaded.warnings.push(LoadWarning::MissingConfigFile {
                path: environment_path,
            });
        }

        let base_path = self.base_file();
        if base_path.is_file() {
            merge_file(&mut loaded, base_path);
        }

        loaded
    }
}

/// Insert the file's entries without overwriting keys already present.
fn merge_file(loaded: &mut LoadedEnv, path: PathBuf) {
    match read_entries(&path) {
        Ok(entries) => {
            for (key, value) in entries {
                loaded.entries.entry(key).or_insert(value);
            }
            loaded.sources.push(path);
        }
        Err(err) => {
            tracing::debug!(
                target: "annexx-kernel",
                path = %path.display(),
                error = %err,
                "skipping unreadable env file"
            );
            loaded.warnings.push(LoadWarning::Unreadable {
                path,
                message: err.to_string(),
            });
        }
    }
}

fn read_entries(path: &Path) -> Result<Vec<(String, String)>, dotenvy::Error> {
    dotenvy::from_path_iter(path)?.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn environment_file_overrides_base() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), ".env", "A=1\n");
        write(dir.path(), ".env.staging", "A=2\nB=3\n");

        let loaded = EnvFileLoader::new(dir.path()).load("staging");

        assert_eq!(loaded.get("A"), Some("2"));
        assert_eq!(loaded.get("B"), Some("3"));
        assert_eq!(loaded.entries().len(), 2);
        assert!(loaded.warnings().is_empty());
        assert_eq!(
            loaded.sources(),
            &[dir.path().join(".env.staging"), dir.path().join(".env")]
        );
    }

    #[test]
    fn base_only_records_missing_environment_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), ".env", "A=1\n");

        let loaded = EnvFileLoader::new(dir.path()).load("staging");

        assert_eq!(loaded.get("A"), Some("1"));
        assert_eq!(loaded.entries().len(), 1);
        assert_eq!(
            loaded.warnings(),
            &[LoadWarning::MissingConfigFile {
                path: dir.path().join(".env.staging"),
            }]
        );
    }

    #[test]
    fn no_files_yields_empty_config() {
        let dir = tempfile::tempdir().unwrap();

        let loaded = EnvFileLoader::new(dir.path()).load("production");

        assert!(loaded.is_empty());
        assert!(loaded.sources().is_empty());
        assert_eq!(loaded.warnings().len(), 1);
        assert_eq!(loaded.environment(), "production");
    }

    #[test]
    fn environment_file_without_base() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), ".env.test", "ONLY=here\n");

        let loaded = EnvFileLoader::new(dir.path()).load("test");

        assert_eq!(loaded.get("ONLY"), Some("here"));
        assert!(loaded.warnings().is_empty());
    }

    #[test]
    fn malformed_file_is_skipped_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), ".env", "A=1\n");
        write(dir.path(), ".env.staging", "THIS IS NOT VALID\n");

        let loaded = EnvFileLoader::new(dir.path()).load("staging");

        assert_eq!(loaded.get("A"), Some("1"));
        assert!(matches!(
            loaded.warnings(),
            [LoadWarning::Unreadable { path, .. }] if path == &dir.path().join(".env.staging")
        ));
    }

    #[test]
    fn missing_warning_mentions_path() {
        let warning = LoadWarning::MissingConfigFile {
            path: PathBuf::from("/app/.env.staging"),
        };
        assert!(warning.to_string().contains("/app/.env.staging"));
    }

    #[test]
    #[serial_test::serial]
    fn export_missing_keeps_existing_process_values() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            ".env.staging",
            "ANNEXX_TEST_EXPORT_SET=file\nANNEXX_TEST_EXPORT_NEW=file\n",
        );
        let loaded = EnvFileLoader::new(dir.path()).load("staging");

        temp_env::with_vars(
            [
                ("ANNEXX_TEST_EXPORT_SET", Some("process")),
                ("ANNEXX_TEST_EXPORT_NEW", None),
            ],
            || {
                assert_eq!(loaded.export_missing(), 1);
                assert_eq!(
                    std::env::var("ANNEXX_TEST_EXPORT_SET").as_deref(),
                    Ok("process")
                );
                assert_eq!(
                    std::env::var("ANNEXX_TEST_EXPORT_NEW").as_deref(),
                    Ok("file")
                );
            },
        );
    }
}
