//! Application path management
//!
//! Resolves where the configuration file and log directory live:
//!
//! - **Explicit**: `--config <path>` always wins; logs go next to it.
//! - **Working directory**: a `config.yaml` in the current directory is used
//!   as is, which keeps development runs self-contained.
//! - **Installed** (default): the platform config directory
//!   (`%APPDATA%\joyhub`, `~/.config/joyhub`, ...), with logs in the
//!   platform data directory.

use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Application name used for directories in installed mode
const APP_NAME: &str = "joyhub";

/// Configuration file name looked up in the working directory
const CONFIG_FILE: &str = "config.yaml";

/// Application paths for config and logs
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Path to the configuration file (may not exist)
    pub config: PathBuf,
    /// Default directory for log files
    pub logs_dir: PathBuf,
}

impl AppPaths {
    /// Detect the paths to use
    ///
    /// Note: This is called before logging is initialized, so nothing here
    /// logs.
    pub fn detect(explicit_config: Option<&Path>) -> Self {
        if let Some(config) = explicit_config {
            let base = config
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            return Self {
                config: config.to_path_buf(),
                logs_dir: base.join("logs"),
            };
        }

        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let cwd_config = cwd.join(CONFIG_FILE);
        if cwd_config.exists() {
            return Self {
                config: cwd_config,
                logs_dir: cwd.join("logs"),
            };
        }

        Self::installed(dirs::config_dir(), dirs::data_dir(), &cwd)
    }

    /// Installed-mode layout under the given platform directories
    ///
    /// Falls back to `fallback` when the platform reports no directory.
    fn installed(config_dir: Option<PathBuf>, data_dir: Option<PathBuf>, fallback: &Path) -> Self {
        let config_base = config_dir.unwrap_or_else(|| fallback.to_path_buf()).join(APP_NAME);
        let data_base = data_dir.unwrap_or_else(|| fallback.to_path_buf()).join(APP_NAME);
        Self {
            config: config_base.join(CONFIG_FILE),
            logs_dir: data_base.join("logs"),
        }
    }

    /// Directory holding the config file
    pub fn base_dir(&self) -> PathBuf {
        self.config
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Directory for log files
    ///
    /// A configured directory wins; relative ones are taken from the config
    /// file's directory.
    pub fn log_dir(&self, configured: Option<&Path>) -> PathBuf {
        match configured {
            Some(dir) => self.base_dir().join(dir),
            None => self.logs_dir.clone(),
        }
    }

    /// Create a log directory if it does not exist yet
    pub fn ensure_dir(dir: &Path) -> anyhow::Result<()> {
        if !dir.exists() {
            debug!("Creating directory: {}", dir.display());
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_config() {
        let paths = AppPaths::detect(Some(Path::new("/etc/joyhub/custom.yaml")));
        assert_eq!(paths.config, PathBuf::from("/etc/joyhub/custom.yaml"));
        assert_eq!(paths.logs_dir, PathBuf::from("/etc/joyhub/logs"));
        assert_eq!(paths.base_dir(), PathBuf::from("/etc/joyhub"));
    }

    #[test]
    fn test_installed_layout() {
        let paths = AppPaths::installed(
            Some(PathBuf::from("/home/u/.config")),
            Some(PathBuf::from("/home/u/.local/share")),
            Path::new("/tmp"),
        );
        assert_eq!(paths.config, PathBuf::from("/home/u/.config/joyhub/config.yaml"));
        assert_eq!(paths.logs_dir, PathBuf::from("/home/u/.local/share/joyhub/logs"));
    }

    #[test]
    fn test_installed_fallback() {
        let paths = AppPaths::installed(None, None, Path::new("/opt/app"));
        assert_eq!(paths.config, PathBuf::from("/opt/app/joyhub/config.yaml"));
    }

    #[test]
    fn test_log_dir_resolution() {
        let paths = AppPaths::detect(Some(Path::new("/etc/joyhub/custom.yaml")));
        assert_eq!(paths.log_dir(None), PathBuf::from("/etc/joyhub/logs"));
        assert_eq!(
            paths.log_dir(Some(Path::new("trace"))),
            PathBuf::from("/etc/joyhub/trace")
        );
        assert_eq!(
            paths.log_dir(Some(Path::new("/var/log/joyhub"))),
            PathBuf::from("/var/log/joyhub")
        );
    }

    #[test]
    fn test_ensure_dir() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("nested").join("logs");
        AppPaths::ensure_dir(&logs).unwrap();
        assert!(logs.is_dir());
        // Second call is a no-op
        AppPaths::ensure_dir(&logs).unwrap();
    }
}
