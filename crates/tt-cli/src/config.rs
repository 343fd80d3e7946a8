//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use tt_core::ExportTimezone;

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,

    /// Path to the snapshot of the in-progress session.
    pub session_path: PathBuf,

    /// Time zone for rendered dates (`local` or `utc`).
    #[serde(default)]
    pub export_timezone: ExportTimezone,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("session_path", &self.session_path)
            .field("export_timezone", &self.export_timezone)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        let state_dir = dirs_state_path().unwrap_or_else(|| data_dir.clone());
        Self {
            database_path: data_dir.join("tt.db"),
            session_path: state_dir.join("session.json"),
            export_timezone: ExportTimezone::default(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (TT_*)
        figment = figment.merge(Env::prefixed("TT_"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for tt.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("tt"))
}

/// Returns the platform-specific data directory for tt.
///
/// On Linux: `~/.local/share/tt`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("tt"))
}

/// Returns the platform-specific state directory for tt.
///
/// On Linux: `~/.local/state/tt`. Not every platform has one; callers fall
/// back to the data directory.
pub fn dirs_state_path() -> Option<PathBuf> {
    dirs::state_dir().map(|p| p.join("tt"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_dirs_data_path_ends_with_tt() {
        if let Some(path) = dirs_data_path() {
            assert_eq!(path.file_name().unwrap(), "tt");
        }
    }

    #[test]
    fn test_default_config_uses_data_dir_for_db() {
        let config = Config::default();
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        assert_eq!(config.database_path, data_dir.join("tt.db"));
    }

    #[test]
    fn test_default_session_path_is_json_file() {
        let config = Config::default();
        assert_eq!(config.session_path.file_name().unwrap(), "session.json");
    }

    #[test]
    fn test_default_timezone_is_local() {
        assert_eq!(Config::default().export_timezone, ExportTimezone::Local);
    }

    #[test]
    fn test_config_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
database_path = "/tmp/tt-test/history.db"
session_path = "/tmp/tt-test/session.json"
export_timezone = "utc"
"#
        )
        .unwrap();
        file.flush().unwrap();

        let config = Config::load_from(Some(file.path())).unwrap();
        assert_eq!(
            config.database_path,
            PathBuf::from("/tmp/tt-test/history.db")
        );
        assert_eq!(
            config.session_path,
            PathBuf::from("/tmp/tt-test/session.json")
        );
        assert_eq!(config.export_timezone, ExportTimezone::Utc);
    }
}
