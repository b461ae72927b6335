//! Configuration file management for `tcc`.
//!
//! Provides a TOML-based config file at `~/.config/tcc/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use tcc_db::config::DbConfig;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the `tcc` config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/tcc` or `~/.config/tcc`. We
/// intentionally ignore the platform-specific `dirs::config_dir()` (which
/// returns `~/Library/Application Support` on macOS).
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("tcc");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("tcc")
}

/// Return the path to the `tcc` config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct TccConfig {
    pub db_config: DbConfig,
}

impl TccConfig {
    /// Resolve the database URL using the chain: CLI flag > `TCC_DATABASE_URL`
    /// env > legacy `FLOW_DB_DSN` env > config file >
    /// [`DbConfig::DEFAULT_URL`].
    pub fn resolve(cli_db_url: Option<&str>) -> Result<Self> {
        let file_config = load_config().ok();

        let db_url = if let Some(url) = cli_db_url {
            url.to_string()
        } else if let Ok(url) = std::env::var("TCC_DATABASE_URL") {
            url
        } else if let Ok(url) = std::env::var("FLOW_DB_DSN") {
            url
        } else if let Some(ref cfg) = file_config {
            cfg.database.url.clone()
        } else {
            DbConfig::DEFAULT_URL.to_string()
        };

        Ok(Self {
            db_config: DbConfig::new(db_url),
        })
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        crate::test_util::lock_env()
    }

    #[test]
    fn save_and_load_config_roundtrip() {
        let _lock = lock_env();
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path().join("tcc");
        let path = dir.join("config.toml");

        let original = ConfigFile {
            database: DatabaseSection {
                url: "postgresql://testhost:5432/testdb".to_string(),
            },
        };

        std::fs::create_dir_all(&dir).unwrap();
        let contents = toml::to_string_pretty(&original).unwrap();
        std::fs::write(&path, &contents).unwrap();

        let loaded_contents = std::fs::read_to_string(&path).unwrap();
        let loaded: ConfigFile = toml::from_str(&loaded_contents).unwrap();

        assert_eq!(loaded.database.url, original.database.url);
    }

    #[cfg(unix)]
    #[test]
    fn save_config_sets_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let _lock = lock_env();
        let tmp = tempfile::TempDir::new().unwrap();
        let file = tmp.path().join("test.toml");
        std::fs::write(&file, "test").unwrap();

        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&file, perms).unwrap();

        let meta = std::fs::metadata(&file).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
    }

    #[test]
    fn resolve_with_cli_flag_overrides_all() {
        let _lock = lock_env();

        unsafe { std::env::set_var("TCC_DATABASE_URL", "postgresql://env:5432/envdb") };

        let config = TccConfig::resolve(Some("postgresql://cli:5432/clidb")).unwrap();
        assert_eq!(config.db_config.database_url, "postgresql://cli:5432/clidb");

        unsafe { std::env::remove_var("TCC_DATABASE_URL") };
    }

    #[test]
    fn resolve_with_env_var_overrides_default() {
        let _lock = lock_env();

        unsafe { std::env::set_var("TCC_DATABASE_URL", "postgresql://env:5432/envdb") };

        let config = TccConfig::resolve(None).unwrap();
        assert_eq!(config.db_config.database_url, "postgresql://env:5432/envdb");

        unsafe { std::env::remove_var("TCC_DATABASE_URL") };
    }

    #[test]
    fn resolve_falls_back_to_legacy_flow_db_dsn() {
        let _lock = lock_env();

        unsafe { std::env::remove_var("TCC_DATABASE_URL") };
        unsafe { std::env::set_var("FLOW_DB_DSN", "postgresql://legacy:5432/legacydb") };

        let config = TccConfig::resolve(None).unwrap();
        assert_eq!(config.db_config.database_url, "postgresql://legacy:5432/legacydb");

        unsafe { std::env::remove_var("FLOW_DB_DSN") };
    }

    #[test]
    fn resolve_defaults_db_url_when_nothing_set() {
        let _lock = lock_env();

        unsafe { std::env::remove_var("TCC_DATABASE_URL") };
        unsafe { std::env::remove_var("FLOW_DB_DSN") };

        let config = TccConfig::resolve(None).unwrap();
        assert_eq!(config.db_config.database_url, DbConfig::DEFAULT_URL);
    }

    #[test]
    fn config_path_ends_with_expected_filename() {
        let path = config_path();
        assert!(
            path.ends_with("tcc/config.toml"),
            "unexpected config path: {}",
            path.display()
        );
    }
}
