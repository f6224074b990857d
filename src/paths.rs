//! Where aigo keeps its files
//!
//! The server owns one SQLite file under the XDG data directory and reads an
//! optional `aigo.toml` from the XDG config directory. Frontend assets are
//! looked up relative to the working directory, since they ship next to the
//! binary rather than being installed per user. `AIGO_DB`, `AIGO_CONFIG` and
//! `AIGO_PUBLIC_DIR` replace any of the three outright.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// `$<xdg_var>/aigo`, else `$HOME/<home_relative>/aigo`, else `.`
fn xdg_dir(xdg_var: &str, home_relative: &str) -> PathBuf {
    if let Ok(xdg) = std::env::var(xdg_var) {
        return PathBuf::from(xdg).join("aigo");
    }
    std::env::var("HOME")
        .map(|home| PathBuf::from(home).join(home_relative).join("aigo"))
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Directory holding the database
pub fn data_dir() -> PathBuf {
    xdg_dir("XDG_DATA_HOME", ".local/share")
}

/// Directory holding `aigo.toml`
pub fn config_dir() -> PathBuf {
    xdg_dir("XDG_CONFIG_HOME", ".config")
}

/// Get the database path
///
/// Priority: `AIGO_DB` env var > `data_dir()/aigo.db`
pub fn db_path() -> PathBuf {
    std::env::var("AIGO_DB")
        .map(PathBuf::from)
        .unwrap_or_else(|_| data_dir().join("aigo.db"))
}

/// Get the config file path
///
/// Priority: `AIGO_CONFIG` env var > `config_dir()/aigo.toml`
pub fn config_path() -> PathBuf {
    std::env::var("AIGO_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| config_dir().join("aigo.toml"))
}

/// Get the frontend asset directory
///
/// Priority: `AIGO_PUBLIC_DIR` env var > `./public`
pub fn public_dir() -> PathBuf {
    std::env::var("AIGO_PUBLIC_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("public"))
}

/// Create the directory that will hold `db_path`
pub fn ensure_db_dir(db_path: &Path) -> Result<()> {
    let Some(dir) = db_path.parent().filter(|d| !d.as_os_str().is_empty()) else {
        return Ok(());
    };
    if !dir.exists() {
        debug!("creating data directory: {}", dir.display());
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create data directory: {}", dir.display()))?;
    }

    Ok(())
}

/// Log resolved paths at startup
pub fn log_paths() {
    info!("data directory: {}", data_dir().display());
    info!("config file: {}", config_path().display());
    info!("database: {}", db_path().display());
    info!("public assets: {}", public_dir().display());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_path_ends_with_file_name() {
        // Either the override or the default location; both name a file.
        assert!(db_path().file_name().is_some());
    }

    #[test]
    fn test_ensure_db_dir_creates_parent() -> Result<()> {
        let root = std::env::temp_dir().join(format!("aigo-paths-{}", uuid::Uuid::new_v4()));
        let db = root.join("nested/aigo.db");
        ensure_db_dir(&db)?;
        assert!(root.join("nested").is_dir());
        // Bare file names need no directory.
        ensure_db_dir(Path::new("aigo.db"))?;
        std::fs::remove_dir_all(&root)?;
        Ok(())
    }

    #[test]
    fn test_xdg_dir_ends_in_aigo_or_falls_back() {
        let dir = xdg_dir("AIGO_TEST_UNSET_XDG_VAR", ".local/share");
        assert!(dir.ends_with("aigo") || dir == PathBuf::from("."));
    }

    #[test]
    fn test_config_path_is_toml_by_default() {
        if std::env::var("AIGO_CONFIG").is_err() {
            assert_eq!(
                config_path().extension().and_then(|e| e.to_str()),
                Some("toml")
            );
        }
    }
}
