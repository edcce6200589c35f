//! Data directory layout.
//!
//! Everything Outreach persists lives under one directory: the SQLite
//! database and `config.toml`.

use std::path::{Path, PathBuf};

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `OUTREACH_DATA_DIR` environment variable
/// 2. `~/.outreach`
pub fn resolve_data_dir() -> PathBuf {
    data_dir_from(std::env::var("OUTREACH_DATA_DIR").ok(), dirs::home_dir())
}

fn data_dir_from(env_dir: Option<String>, home: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = env_dir.filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }

    if let Some(home) = home {
        return home.join(".outreach");
    }

    // Last resort: current directory
    PathBuf::from(".outreach")
}

/// Create the data directory if it does not exist yet.
pub async fn ensure_data_dir(data_dir: &Path) -> Result<(), std::io::Error> {
    tokio::fs::create_dir_all(data_dir).await
}

/// Path of the `config.toml` inside `data_dir`.
pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config.toml")
}
