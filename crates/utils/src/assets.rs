use std::path::PathBuf;

use directories::ProjectDirs;

const DATA_DIR_ENV: &str = "CRECHE_DATA_DIR";

/// Directory holding the SQLite database and uploaded files.
///
/// `CRECHE_DATA_DIR` wins when set; otherwise the platform data directory is
/// used, falling back to `./data` when the platform has none.
pub fn asset_dir() -> PathBuf {
    if let Some(dir) = std::env::var(DATA_DIR_ENV)
        .ok()
        .filter(|dir| !dir.trim().is_empty())
    {
        return PathBuf::from(dir);
    }

    ProjectDirs::from("br", "creche", "creche-manager")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("data"))
}

pub fn database_path() -> PathBuf {
    asset_dir().join("db.sqlite")
}

pub fn storage_dir() -> PathBuf {
    asset_dir().join("storage")
}
