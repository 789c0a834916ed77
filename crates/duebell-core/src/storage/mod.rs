mod config;
mod task_file;

pub use config::{Config, EngineConfig, NotificationsConfig, SoundConfig};
pub use task_file::TaskFile;

use std::path::PathBuf;

use crate::error::Result;

/// Returns the data directory, creating it if needed.
///
/// `DUEBELL_DATA_DIR` wins when set. Otherwise `~/.config/duebell`, or
/// `~/.config/duebell-dev` with `DUEBELL_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("DUEBELL_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("DUEBELL_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("duebell-dev")
            } else {
                base_dir.join("duebell")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
