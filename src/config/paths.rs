use std::path::{Path, PathBuf};

const APP_DIR: &str = "lift_feed";

fn config_root() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| Path::new(".").to_path_buf())
        .join(APP_DIR)
}

/// Returns the platform-specific path for the config file.
///
/// # Notes
/// - Uses platform-specific config directory (e.g., ~/.config on Linux)
/// - Falls back to current directory if config directory is unavailable
pub fn get_config_path() -> String {
    config_root().join("config.toml").to_string_lossy().to_string()
}

/// Returns the platform-specific path for the log directory.
pub fn get_log_dir_path() -> String {
    config_root().join("logs").to_string_lossy().to_string()
}

/// Returns the default directory for cached snapshots and fetch logs.
///
/// Prefers the platform data directory (e.g., ~/.local/share on Linux) and
/// falls back to `./data` when it is unavailable.
pub fn get_data_dir_path() -> String {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR).join("data"))
        .unwrap_or_else(|| Path::new(".").join("data"))
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_namespaced() {
        assert!(get_config_path().contains(APP_DIR));
        assert!(get_config_path().ends_with("config.toml"));
        assert!(get_log_dir_path().ends_with("logs"));
        assert!(get_data_dir_path().ends_with("data"));
    }
}
