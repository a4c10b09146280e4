use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = ".gh-pr-tracker.toml";

/// Load config file content from CWD first, then home directory
///
/// Searches for the config in:
/// 1. `./.gh-pr-tracker.toml`
/// 2. `~/.gh-pr-tracker.toml`
/// 3. `<config_dir>/config.toml`
///
/// Returns the file content if found, None otherwise.
pub fn load_config_file() -> Option<String> {
    let candidates = [
        Some(PathBuf::from(CONFIG_FILE)),
        home_config_path(),
        crate::paths::app_config_path().ok(),
    ];

    candidates
        .into_iter()
        .flatten()
        .find_map(|path| load_config_file_from(&path))
}

/// Read a single config file, logging where it came from
pub fn load_config_file_from(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            log::debug!("Loaded config from {}", path.display());
            Some(content)
        }
        Err(_) => None,
    }
}

/// `~/.gh-pr-tracker.toml`, if HOME is set
fn home_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_FILE))
}
