use std::path::{Path, PathBuf};
use std::time::Duration;

use connect_core::DEFAULT_BASE_URL;

pub const DEFAULT_FOLDER_NAME: &str = "Checklists";
const DEFAULT_DEBOUNCE_MS: u64 = 1000;
const DEFAULT_DATA_DIR_NAME: &str = "tc-checklist";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncConfig {
    pub api_base: String,
    pub folder_name: String,
    pub debounce: Duration,
    pub data_dir: PathBuf,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_BASE_URL.to_string(),
            folder_name: DEFAULT_FOLDER_NAME.to_string(),
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            data_dir: default_data_dir(),
        }
    }
}

impl SyncConfig {
    pub fn from_env() -> Self {
        let home = dirs::home_dir();
        let data_dir = std::env::var("CHECKLIST_DATA_DIR")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(|value| match &home {
                Some(home) => expand_with_home(&value, home),
                None => PathBuf::from(value),
            })
            .unwrap_or_else(default_data_dir);
        let api_base = std::env::var("CHECKLIST_API_BASE")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let folder_name = std::env::var("CHECKLIST_FOLDER")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FOLDER_NAME.to_string());
        let debounce =
            Duration::from_millis(read_u64_env("CHECKLIST_DEBOUNCE_MS", DEFAULT_DEBOUNCE_MS));

        Self {
            api_base,
            folder_name,
            debounce,
            data_dir,
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(DEFAULT_DATA_DIR_NAME)
}

fn expand_with_home(value: &str, home: &Path) -> PathBuf {
    if value == "~" {
        return home.to_path_buf();
    }
    if let Some(rest) = value.strip_prefix("~/") {
        return home.join(rest);
    }
    PathBuf::from(value)
}

fn read_u64_env(name: &str, default: u64) -> u64 {
    parse_u64(std::env::var(name).ok().as_deref(), default)
}

fn parse_u64(value: Option<&str>, default: u64) -> u64 {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_home_prefix() {
        let home = PathBuf::from("/home/site");
        assert_eq!(expand_with_home("~", &home), home);
        assert_eq!(
            expand_with_home("~/lists", &home),
            PathBuf::from("/home/site/lists")
        );
        assert_eq!(
            expand_with_home("/var/lists", &home),
            PathBuf::from("/var/lists")
        );
    }

    #[test]
    fn invalid_numbers_fall_back_to_default() {
        assert_eq!(parse_u64(Some("250"), 1000), 250);
        assert_eq!(parse_u64(Some(" 40 "), 1000), 40);
        assert_eq!(parse_u64(Some("soon"), 1000), 1000);
        assert_eq!(parse_u64(None, 1000), 1000);
    }

    #[test]
    fn defaults_point_at_eu_endpoint() {
        let config = SyncConfig::default();
        assert_eq!(config.api_base, "https://connect-eu.trimble.com/tc/api/2.0");
        assert_eq!(config.folder_name, "Checklists");
        assert_eq!(config.debounce, Duration::from_secs(1));
    }
}
