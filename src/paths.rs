use std::path::{Path, PathBuf};

const BASE_DIR_ENV: &str = "DIALECT_TRANSLATOR_DIR";
const DEFAULT_DIR_NAME: &str = ".dialect-translator-rust";

pub(crate) fn base_dir() -> PathBuf {
    if let Some(dir) = base_dir_override() {
        return dir;
    }
    home_join(DEFAULT_DIR_NAME).unwrap_or_else(|| PathBuf::from(DEFAULT_DIR_NAME))
}

pub(crate) fn history_file() -> PathBuf {
    base_dir().join("translations.json")
}

pub(crate) fn user_id_file() -> PathBuf {
    base_dir().join("user_id")
}

fn base_dir_override() -> Option<PathBuf> {
    std::env::var(BASE_DIR_ENV)
        .ok()
        .and_then(|value| normalize_dir(&value))
}

fn home_join(suffix: &str) -> Option<PathBuf> {
    env_home().map(|home| Path::new(&home).join(suffix))
}

fn normalize_dir(value: &str) -> Option<PathBuf> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let expanded = expand_tilde(trimmed);
    Some(normalize_path(PathBuf::from(expanded)))
}

fn normalize_path(path: PathBuf) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        normalized.push(component.as_os_str());
    }
    normalized
}

fn expand_tilde(value: &str) -> String {
    if value == "~" {
        return env_home().unwrap_or_else(|| value.to_string());
    }
    if let Some(stripped) = value.strip_prefix("~/") {
        if let Some(home) = env_home() {
            return Path::new(&home).join(stripped).to_string_lossy().to_string();
        }
    }
    value.to_string()
}

fn env_home() -> Option<String> {
    for key in ["HOME", "USERPROFILE"] {
        if let Ok(home) = std::env::var(key) {
            let home = home.trim();
            if !home.is_empty() {
                return Some(home.to_string());
            }
        }
    }
    None
}
