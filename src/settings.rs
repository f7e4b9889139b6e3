use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::modes::DialectMode;
use crate::paths;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryBackendKind {
    Local,
    Firestore,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub model_name: String,
    pub temperature: f32,
    pub translation_max_tokens: u32,
    pub explanation_max_tokens: u32,
    pub history_backend: HistoryBackendKind,
    pub firestore_project: Option<String>,
    pub collection: String,
    pub default_mode: DialectMode,
    pub toast_seconds: u64,
    pub explanation_delay_ms: u64,
    pub restore_delay_ms: u64,
    pub server_addr: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model_name: "gemini-2.0-flash".to_string(),
            temperature: 0.7,
            translation_max_tokens: 1024,
            explanation_max_tokens: 300,
            history_backend: HistoryBackendKind::Local,
            firestore_project: None,
            collection: "translations".to_string(),
            default_mode: DialectMode::default(),
            toast_seconds: 3,
            explanation_delay_ms: 600,
            restore_delay_ms: 300,
            server_addr: "127.0.0.1:8787".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    model: Option<ModelSettings>,
    history: Option<HistorySettings>,
    ui: Option<UiSettings>,
    server: Option<ServerSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct ModelSettings {
    name: Option<String>,
    temperature: Option<f32>,
    translation_max_tokens: Option<u32>,
    explanation_max_tokens: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct HistorySettings {
    backend: Option<String>,
    firestore_project: Option<String>,
    collection: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct UiSettings {
    default_mode: Option<String>,
    toast_seconds: Option<u64>,
    explanation_delay_ms: Option<u64>,
    restore_delay_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSettings {
    addr: Option<String>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    load_settings_in(Path::new("."), &paths::base_dir(), extra_path)
}

/// Loads settings with `work_dir` standing in for the current directory and
/// `base_dir` for the data directory.
pub fn load_settings_in(
    work_dir: &Path,
    base_dir: &Path,
    extra_path: Option<&Path>,
) -> Result<Settings> {
    let mut settings = Settings::default();
    ensure_settings_file(base_dir)?;

    let mut ordered_paths = vec![
        work_dir.join("settings.toml"),
        work_dir.join("settings.local.toml"),
        base_dir.join("settings.toml"),
        base_dir.join("settings.local.toml"),
    ];

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings
                .merge(parsed)
                .with_context(|| format!("invalid settings: {}", path.display()))?;
        }
    }

    Ok(settings)
}

impl Settings {
    pub fn toast_ttl(&self) -> Duration {
        Duration::from_secs(self.toast_seconds)
    }

    pub fn explanation_delay(&self) -> Duration {
        Duration::from_millis(self.explanation_delay_ms)
    }

    pub fn restore_delay(&self) -> Duration {
        Duration::from_millis(self.restore_delay_ms)
    }

    fn merge(&mut self, incoming: SettingsFile) -> Result<()> {
        if let Some(model) = incoming.model {
            if let Some(name) = model.name {
                if !name.trim().is_empty() {
                    self.model_name = name.trim().to_string();
                }
            }
            if let Some(temperature) = model.temperature {
                if (0.0..=2.0).contains(&temperature) {
                    self.temperature = temperature;
                }
            }
            if let Some(tokens) = model.translation_max_tokens {
                if tokens > 0 {
                    self.translation_max_tokens = tokens;
                }
            }
            if let Some(tokens) = model.explanation_max_tokens {
                if tokens > 0 {
                    self.explanation_max_tokens = tokens;
                }
            }
        }
        if let Some(history) = incoming.history {
            if let Some(backend) = history.backend {
                self.history_backend = match backend.trim().to_lowercase().as_str() {
                    "local" => HistoryBackendKind::Local,
                    "firestore" => HistoryBackendKind::Firestore,
                    other => {
                        return Err(anyhow!(
                            "unknown history backend '{}' (expected local or firestore)",
                            other
                        ));
                    }
                };
            }
            if let Some(project) = history.firestore_project {
                let project = project.trim();
                self.firestore_project = if project.is_empty() {
                    None
                } else {
                    Some(project.to_string())
                };
            }
            if let Some(collection) = history.collection {
                if !collection.trim().is_empty() {
                    self.collection = collection.trim().to_string();
                }
            }
        }
        if let Some(ui) = incoming.ui {
            if let Some(mode) = ui.default_mode {
                self.default_mode = mode.parse()?;
            }
            if let Some(seconds) = ui.toast_seconds {
                if seconds > 0 {
                    self.toast_seconds = seconds;
                }
            }
            if let Some(delay) = ui.explanation_delay_ms {
                self.explanation_delay_ms = delay;
            }
            if let Some(delay) = ui.restore_delay_ms {
                self.restore_delay_ms = delay;
            }
        }
        if let Some(server) = incoming.server {
            if let Some(addr) = server.addr {
                if !addr.trim().is_empty() {
                    self.server_addr = addr.trim().to_string();
                }
            }
        }
        Ok(())
    }
}

fn ensure_settings_file(base_dir: &Path) -> Result<()> {
    fs::create_dir_all(base_dir).with_context(|| {
        format!(
            "failed to create settings directory: {}",
            base_dir.display()
        )
    })?;
    let path = base_dir.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn dirs() -> (tempfile::TempDir, tempfile::TempDir) {
        (tempdir().expect("work dir"), tempdir().expect("base dir"))
    }

    #[test]
    fn first_load_writes_default_settings() {
        let (work, base) = dirs();
        let settings = load_settings_in(work.path(), base.path(), None).expect("settings");
        assert!(base.path().join("settings.toml").exists());
        assert_eq!(settings.collection, "translations");
        assert_eq!(settings.history_backend, HistoryBackendKind::Local);
        assert_eq!(settings.default_mode, Settings::default().default_mode);
    }

    #[test]
    fn layers_merge_in_order() {
        let (work, base) = dirs();
        fs::write(
            work.path().join("settings.toml"),
            "[ui]\ntoast_seconds = 4\ndefault_mode = \"en-boricua\"\n",
        )
        .expect("write work settings");
        fs::write(work.path().join("settings.local.toml"), "[ui]\ntoast_seconds = 5\n")
            .expect("write work local settings");
        fs::write(
            base.path().join("settings.toml"),
            "[history]\ncollection = \"mine\"\n",
        )
        .expect("write base settings");
        let settings = load_settings_in(work.path(), base.path(), None).expect("settings");
        assert_eq!(settings.toast_ttl(), Duration::from_secs(5));
        assert_eq!(settings.default_mode, DialectMode::EnglishBoricua);
        assert_eq!(settings.collection, "mine");
    }

    #[test]
    fn extra_file_overrides_defaults() {
        let (work, base) = dirs();
        let extra = base.path().join("extra.toml");
        fs::write(
            &extra,
            "[ui]\ndefault_mode = \"paisa-boricua\"\ntoast_seconds = 9\n\n[history]\nbackend = \"firestore\"\nfirestore_project = \"demo\"\n",
        )
        .expect("write extra");
        let settings = load_settings_in(work.path(), base.path(), Some(&extra)).expect("settings");
        assert_eq!(settings.default_mode, DialectMode::PaisaBoricua);
        assert_eq!(settings.toast_ttl(), Duration::from_secs(9));
        assert_eq!(settings.history_backend, HistoryBackendKind::Firestore);
        assert_eq!(settings.firestore_project.as_deref(), Some("demo"));
    }

    #[test]
    fn missing_extra_file_is_an_error() {
        let (work, base) = dirs();
        let missing = base.path().join("nope.toml");
        assert!(load_settings_in(work.path(), base.path(), Some(&missing)).is_err());
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let (work, base) = dirs();
        let extra = base.path().join("extra.toml");
        fs::write(&extra, "[history]\nbackend = \"redis\"\n").expect("write extra");
        assert!(load_settings_in(work.path(), base.path(), Some(&extra)).is_err());
    }
}
