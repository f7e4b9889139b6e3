use anyhow::{Context, Result, anyhow};
use std::fs;
use std::path::Path;
use time::format_description::well_known::Rfc3339;
use tracing::warn;

pub mod app;
pub mod error;
pub mod explanation;
pub mod export;
pub mod history;
pub mod logging;
pub mod modes;
mod paths;
pub mod prompts;
pub mod providers;
mod server;
pub mod settings;
pub mod state;
mod translator;
pub mod user_id;
pub mod view;

pub use app::{App, Timings};
pub use error::{ModelError, StoreError};
pub use explanation::{Annotation, Explanation};
pub use history::{Cursor, HistoryBackend, HistoryStore, NewRecord, Page, Record};
pub use modes::{DialectMode, Direction};
pub use providers::{Gemini, ModelClient};
pub use translator::Translator;

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub mode: Option<String>,
    pub reverse: bool,
    pub model: Option<String>,
    pub key: Option<String>,
    pub explain: bool,
    pub show_histories: bool,
    pub cursor: Option<String>,
    pub export_csv: Option<String>,
    pub settings_path: Option<String>,
}

impl Config {
    pub fn direction(&self) -> Direction {
        if self.reverse {
            Direction::Reverse
        } else {
            Direction::Forward
        }
    }

    fn mode_or(&self, fallback: DialectMode) -> Result<DialectMode> {
        match self.mode.as_deref().map(str::trim) {
            Some(value) if !value.is_empty() => value.parse(),
            _ => Ok(fallback),
        }
    }
}

pub fn load_settings(config: &Config) -> Result<settings::Settings> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    settings::load_settings(settings_path)
}

pub fn build_model(config: &Config, settings: &settings::Settings) -> Gemini {
    let model = config
        .model
        .clone()
        .unwrap_or_else(|| settings.model_name.clone());
    Gemini::new(providers::resolve_key(config.key.as_deref()))
        .with_model(model)
        .with_temperature(settings.temperature)
}

pub fn current_user_id() -> Result<String> {
    user_id::load_or_create(&paths::user_id_file())
}

/// One-shot entry point: translate `input`, or list/export history.
pub async fn run(config: Config, input: Option<String>) -> Result<String> {
    let settings = load_settings(&config)?;
    let translator = Translator::new(build_model(&config, &settings), &settings);
    let history = HistoryBackend::from_settings(&settings);
    let user_id = current_user_id()?;
    run_with(&config, &settings, &translator, &history, &user_id, input).await
}

async fn run_with<M: ModelClient, S: HistoryStore>(
    config: &Config,
    settings: &settings::Settings,
    translator: &Translator<M>,
    history: &S,
    user_id: &str,
    input: Option<String>,
) -> Result<String> {
    if let Some(path) = config.export_csv.as_deref() {
        return export_histories(history, user_id, Path::new(path)).await;
    }
    if config.show_histories {
        return show_histories(history, user_id, config.cursor.as_deref()).await;
    }

    let input = input.unwrap_or_default();
    let input = input.trim();
    if input.is_empty() {
        return Err(anyhow!("stdin is empty"));
    }
    let mode = config.mode_or(settings.default_mode)?;
    let direction = config.direction();

    let output = translator
        .translate(mode, direction, input)
        .await
        .with_context(|| format!("failed to translate ({})", mode.label(direction)))?;

    let entry = NewRecord {
        user_id: user_id.to_string(),
        input_text: input.to_string(),
        output_text: output.clone(),
        mode,
        direction,
    };
    if let Err(err) = history.save(entry).await {
        warn!("failed to save translation: {}", err);
        eprintln!("warning: translation not saved to history: {}", err);
    }

    if !config.explain {
        return Ok(output);
    }
    match translator.explain(mode, direction, input, &output).await {
        Ok(explanation) if !explanation.is_empty() => Ok(format!(
            "{}\n\n{}",
            output,
            view::render_explanation(&explanation)
        )),
        Ok(_) => Ok(output),
        Err(err) => {
            warn!("explanation failed: {:#}", err);
            Ok(output)
        }
    }
}

async fn show_histories<S: HistoryStore>(
    history: &S,
    user_id: &str,
    cursor: Option<&str>,
) -> Result<String> {
    let cursor = cursor
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(Cursor::decode)
        .transpose()?;
    let page = history
        .page(user_id.to_string(), cursor)
        .await
        .with_context(|| "failed to load translation history")?;
    Ok(format_page(&page))
}

fn format_page(page: &Page) -> String {
    let mut lines = page
        .records
        .iter()
        .map(|record| {
            format!(
                "{}\t{}\t{}\t{}\t{}",
                record.created_at.format(&Rfc3339).unwrap_or_default(),
                record.mode,
                record.direction.as_str(),
                single_line(&record.input_text),
                single_line(&record.output_text)
            )
        })
        .collect::<Vec<_>>();
    if lines.is_empty() {
        lines.push("no translations yet".to_string());
    }
    if let Some(cursor) = page.next_cursor.as_ref().filter(|_| page.has_more) {
        lines.push(format!("next cursor: {}", cursor.encode()));
    }
    lines.join("\n")
}

fn single_line(text: &str) -> String {
    text.replace(['\r', '\n', '\t'], " ")
}

async fn export_histories<S: HistoryStore>(
    history: &S,
    user_id: &str,
    path: &Path,
) -> Result<String> {
    let records = history::fetch_all(history, user_id)
        .await
        .with_context(|| "failed to load translation history")?;
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory: {}", dir.display()))?;
    }
    fs::write(path, export::to_csv(&records))
        .with_context(|| format!("failed to write CSV: {}", path.display()))?;
    Ok(format!(
        "exported {} translations to {}",
        records.len(),
        path.display()
    ))
}

/// Builds the interactive controller wired to the configured model and history store.
pub fn build_app(config: &Config) -> Result<App<Gemini, HistoryBackend>> {
    let settings = load_settings(config)?;
    let mode = config.mode_or(settings.default_mode)?;
    let translator = Translator::new(build_model(config, &settings), &settings);
    let history = HistoryBackend::from_settings(&settings);
    let mut initial = state::AppState::new(mode, settings.toast_ttl());
    initial.direction = config.direction();
    Ok(App::new(
        translator,
        history,
        state::StateStore::new(initial),
        current_user_id()?,
        Timings::from_settings(&settings),
    ))
}

/// Serves the browser client and JSON API until the process is stopped.
pub async fn serve(config: &Config, addr: Option<String>) -> Result<()> {
    let settings = load_settings(config)?;
    let addr = addr.unwrap_or_else(|| settings.server_addr.clone());
    let state = server::ServerState {
        translator: Translator::new(build_model(config, &settings), &settings),
        history: HistoryBackend::from_settings(&settings),
        settings,
    };
    server::run_server(state, &addr).await
}
