use std::io::{self, BufRead, Read, Write};

use anyhow::{Result, anyhow};
use clap::Parser;
use dialect_translator_rust::state::Action;
use dialect_translator_rust::{App, DialectMode, Gemini, HistoryBackend, view};

#[derive(Parser, Debug)]
#[command(
    name = "dialect-translator-rust",
    version,
    about = "Translate between English, Paisa Spanish and Boricua Spanish"
)]
struct Cli {
    /// Dialect pair: en-paisa, en-boricua or paisa-boricua
    #[arg(short = 'm', long = "mode")]
    mode: Option<String>,

    /// Translate from the second dialect of the pair into the first
    #[arg(short = 'r', long = "reverse")]
    reverse: bool,

    /// Gemini model name (default from settings)
    #[arg(long = "model")]
    model: Option<String>,

    /// API key (overrides environment variables)
    #[arg(short = 'k', long = "key")]
    key: Option<String>,

    /// Append the cultural-context breakdown to the output
    #[arg(long = "explain")]
    explain: bool,

    /// Show a page of translation history and exit
    #[arg(long = "show-histories")]
    show_histories: bool,

    /// Cursor printed by a previous --show-histories page
    #[arg(long = "cursor", requires = "show_histories")]
    cursor: Option<String>,

    /// Write the full translation history as CSV and exit
    #[arg(long = "export-csv", value_name = "PATH")]
    export_csv: Option<String>,

    /// Read extra settings from a local TOML file
    #[arg(long = "read-settings")]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,

    /// Interactive mode
    #[arg(short = 'i', long = "interactive")]
    interactive: bool,

    /// Serve the browser client and JSON API
    #[arg(long = "server")]
    server: bool,

    /// Listen address for --server (default from settings)
    #[arg(long = "addr", requires = "server")]
    addr: Option<String>,
}

impl Cli {
    fn config(&self) -> dialect_translator_rust::Config {
        dialect_translator_rust::Config {
            mode: self.mode.clone(),
            reverse: self.reverse,
            model: self.model.clone(),
            key: self.key.clone(),
            explain: self.explain,
            show_histories: self.show_histories,
            cursor: self.cursor.clone(),
            export_csv: self.export_csv.clone(),
            settings_path: self.read_settings.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dialect_translator_rust::logging::init(cli.verbose)?;
    let config = cli.config();
    if cli.server {
        return dialect_translator_rust::serve(&config, cli.addr.clone()).await;
    }
    if cli.interactive {
        return run_interactive(&config).await;
    }

    let needs_input = !(cli.show_histories || cli.export_csv.is_some());
    let input = if needs_input {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Some(buffer)
    } else {
        None
    };

    let output = dialect_translator_rust::run(config, input).await?;
    println!("{}", output);
    Ok(())
}

#[derive(Debug, PartialEq)]
enum Command {
    Quit,
    Help,
    Mode(Option<String>),
    Reverse,
    Explain,
    History,
    More,
    Restore(usize),
    Sidebar,
    Export(String),
    Clear,
}

fn parse_command(input: &str) -> Result<Command> {
    let trimmed = input.trim();
    let (name, arg) = match trimmed.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (trimmed, ""),
    };
    let command = match name {
        "/quit" | "/exit" => Command::Quit,
        "/help" => Command::Help,
        "/mode" => Command::Mode((!arg.is_empty()).then(|| arg.to_string())),
        "/reverse" | "/swap" => Command::Reverse,
        "/explain" => Command::Explain,
        "/history" => Command::History,
        "/more" => Command::More,
        "/restore" => {
            let number = arg
                .parse::<usize>()
                .ok()
                .filter(|number| *number > 0)
                .ok_or_else(|| anyhow!("usage: /restore <n> (n from /history)"))?;
            Command::Restore(number - 1)
        }
        "/sidebar" => Command::Sidebar,
        "/export" => {
            if arg.is_empty() {
                return Err(anyhow!("usage: /export <path>"));
            }
            Command::Export(arg.to_string())
        }
        "/clear" => Command::Clear,
        other => return Err(anyhow!("unknown command: {}", other)),
    };
    Ok(command)
}

async fn run_interactive(config: &dialect_translator_rust::Config) -> Result<()> {
    let app = dialect_translator_rust::build_app(config)?;
    println!("Interactive mode. Use /quit or /exit to finish.");
    println!("Type /help to see available commands.");
    println!("{}", view::render(&app.store().snapshot()));
    app.load_history().await;

    let mut line = String::new();
    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();
    loop {
        app.expire_toasts();
        line.clear();
        print!("> ");
        io::stdout().flush()?;
        if stdin_lock.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.starts_with('/') {
            match parse_command(input) {
                Ok(command) => {
                    if handle_command(&app, command).await? {
                        break;
                    }
                }
                Err(err) => eprintln!("{}", err),
            }
            continue;
        }

        app.store().dispatch(Action::SetInput(input.to_string()));
        if let Some((seq, record)) = app.translate().await {
            println!("{}", view::render(&app.store().snapshot()));
            app.explain(seq, &record).await;
            if let Some(explanation) = app.store().snapshot().explanation {
                println!("{}", view::render_explanation(&explanation));
            }
        } else {
            println!("{}", view::render_toasts(&app.store().snapshot().toasts));
        }
    }
    Ok(())
}

async fn handle_command(app: &App<Gemini, HistoryBackend>, command: Command) -> Result<bool> {
    let store = app.store();
    match command {
        Command::Quit => return Ok(true),
        Command::Help => print_interactive_help(),
        Command::Mode(None) => {
            let state = store.snapshot();
            println!("mode: {} [{}]", state.mode, state.mode.label(state.direction));
        }
        Command::Mode(Some(value)) => match value.parse::<DialectMode>() {
            Ok(mode) => {
                store.dispatch(Action::SetMode(mode));
                println!("mode set to {}", mode.label(store.snapshot().direction));
            }
            Err(err) => eprintln!("{}", err),
        },
        Command::Reverse => {
            store.dispatch(Action::SwapDirection);
            let state = store.snapshot();
            println!("direction: {}", state.mode.label(state.direction));
            if !state.input.is_empty() {
                println!("input: {}", state.input);
            }
        }
        Command::Explain => {
            if let Some(explanation) = store.snapshot().explanation {
                println!("{}", view::render_explanation(&explanation));
            } else if app.explain_current().await {
                match store.snapshot().explanation {
                    Some(explanation) => println!("{}", view::render_explanation(&explanation)),
                    None => println!("no cultural context available"),
                }
            } else {
                println!("nothing to explain yet");
            }
        }
        Command::History => {
            app.load_history().await;
            println!("{}", view::render_history(&store.snapshot()));
        }
        Command::More => {
            if app.load_more().await {
                println!("{}", view::render_history(&store.snapshot()));
            } else {
                println!("no older entries");
            }
        }
        Command::Restore(index) => {
            app.restore(index).await;
            println!("{}", view::render(&store.snapshot()));
        }
        Command::Sidebar => {
            store.dispatch(Action::ToggleSidebar);
            println!("{}", view::render(&store.snapshot()));
        }
        Command::Export(path) => {
            std::fs::write(&path, app.export_loaded())?;
            println!(
                "exported {} loaded translations to {}",
                store.snapshot().history.len(),
                path
            );
        }
        Command::Clear => {
            store.dispatch(Action::Clear);
            println!("cleared");
        }
    }
    Ok(false)
}

fn print_interactive_help() {
    println!("Commands:");
    println!("  /quit, /exit          Exit interactive mode");
    println!("  /mode [tag]           Show or set the dialect pair");
    println!("  /reverse              Swap translation direction");
    println!("  /explain              Show the cultural context of the last translation");
    println!("  /history              Reload and show translation history");
    println!("  /more                 Load older history entries");
    println!("  /restore <n>          Restore history entry n into the editor");
    println!("  /sidebar              Toggle the history panel");
    println!("  /export <path>        Write loaded history as CSV");
    println!("  /clear                Clear input and output");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_with_arguments() {
        assert_eq!(parse_command("/quit").expect("quit"), Command::Quit);
        assert_eq!(
            parse_command("/mode  en-boricua ").expect("mode"),
            Command::Mode(Some("en-boricua".to_string()))
        );
        assert_eq!(parse_command("/mode").expect("mode"), Command::Mode(None));
        assert_eq!(parse_command("/restore 3").expect("restore"), Command::Restore(2));
        assert_eq!(
            parse_command("/export out/history.csv").expect("export"),
            Command::Export("out/history.csv".to_string())
        );
    }

    #[test]
    fn rejects_bad_commands() {
        assert!(parse_command("/restore 0").is_err());
        assert!(parse_command("/restore x").is_err());
        assert!(parse_command("/export").is_err());
        assert!(parse_command("/teleport").is_err());
    }
}
