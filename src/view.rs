//! Plain-text rendering of [`AppState`] for the interactive terminal front end.

use crate::explanation::Explanation;
use crate::history::Record;
use crate::state::{AppState, Toast, ToastLevel};

const PREVIEW_CHARS: usize = 48;

pub fn render(state: &AppState) -> String {
    let mut lines = vec![format!("[{}]", state.mode.label(state.direction))];
    if state.translating {
        lines.push("translating...".to_string());
    } else if !state.output.is_empty() {
        lines.push(state.output.clone());
    }
    if state.explaining {
        lines.push("  (looking up cultural context...)".to_string());
    }
    if let Some(explanation) = &state.explanation {
        lines.push(render_explanation(explanation));
    }
    if state.sidebar_open {
        lines.push(render_history(state));
    }
    let toasts = render_toasts(&state.toasts);
    if !toasts.is_empty() {
        lines.push(toasts);
    }
    lines.join("\n")
}

pub fn render_explanation(explanation: &Explanation) -> String {
    let mut lines = Vec::new();
    if !explanation.context.is_empty() {
        lines.push(format!("  {} ({})", explanation.context, explanation.tone));
    }
    for annotation in &explanation.annotations {
        let mut line = format!("  • {}", annotation.word);
        if !annotation.meaning.is_empty() {
            line.push_str(&format!(": {}", annotation.meaning));
        }
        if !annotation.note.is_empty() && annotation.note != annotation.meaning {
            line.push_str(&format!(" ({})", annotation.note));
        }
        lines.push(line);
    }
    lines.join("\n")
}

/// Numbered history list; numbers are what `/restore` expects.
pub fn render_history(state: &AppState) -> String {
    if state.loading_history && state.history.is_empty() {
        return "History: loading...".to_string();
    }
    if state.history.is_empty() {
        return "History: no translations yet".to_string();
    }
    let mut lines = vec![format!("History ({} loaded)", state.history.len())];
    for (idx, record) in state.history.iter().enumerate() {
        lines.push(format!("{:>3}. {}", idx + 1, history_line(record)));
    }
    if state.has_more {
        lines.push("     ... /more to load older entries".to_string());
    }
    lines.join("\n")
}

fn history_line(record: &Record) -> String {
    format!(
        "[{}] {} → {}",
        record.mode.label(record.direction),
        preview(&record.input_text),
        preview(&record.output_text)
    )
}

fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_CHARS {
        return flat;
    }
    let mut cut = flat.chars().take(PREVIEW_CHARS - 1).collect::<String>();
    cut.push('…');
    cut
}

pub fn render_toasts(toasts: &[Toast]) -> String {
    toasts
        .iter()
        .map(|toast| {
            let marker = match toast.level {
                ToastLevel::Info => "i",
                ToastLevel::Success => "✓",
                ToastLevel::Error => "!",
            };
            format!("{} {}", marker, toast.message)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explanation::Annotation;
    use crate::modes::{DialectMode, Direction};
    use crate::state::{Action, reduce};
    use std::time::Instant;
    use time::OffsetDateTime;

    fn record(idx: usize, input: &str) -> Record {
        Record {
            id: format!("r{}", idx),
            user_id: "u".to_string(),
            input_text: input.to_string(),
            output_text: format!("salida {}", idx),
            mode: DialectMode::EnglishBoricua,
            direction: Direction::Forward,
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn shows_direction_label_and_output() {
        let mut state = AppState::default();
        state.direction = Direction::Reverse;
        state.output = "hey buddy".to_string();
        let text = render(&state);
        assert!(text.starts_with("[Paisa Spanish → English]"));
        assert!(text.contains("hey buddy"));
    }

    #[test]
    fn explanation_skips_note_equal_to_meaning() {
        let explanation = Explanation {
            context: "Greeting".to_string(),
            tone: "friendly".to_string(),
            annotations: vec![
                Annotation {
                    word: "parce".to_string(),
                    meaning: "buddy".to_string(),
                    note: "buddy".to_string(),
                },
                Annotation {
                    word: "quiubo".to_string(),
                    meaning: "what's up".to_string(),
                    note: "from qué hubo".to_string(),
                },
            ],
        };
        assert_eq!(
            render_explanation(&explanation),
            "  Greeting (friendly)\n  • parce: buddy\n  • quiubo: what's up (from qué hubo)"
        );
    }

    #[test]
    fn history_is_numbered_and_truncated() {
        let long = "word ".repeat(30);
        let state = reduce(
            &AppState::default(),
            Action::HistoryLoaded {
                page: crate::history::Page {
                    records: vec![record(0, "short"), record(1, &long)],
                    next_cursor: None,
                    has_more: true,
                },
                append: false,
            },
        );
        let text = render_history(&state);
        assert!(text.contains("  1. [English → Boricua Spanish] short → salida 0"));
        assert!(text.contains("  2. "));
        assert!(text.contains('…'));
        assert!(text.contains("/more"));
    }

    #[test]
    fn sidebar_controls_history_section() {
        let state = AppState::default();
        assert!(!render(&state).contains("History"));
        let open = reduce(&state, Action::ToggleSidebar);
        assert!(render(&open).contains("History: no translations yet"));
    }

    #[test]
    fn toasts_are_marked_by_level() {
        let state = reduce(
            &AppState::default(),
            Action::PushToast {
                level: ToastLevel::Error,
                message: "offline".to_string(),
                at: Instant::now(),
            },
        );
        assert!(render(&state).ends_with("! offline"));
    }
}
