//! Application state for the interactive front end.
//!
//! State changes only through [`reduce`], a pure function of the previous state and an
//! [`Action`]. [`StateStore`] owns the current value and publishes every change to its
//! subscribers. Translations carry a sequence number so a reply that lands after a newer
//! request was issued is dropped instead of overwriting the newer result.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

use crate::explanation::Explanation;
use crate::history::{Cursor, Page, Record};
use crate::modes::{DialectMode, Direction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub id: u64,
    pub level: ToastLevel,
    pub message: String,
    pub created_at: Instant,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub input: String,
    pub output: String,
    pub mode: DialectMode,
    pub direction: Direction,
    pub translating: bool,
    pub explaining: bool,
    pub loading_history: bool,
    pub explanation: Option<Explanation>,
    pub history: Vec<Record>,
    pub cursor: Option<Cursor>,
    pub has_more: bool,
    pub sidebar_open: bool,
    pub toasts: Vec<Toast>,
    pub toast_ttl: Duration,
    /// Sequence number of the most recent translation request.
    pub request_seq: u64,
    next_toast_id: u64,
}

#[derive(Debug, Clone)]
pub enum Action {
    SetInput(String),
    SetMode(DialectMode),
    SetDirection(Direction),
    SwapDirection,
    TranslationStarted { seq: u64 },
    TranslationSucceeded { seq: u64, record: Record },
    TranslationFailed { seq: u64, message: String, at: Instant },
    ExplanationStarted { seq: u64 },
    ExplanationReady { seq: u64, explanation: Explanation },
    ExplanationFailed { seq: u64 },
    HistoryLoading,
    HistoryLoaded { page: Page, append: bool },
    HistoryFailed { message: String, at: Instant },
    Restore(Record),
    ToggleSidebar,
    PushToast { level: ToastLevel, message: String, at: Instant },
    ExpireToasts { now: Instant },
    DismissToast { id: u64 },
    Clear,
}

impl AppState {
    pub fn new(mode: DialectMode, toast_ttl: Duration) -> Self {
        Self {
            input: String::new(),
            output: String::new(),
            mode,
            direction: Direction::Forward,
            translating: false,
            explaining: false,
            loading_history: false,
            explanation: None,
            history: Vec::new(),
            cursor: None,
            has_more: false,
            sidebar_open: false,
            toasts: Vec::new(),
            toast_ttl,
            request_seq: 0,
            next_toast_id: 1,
        }
    }

    fn is_current(&self, seq: u64) -> bool {
        seq == self.request_seq
    }

    fn push_toast(&mut self, level: ToastLevel, message: String, at: Instant) {
        self.toasts.push(Toast {
            id: self.next_toast_id,
            level,
            message,
            created_at: at,
        });
        self.next_toast_id += 1;
    }
}

impl Default for AppState {
    fn default() -> Self {
        AppState::new(DialectMode::default(), Duration::from_secs(3))
    }
}

pub fn reduce(state: &AppState, action: Action) -> AppState {
    let mut next = state.clone();
    match action {
        Action::SetInput(input) => next.input = input,
        Action::SetMode(mode) => {
            if mode != next.mode {
                next.mode = mode;
                next.output.clear();
                next.explanation = None;
            }
        }
        Action::SetDirection(direction) => {
            if direction != next.direction {
                next.direction = direction;
                next.output.clear();
                next.explanation = None;
            }
        }
        Action::SwapDirection => {
            next.direction = next.direction.flipped();
            if !next.output.is_empty() {
                next.input = std::mem::take(&mut next.output);
            }
            next.explanation = None;
        }
        Action::TranslationStarted { seq } => {
            if seq <= next.request_seq {
                return next;
            }
            next.request_seq = seq;
            next.translating = true;
            next.explaining = false;
            next.output.clear();
            next.explanation = None;
        }
        Action::TranslationSucceeded { seq, record } => {
            if next.is_current(seq) {
                next.translating = false;
                next.output = record.output_text.clone();
                next.history.retain(|existing| existing.id != record.id);
                next.history.insert(0, record);
            }
        }
        Action::TranslationFailed { seq, message, at } => {
            if next.is_current(seq) {
                next.translating = false;
                next.output.clear();
                next.push_toast(ToastLevel::Error, message, at);
            }
        }
        Action::ExplanationStarted { seq } => {
            if next.is_current(seq) {
                next.explaining = true;
            }
        }
        Action::ExplanationReady { seq, explanation } => {
            if next.is_current(seq) {
                next.explaining = false;
                next.explanation = (!explanation.is_empty()).then_some(explanation);
            }
        }
        Action::ExplanationFailed { seq } => {
            if next.is_current(seq) {
                next.explaining = false;
                next.explanation = None;
            }
        }
        Action::HistoryLoading => next.loading_history = true,
        Action::HistoryLoaded { page, append } => {
            next.loading_history = false;
            if append {
                for record in page.records {
                    if !next.history.iter().any(|existing| existing.id == record.id) {
                        next.history.push(record);
                    }
                }
            } else {
                next.history = page.records;
            }
            next.cursor = page.next_cursor;
            next.has_more = page.has_more;
        }
        Action::HistoryFailed { message, at } => {
            next.loading_history = false;
            next.push_toast(ToastLevel::Error, message, at);
        }
        Action::Restore(record) => {
            next.input = record.input_text;
            next.output = record.output_text;
            next.mode = record.mode;
            next.direction = record.direction;
            next.explanation = None;
            next.sidebar_open = false;
        }
        Action::ToggleSidebar => next.sidebar_open = !next.sidebar_open,
        Action::PushToast { level, message, at } => next.push_toast(level, message, at),
        Action::ExpireToasts { now } => {
            let ttl = next.toast_ttl;
            next.toasts
                .retain(|toast| now.saturating_duration_since(toast.created_at) < ttl);
        }
        Action::DismissToast { id } => next.toasts.retain(|toast| toast.id != id),
        Action::Clear => {
            next.input.clear();
            next.output.clear();
            next.explanation = None;
        }
    }
    next
}

/// Owns the current [`AppState`] and broadcasts each new value.
#[derive(Debug, Clone)]
pub struct StateStore {
    tx: Arc<watch::Sender<AppState>>,
}

impl StateStore {
    pub fn new(initial: AppState) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn dispatch(&self, action: Action) {
        self.tx.send_modify(|state| *state = reduce(state, action));
    }

    pub fn snapshot(&self) -> AppState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.tx.subscribe()
    }
}
