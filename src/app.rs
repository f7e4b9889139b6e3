use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::export;
use crate::history::{HistoryStore, NewRecord, Record};
use crate::modes::{DialectMode, Direction};
use crate::providers::ModelClient;
use crate::settings::Settings;
use crate::state::{Action, StateStore, ToastLevel};
use crate::translator::Translator;

/// UI pacing delays; they only shape feedback, never correctness.
#[derive(Debug, Clone, Copy, Default)]
pub struct Timings {
    pub explanation_delay: Duration,
    pub restore_delay: Duration,
}

impl Timings {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            explanation_delay: settings.explanation_delay(),
            restore_delay: settings.restore_delay(),
        }
    }
}

/// Drives translations, explanations and history loading against a [`StateStore`].
#[derive(Clone)]
pub struct App<M: ModelClient, S: HistoryStore> {
    translator: Translator<M>,
    history: S,
    store: StateStore,
    user_id: String,
    timings: Timings,
    seq: Arc<AtomicU64>,
}

impl<M: ModelClient, S: HistoryStore> App<M, S> {
    pub fn new(
        translator: Translator<M>,
        history: S,
        store: StateStore,
        user_id: String,
        timings: Timings,
    ) -> Self {
        Self {
            translator,
            history,
            store,
            user_id,
            timings,
            seq: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    fn toast(&self, level: ToastLevel, message: impl Into<String>) {
        self.store.dispatch(Action::PushToast {
            level,
            message: message.into(),
            at: Instant::now(),
        });
    }

    /// Translates the current input and persists the result.
    ///
    /// Returns the request's sequence number and record on success so the caller can
    /// follow up with [`App::explain`].
    pub async fn translate(&self) -> Option<(u64, Record)> {
        let snapshot = self.store.snapshot();
        let input = snapshot.input.trim().to_string();
        if input.is_empty() {
            self.toast(ToastLevel::Info, "Type something to translate first");
            return None;
        }
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.store.dispatch(Action::TranslationStarted { seq });

        let output = match self
            .translator
            .translate(snapshot.mode, snapshot.direction, &input)
            .await
        {
            Ok(output) => output,
            Err(err) => {
                warn!("translation failed: {:#}", err);
                self.store.dispatch(Action::TranslationFailed {
                    seq,
                    message: format!("Translation failed: {}", err),
                    at: Instant::now(),
                });
                return None;
            }
        };

        let entry = NewRecord {
            user_id: self.user_id.clone(),
            input_text: input,
            output_text: output,
            mode: snapshot.mode,
            direction: snapshot.direction,
        };
        let record = match self.history.save(entry.clone()).await {
            Ok(record) => record,
            Err(err) => {
                warn!("failed to save translation: {}", err);
                self.toast(
                    ToastLevel::Error,
                    format!("Translation not saved to history: {}", err),
                );
                entry.into_optimistic()
            }
        };
        info!("translation {} complete ({})", seq, record.mode);
        self.store.dispatch(Action::TranslationSucceeded {
            seq,
            record: record.clone(),
        });
        Some((seq, record))
    }

    /// Fetches the cultural breakdown for `record`; failures are logged and swallowed.
    pub async fn explain(&self, seq: u64, record: &Record) {
        if !self.timings.explanation_delay.is_zero() {
            sleep(self.timings.explanation_delay).await;
        }
        self.fetch_explanation(
            seq,
            record.mode,
            record.direction,
            &record.input_text,
            &record.output_text,
        )
        .await;
    }

    /// Explains the pair currently in the editor, which may be a restored entry.
    ///
    /// Returns false when there is no output to explain.
    pub async fn explain_current(&self) -> bool {
        let snapshot = self.store.snapshot();
        let input = snapshot.input.trim();
        let output = snapshot.output.trim();
        if input.is_empty() || output.is_empty() {
            return false;
        }
        self.fetch_explanation(
            snapshot.request_seq,
            snapshot.mode,
            snapshot.direction,
            input,
            output,
        )
        .await;
        true
    }

    async fn fetch_explanation(
        &self,
        seq: u64,
        mode: DialectMode,
        direction: Direction,
        input: &str,
        output: &str,
    ) {
        if self.store.snapshot().request_seq != seq {
            return;
        }
        self.store.dispatch(Action::ExplanationStarted { seq });
        match self.translator.explain(mode, direction, input, output).await {
            Ok(explanation) => self
                .store
                .dispatch(Action::ExplanationReady { seq, explanation }),
            Err(err) => {
                warn!("explanation failed: {:#}", err);
                self.store.dispatch(Action::ExplanationFailed { seq });
            }
        }
    }

    pub async fn load_history(&self) {
        self.store.dispatch(Action::HistoryLoading);
        match self.history.page(self.user_id.clone(), None).await {
            Ok(page) => self.store.dispatch(Action::HistoryLoaded {
                page,
                append: false,
            }),
            Err(err) => {
                warn!("failed to load history: {}", err);
                self.store.dispatch(Action::HistoryFailed {
                    message: format!("Could not load history: {}", err),
                    at: Instant::now(),
                });
            }
        }
    }

    /// Appends the next page; returns false when there is nothing more to load.
    pub async fn load_more(&self) -> bool {
        let snapshot = self.store.snapshot();
        let Some(cursor) = snapshot.cursor.filter(|_| snapshot.has_more) else {
            return false;
        };
        if snapshot.loading_history {
            return false;
        }
        self.store.dispatch(Action::HistoryLoading);
        match self.history.page(self.user_id.clone(), Some(cursor)).await {
            Ok(page) => {
                self.store.dispatch(Action::HistoryLoaded { page, append: true });
                true
            }
            Err(err) => {
                warn!("failed to load more history: {}", err);
                self.store.dispatch(Action::HistoryFailed {
                    message: format!("Could not load more history: {}", err),
                    at: Instant::now(),
                });
                false
            }
        }
    }

    /// Puts the history entry at `index` back into the editor.
    pub async fn restore(&self, index: usize) -> bool {
        let Some(record) = self.store.snapshot().history.get(index).cloned() else {
            self.toast(ToastLevel::Error, format!("No history entry #{}", index + 1));
            return false;
        };
        if !self.timings.restore_delay.is_zero() {
            sleep(self.timings.restore_delay).await;
        }
        self.store.dispatch(Action::Restore(record));
        self.toast(ToastLevel::Success, "Restored from history");
        true
    }

    /// CSV of the history currently loaded in the view.
    pub fn export_loaded(&self) -> String {
        export::to_csv(&self.store.snapshot().history)
    }

    pub fn expire_toasts(&self) {
        self.store.dispatch(Action::ExpireToasts {
            now: Instant::now(),
        });
    }
}
