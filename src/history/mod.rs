use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

use crate::error::StoreError;
use crate::modes::{DialectMode, Direction};
use crate::settings::{HistoryBackendKind, Settings};

mod firestore;
mod local;

pub use firestore::FirestoreStore;
pub use local::LocalStore;

/// Records per history page.
pub const PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    pub user_id: String,
    pub input_text: String,
    pub output_text: String,
    pub mode: DialectMode,
    #[serde(default)]
    pub direction: Direction,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Record {
    pub fn cursor(&self) -> Cursor {
        Cursor {
            created_at: self.created_at,
            id: self.id.clone(),
        }
    }

    fn sort_key(&self) -> (OffsetDateTime, &str) {
        (self.created_at, self.id.as_str())
    }
}

/// A translation about to be persisted.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub user_id: String,
    pub input_text: String,
    pub output_text: String,
    pub mode: DialectMode,
    pub direction: Direction,
}

impl NewRecord {
    /// Stamps the record locally so it can be shown before the store confirms.
    pub fn into_optimistic(self) -> Record {
        Record {
            id: Uuid::new_v4().simple().to_string(),
            user_id: self.user_id,
            input_text: self.input_text,
            output_text: self.output_text,
            mode: self.mode,
            direction: self.direction,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Position just after the last record of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub created_at: OffsetDateTime,
    pub id: String,
}

#[derive(Serialize, Deserialize)]
struct CursorToken {
    #[serde(rename = "t")]
    created_at: String,
    #[serde(rename = "i")]
    id: String,
}

impl Cursor {
    pub fn encode(&self) -> String {
        let token = CursorToken {
            created_at: self.created_at.format(&Rfc3339).unwrap_or_default(),
            id: self.id.clone(),
        };
        let json = serde_json::to_vec(&token).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    pub fn decode(token: &str) -> Result<Self, StoreError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|_| StoreError::InvalidCursor)?;
        let token: CursorToken =
            serde_json::from_slice(&bytes).map_err(|_| StoreError::InvalidCursor)?;
        let created_at = OffsetDateTime::parse(&token.created_at, &Rfc3339)
            .map_err(|_| StoreError::InvalidCursor)?;
        if token.id.is_empty() {
            return Err(StoreError::InvalidCursor);
        }
        Ok(Cursor {
            created_at,
            id: token.id,
        })
    }

    /// True when `record` sorts strictly after this cursor in newest-first order.
    fn precedes(&self, record: &Record) -> bool {
        record.sort_key() < (self.created_at, self.id.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Page {
    pub records: Vec<Record>,
    pub next_cursor: Option<Cursor>,
    pub has_more: bool,
}

impl Page {
    /// Builds a page from up to `PAGE_SIZE + 1` newest-first records.
    pub(crate) fn from_probe(mut records: Vec<Record>) -> Self {
        let has_more = records.len() > PAGE_SIZE;
        records.truncate(PAGE_SIZE);
        let next_cursor = if has_more {
            records.last().map(Record::cursor)
        } else {
            None
        };
        Page {
            records,
            next_cursor,
            has_more,
        }
    }
}

pub type StoreFuture<T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send>>;

/// Append-only translation history keyed by user.
pub trait HistoryStore: Clone + Send + Sync + 'static {
    /// Persists `entry` and returns the locally stamped copy for immediate display.
    fn save(&self, entry: NewRecord) -> StoreFuture<Record>;

    /// Newest-first page for `user_id`; `None` starts from the newest record.
    fn page(&self, user_id: String, cursor: Option<Cursor>) -> StoreFuture<Page>;
}

#[derive(Debug, Clone)]
pub enum HistoryBackend {
    Local(LocalStore),
    Firestore(FirestoreStore),
}

impl HistoryBackend {
    pub fn from_settings(settings: &Settings) -> Self {
        match settings.history_backend {
            HistoryBackendKind::Local => {
                HistoryBackend::Local(LocalStore::new(crate::paths::history_file()))
            }
            HistoryBackendKind::Firestore => HistoryBackend::Firestore(FirestoreStore::new(
                settings.firestore_project.clone(),
                settings.collection.clone(),
                firestore::resolve_key(),
            )),
        }
    }
}

impl HistoryStore for HistoryBackend {
    fn save(&self, entry: NewRecord) -> StoreFuture<Record> {
        match self {
            HistoryBackend::Local(store) => store.save(entry),
            HistoryBackend::Firestore(store) => store.save(entry),
        }
    }

    fn page(&self, user_id: String, cursor: Option<Cursor>) -> StoreFuture<Page> {
        match self {
            HistoryBackend::Local(store) => store.page(user_id, cursor),
            HistoryBackend::Firestore(store) => store.page(user_id, cursor),
        }
    }
}

/// Walks every page for `user_id`, newest first.
pub async fn fetch_all<S: HistoryStore>(store: &S, user_id: &str) -> Result<Vec<Record>, StoreError> {
    let mut records = Vec::new();
    let mut cursor = None;
    loop {
        let page = store.page(user_id.to_string(), cursor).await?;
        records.extend(page.records);
        if !page.has_more {
            break;
        }
        let Some(next) = page.next_cursor else {
            break;
        };
        cursor = Some(next);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn record(id: &str, offset_secs: i64) -> Record {
        Record {
            id: id.to_string(),
            user_id: "u".to_string(),
            input_text: "in".to_string(),
            output_text: "out".to_string(),
            mode: DialectMode::EnglishPaisa,
            direction: Direction::Forward,
            created_at: OffsetDateTime::UNIX_EPOCH + Duration::seconds(offset_secs),
        }
    }

    #[test]
    fn cursor_token_round_trips() {
        let cursor = record("abc", 1_700_000_000).cursor();
        let decoded = Cursor::decode(&cursor.encode()).expect("decode");
        assert_eq!(decoded, cursor);
    }

    #[test]
    fn garbage_cursor_is_rejected() {
        for token in ["", "!!!", "bm90LWpzb24", "eyJ0IjoieCIsImkiOiJ5In0"] {
            assert!(matches!(
                Cursor::decode(token),
                Err(StoreError::InvalidCursor)
            ));
        }
    }

    #[test]
    fn probe_with_extra_record_reports_more() {
        let records = (0..=PAGE_SIZE as i64)
            .rev()
            .map(|idx| record(&idx.to_string(), idx))
            .collect::<Vec<_>>();
        let page = Page::from_probe(records);
        assert!(page.has_more);
        assert_eq!(page.records.len(), PAGE_SIZE);
        assert_eq!(page.next_cursor, Some(page.records[PAGE_SIZE - 1].cursor()));
    }

    #[test]
    fn short_probe_has_no_cursor() {
        let page = Page::from_probe(vec![record("a", 2), record("b", 1)]);
        assert!(!page.has_more);
        assert!(page.next_cursor.is_none());
        assert_eq!(page.records.len(), 2);
    }

    #[test]
    fn cursor_breaks_timestamp_ties_by_id() {
        let cursor = record("m", 5).cursor();
        assert!(cursor.precedes(&record("a", 5)));
        assert!(!cursor.precedes(&record("z", 5)));
        assert!(!cursor.precedes(&record("m", 5)));
        assert!(cursor.precedes(&record("z", 4)));
    }
}
