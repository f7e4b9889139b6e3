use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use super::{Cursor, HistoryStore, NewRecord, PAGE_SIZE, Page, Record, StoreFuture};
use crate::error::StoreError;

/// History kept in a JSON document inside the data directory.
#[derive(Debug, Clone)]
pub struct LocalStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryFile {
    #[serde(default)]
    records: Vec<Record>,
}

impl LocalStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub(crate) async fn append(&self, record: Record) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut file = read_file(&self.path)?;
        file.records.push(record);
        write_file(&self.path, &file)
    }
}

impl HistoryStore for LocalStore {
    fn save(&self, entry: NewRecord) -> StoreFuture<Record> {
        let store = self.clone();
        Box::pin(async move {
            let record = entry.into_optimistic();
            store.append(record.clone()).await?;
            debug!("saved translation {} to {}", record.id, store.path.display());
            Ok(record)
        })
    }

    fn page(&self, user_id: String, cursor: Option<Cursor>) -> StoreFuture<Page> {
        let store = self.clone();
        Box::pin(async move {
            let file = {
                let _guard = store.lock.lock().await;
                read_file(&store.path)?
            };
            let mut records = file
                .records
                .into_iter()
                .filter(|record| record.user_id == user_id)
                .filter(|record| {
                    cursor
                        .as_ref()
                        .map(|cursor| cursor.precedes(record))
                        .unwrap_or(true)
                })
                .collect::<Vec<_>>();
            records.sort_by(|a, b| b.sort_key().cmp(&a.sort_key()));
            records.truncate(PAGE_SIZE + 1);
            Ok(Page::from_probe(records))
        })
    }
}

fn read_file(path: &Path) -> Result<HistoryFile, StoreError> {
    if !path.exists() {
        return Ok(HistoryFile::default());
    }
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(HistoryFile::default());
    }
    Ok(serde_json::from_str(&content)?)
}

fn write_file(path: &Path, file: &HistoryFile) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;
    let content = serde_json::to_vec_pretty(file)?;
    let mut temp = tempfile::NamedTempFile::new_in(&dir)?;
    temp.write_all(&content)?;
    temp.persist(path).map_err(|err| StoreError::Io(err.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::fetch_all;
    use crate::modes::{DialectMode, Direction};
    use tempfile::tempdir;
    use time::{Duration, OffsetDateTime};

    fn seeded(user_id: &str, idx: i64) -> Record {
        Record {
            id: format!("{}-{:03}", user_id, idx),
            user_id: user_id.to_string(),
            input_text: format!("input {}", idx),
            output_text: format!("output {}", idx),
            mode: DialectMode::EnglishBoricua,
            direction: Direction::Forward,
            created_at: OffsetDateTime::UNIX_EPOCH + Duration::minutes(idx),
        }
    }

    async fn store_with(count: i64) -> (tempfile::TempDir, LocalStore) {
        let dir = tempdir().expect("tempdir");
        let store = LocalStore::new(dir.path().join("translations.json"));
        for idx in 0..count {
            store.append(seeded("alice", idx)).await.expect("append");
            store.append(seeded("bob", idx)).await.expect("append");
        }
        (dir, store)
    }

    #[tokio::test]
    async fn empty_store_returns_empty_page() {
        let dir = tempdir().expect("tempdir");
        let store = LocalStore::new(dir.path().join("missing/translations.json"));
        let page = store.page("alice".to_string(), None).await.expect("page");
        assert!(page.records.is_empty());
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn pages_are_newest_first_and_disjoint() {
        let (_dir, store) = store_with(23).await;

        let first = store.page("alice".to_string(), None).await.expect("page");
        assert_eq!(first.records.len(), PAGE_SIZE);
        assert!(first.has_more);
        assert_eq!(first.records[0].id, "alice-022");

        let second = store
            .page("alice".to_string(), first.next_cursor.clone())
            .await
            .expect("page");
        assert_eq!(second.records.len(), PAGE_SIZE);
        assert!(second.has_more);

        let third = store
            .page("alice".to_string(), second.next_cursor.clone())
            .await
            .expect("page");
        assert_eq!(third.records.len(), 3);
        assert!(!third.has_more);
        assert!(third.next_cursor.is_none());

        let all = first
            .records
            .iter()
            .chain(&second.records)
            .chain(&third.records)
            .collect::<Vec<_>>();
        assert_eq!(all.len(), 23);
        for pair in all.windows(2) {
            assert!(pair[0].created_at > pair[1].created_at);
        }
        assert!(all.iter().all(|record| record.user_id == "alice"));
    }

    #[tokio::test]
    async fn exact_page_size_has_no_more() {
        let (_dir, store) = store_with(PAGE_SIZE as i64).await;
        let page = store.page("bob".to_string(), None).await.expect("page");
        assert_eq!(page.records.len(), PAGE_SIZE);
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn save_returns_record_visible_in_next_page() {
        let (_dir, store) = store_with(3).await;
        let saved = store
            .save(NewRecord {
                user_id: "alice".to_string(),
                input_text: "what's up".to_string(),
                output_text: "¿Qué es la que hay?".to_string(),
                mode: DialectMode::EnglishBoricua,
                direction: Direction::Forward,
            })
            .await
            .expect("save");
        let page = store.page("alice".to_string(), None).await.expect("page");
        assert_eq!(page.records[0], saved);
        assert_eq!(fetch_all(&store, "alice").await.expect("all").len(), 4);
    }

    #[tokio::test]
    async fn corrupt_file_is_a_decode_error() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("translations.json");
        fs::write(&path, "{ not json").expect("write");
        let store = LocalStore::new(path);
        let err = store.page("alice".to_string(), None).await.unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
    }
}
