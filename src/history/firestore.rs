use serde::Deserialize;
use serde_json::{Map, Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, warn};

use super::{Cursor, HistoryStore, NewRecord, PAGE_SIZE, Page, Record, StoreFuture};
use crate::error::{StoreError, upstream_message};
use crate::modes::{DialectMode, Direction};
use crate::providers::{get_env, non_empty};

const BASE_URL: &str = "https://firestore.googleapis.com/v1";

pub(crate) fn resolve_key() -> Option<String> {
    get_env("FIREBASE_API_KEY").or_else(|| non_empty(option_env!("FIREBASE_API_KEY")))
}

/// History kept in a Cloud Firestore collection, accessed through the REST API.
#[derive(Debug, Clone)]
pub struct FirestoreStore {
    project: Option<String>,
    collection: String,
    key: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl FirestoreStore {
    pub fn new(project: Option<String>, collection: String, key: Option<String>) -> Self {
        Self {
            project: project.filter(|value| !value.trim().is_empty()),
            collection,
            key: key.filter(|value| !value.trim().is_empty()),
            base_url: BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn credentials(&self) -> Result<(&str, &str), StoreError> {
        let project = self.project.as_deref().ok_or_else(|| {
            StoreError::Configuration("history.firestore_project is not set".to_string())
        })?;
        let key = self
            .key
            .as_deref()
            .ok_or_else(|| StoreError::Configuration("FIREBASE_API_KEY is not set".to_string()))?;
        Ok((project, key))
    }

    fn database_path(project: &str) -> String {
        format!("projects/{}/databases/(default)/documents", project)
    }

    async fn post(&self, url: &str, key: &str, body: &Value) -> Result<String, StoreError> {
        let response = self
            .client
            .post(url)
            .query(&[("key", key)])
            .json(body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(StoreError::Upstream {
                status: status.as_u16(),
                message: upstream_message(&text),
            });
        }
        Ok(text)
    }
}

impl HistoryStore for FirestoreStore {
    fn save(&self, entry: NewRecord) -> StoreFuture<Record> {
        let store = self.clone();
        Box::pin(async move {
            let (project, key) = store.credentials()?;
            let record = entry.into_optimistic();
            let database = FirestoreStore::database_path(project);
            let name = format!("{}/{}/{}", database, store.collection, record.id);
            let url = format!("{}/{}:commit", store.base_url, database);
            store.post(&url, key, &commit_body(&name, &record)).await?;
            debug!("saved translation {} to firestore", record.id);
            Ok(record)
        })
    }

    fn page(&self, user_id: String, cursor: Option<Cursor>) -> StoreFuture<Page> {
        let store = self.clone();
        Box::pin(async move {
            let (project, key) = store.credentials()?;
            let database = FirestoreStore::database_path(project);
            let url = format!("{}/{}:runQuery", store.base_url, database);
            let collection_path = format!("{}/{}", database, store.collection);
            let body = run_query_body(
                &store.collection,
                &collection_path,
                &user_id,
                cursor.as_ref(),
            );
            let text = store.post(&url, key, &body).await?;
            let records = decode_query_response(&text)?;
            Ok(Page::from_probe(records))
        })
    }
}

fn commit_body(name: &str, record: &Record) -> Value {
    json!({
        "writes": [
            {
                "update": {
                    "name": name,
                    "fields": {
                        "userId": {"stringValue": record.user_id},
                        "inputText": {"stringValue": record.input_text},
                        "outputText": {"stringValue": record.output_text},
                        "mode": {"stringValue": record.mode.as_str()},
                        "direction": {"stringValue": record.direction.as_str()}
                    }
                },
                "updateTransforms": [
                    {"fieldPath": "createdAt", "setToServerValue": "REQUEST_TIME"}
                ],
                "currentDocument": {"exists": false}
            }
        ]
    })
}

fn run_query_body(
    collection: &str,
    collection_path: &str,
    user_id: &str,
    cursor: Option<&Cursor>,
) -> Value {
    let mut query = json!({
        "from": [{"collectionId": collection}],
        "where": {
            "fieldFilter": {
                "field": {"fieldPath": "userId"},
                "op": "EQUAL",
                "value": {"stringValue": user_id}
            }
        },
        "orderBy": [
            {"field": {"fieldPath": "createdAt"}, "direction": "DESCENDING"},
            {"field": {"fieldPath": "__name__"}, "direction": "DESCENDING"}
        ],
        "limit": PAGE_SIZE + 1
    });
    if let Some(cursor) = cursor {
        let timestamp = cursor.created_at.format(&Rfc3339).unwrap_or_default();
        query["startAt"] = json!({
            "values": [
                {"timestampValue": timestamp},
                {"referenceValue": format!("{}/{}", collection_path, cursor.id)}
            ],
            "before": false
        });
    }
    json!({ "structuredQuery": query })
}

#[derive(Debug, Deserialize)]
struct QueryItem {
    document: Option<Document>,
}

#[derive(Debug, Deserialize)]
struct Document {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

fn decode_query_response(body: &str) -> Result<Vec<Record>, StoreError> {
    let items: Vec<QueryItem> = serde_json::from_str(body)?;
    Ok(items
        .into_iter()
        .filter_map(|item| item.document)
        .filter_map(|document| match decode_document(&document) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!("skipping history document {}: {}", document.name, err);
                None
            }
        })
        .collect())
}

fn decode_document(document: &Document) -> Result<Record, StoreError> {
    let id = document
        .name
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| StoreError::Decode("document name has no id".to_string()))?;
    let fields = &document.fields;
    let mode: DialectMode = string_field(fields, "mode")?
        .parse()
        .map_err(|err: anyhow::Error| StoreError::Decode(err.to_string()))?;
    let direction: Direction = match fields.get("direction") {
        Some(_) => string_field(fields, "direction")?
            .parse()
            .map_err(|err: anyhow::Error| StoreError::Decode(err.to_string()))?,
        None => Direction::default(),
    };
    let created_at = fields
        .get("createdAt")
        .and_then(|value| value.get("timestampValue"))
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::Decode("createdAt is missing".to_string()))?;
    let created_at = OffsetDateTime::parse(created_at, &Rfc3339)
        .map_err(|err| StoreError::Decode(format!("createdAt: {}", err)))?;
    Ok(Record {
        id: id.to_string(),
        user_id: string_field(fields, "userId")?,
        input_text: string_field(fields, "inputText")?,
        output_text: string_field(fields, "outputText")?,
        mode,
        direction,
        created_at,
    })
}

fn string_field(fields: &Map<String, Value>, name: &str) -> Result<String, StoreError> {
    fields
        .get(name)
        .and_then(|value| value.get("stringValue"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| StoreError::Decode(format!("{} is missing", name)))
}
