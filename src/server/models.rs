use serde::{Deserialize, Serialize};

use crate::history::{Page, Record};

#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct TranslateRequest {
    pub(crate) user_id: String,
    pub(crate) text: String,
    pub(crate) mode: Option<String>,
    pub(crate) direction: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct ExplainRequest {
    pub(crate) input: String,
    pub(crate) output: String,
    pub(crate) mode: Option<String>,
    pub(crate) direction: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct HistoriesQuery {
    pub(crate) user_id: String,
    pub(crate) cursor: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct ExportQuery {
    pub(crate) user_id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct TranslateResponse {
    pub(crate) record: Record,
    pub(crate) saved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) warning: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct HistoriesResponse {
    pub(crate) records: Vec<Record>,
    pub(crate) next_cursor: Option<String>,
    pub(crate) has_more: bool,
}

impl From<Page> for HistoriesResponse {
    fn from(page: Page) -> Self {
        Self {
            next_cursor: page.next_cursor.as_ref().map(|cursor| cursor.encode()),
            records: page.records,
            has_more: page.has_more,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}
