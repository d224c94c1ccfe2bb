use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub text: String,
    #[serde(default)]
    pub done: bool,
    /// Creation time in milliseconds since the Unix epoch.
    #[serde(default)]
    pub ts: i64,
}

impl ChecklistItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            done: false,
            ts: now_millis(),
        }
    }
}

/// Ordered list of items; synchronized as a whole, never merged.
pub type Checklist = Vec<ChecklistItem>;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("remote checklist is not a list (found {0})")]
    NotAList(&'static str),
    #[error("remote checklist item {index} is malformed: {source}")]
    InvalidItem {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Decodes a downloaded document into a checklist.
///
/// Anything other than a JSON array of item objects is rejected.
pub fn decode_checklist(value: serde_json::Value) -> Result<Checklist, DataError> {
    let entries = match value {
        serde_json::Value::Array(entries) => entries,
        other => return Err(DataError::NotAList(json_kind(&other))),
    };
    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            serde_json::from_value(entry).map_err(|source| DataError::InvalidItem { index, source })
        })
        .collect()
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

pub(crate) fn now_millis() -> i64 {
    let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
    i64::try_from(nanos / 1_000_000).unwrap_or(i64::MAX)
}
