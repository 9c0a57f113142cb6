//! The persisted conversation document.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::conversation::{Conversation, Exchange, ToolDescriptor};
use crate::error::RecordError;
use crate::legacy::LegacyDocument;

/// The document version written by this crate.
pub const CURRENT_VERSION: &str = "2.0";

/// The flat, untagged document version, which can still be read.
pub const LEGACY_VERSION: &str = "1.0";

#[derive(Serialize)]
struct DocumentRef<'a> {
    version: &'static str,
    conversation_id: &'a str,
    timestamp: &'a DateTime<Utc>,
    system_prompt: &'a str,
    tool_list: &'a [ToolDescriptor],
    metadata: &'a Map<String, Value>,
    exchanges: &'a [Exchange],
}

#[derive(Deserialize)]
struct Document {
    conversation_id: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    timestamp: DateTime<Utc>,
    #[serde(default)]
    system_prompt: String,
    #[serde(default)]
    tool_list: Vec<ToolDescriptor>,
    #[serde(default, deserialize_with = "deserialize_metadata")]
    metadata: Map<String, Value>,
    exchanges: Vec<Exchange>,
}

impl Conversation {
    /// Converts the conversation into a JSON document.
    ///
    /// Every prompt and response carries an explicit `"type"` tag, so the
    /// document can be losslessly read back with [`Self::from_record`].
    pub fn to_record(&self) -> Result<Value, RecordError> {
        let document = DocumentRef {
            version: CURRENT_VERSION,
            conversation_id: &self.conversation_id,
            timestamp: &self.timestamp,
            system_prompt: &self.system_prompt,
            tool_list: &self.tool_list,
            metadata: &self.metadata,
            exchanges: &self.exchanges,
        };
        Ok(serde_json::to_value(document)?)
    }

    /// Reads a conversation from a JSON document.
    ///
    /// The reader is selected by the top-level `version` field.
    pub fn from_record(record: Value) -> Result<Self, RecordError> {
        let version = match record.get("version") {
            Some(Value::String(version)) => version.clone(),
            Some(other) => return Err(RecordError::UnsupportedVersion(other.to_string())),
            None => return Err(RecordError::MissingVersion),
        };
        match version.as_str() {
            CURRENT_VERSION => {
                let document: Document = serde_json::from_value(record)?;
                Ok(Conversation {
                    conversation_id: document.conversation_id,
                    timestamp: document.timestamp,
                    system_prompt: document.system_prompt,
                    tool_list: document.tool_list,
                    exchanges: document.exchanges,
                    metadata: document.metadata,
                })
            }
            LEGACY_VERSION => {
                let document: LegacyDocument = serde_json::from_value(record)?;
                Ok(document.into_conversation())
            }
            _ => Err(RecordError::UnsupportedVersion(version)),
        }
    }

    /// Serializes the conversation into pretty-printed JSON text.
    #[inline]
    pub fn to_json(&self) -> Result<String, RecordError> {
        Ok(serde_json::to_string_pretty(&self.to_record()?)?)
    }

    /// Parses a conversation from JSON text.
    #[inline]
    pub fn from_json(text: &str) -> Result<Self, RecordError> {
        Self::from_record(serde_json::from_str(text)?)
    }
}

/// Parses an ISO-8601 timestamp.
///
/// Timestamps without an offset are taken as UTC.
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, RecordError> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(text) {
        return Ok(timestamp.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| RecordError::InvalidTimestamp(text.to_owned()))
}

pub(crate) fn deserialize_timestamp<'de, D>(
    deserializer: D,
) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    parse_timestamp(&text).map_err(serde::de::Error::custom)
}

pub(crate) fn deserialize_metadata<'de, D>(
    deserializer: D,
) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    // Older writers emit `null` for empty metadata.
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}
