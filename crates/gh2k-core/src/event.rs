//! Feed records and their enriched, flattened form.
//!
//! Every field of a [`RawEvent`] is optional: GitHub omits or nulls fields
//! depending on event type, and a missing field must never stop the
//! pipeline. [`enrich`] is pure apart from reading the wall clock for
//! `ingestion_time`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Partition key used when an event has no type.
pub const FALLBACK_PARTITION_KEY: &str = "UNKNOWN";

/// One record of the public events feed, reduced to the fields we read.
///
/// Decoding never fails on a JSON object: scalar fields of an unexpected
/// type are kept as their JSON text, anything else reads as absent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawEvent {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,

    #[serde(default, rename = "type", deserialize_with = "lenient_string")]
    pub event_type: Option<String>,

    #[serde(default, deserialize_with = "lenient_object")]
    pub repo: Option<RawRepo>,

    #[serde(default, deserialize_with = "lenient_object")]
    pub actor: Option<RawActor>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub created_at: Option<String>,
}

impl RawEvent {
    /// Read one element of the feed array.
    ///
    /// An element that is not an object yields an empty record.
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }
}

/// `repo` object of a feed record.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawRepo {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
}

/// `actor` object of a feed record.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawActor {
    #[serde(default, deserialize_with = "lenient_string")]
    pub login: Option<String>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    })
}

fn lenient_object<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Flattened record written to the stream.
///
/// Absent source fields serialize as JSON `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedEvent {
    pub event_id: Option<String>,
    pub event_type: Option<String>,
    pub repo_name: Option<String>,
    pub actor: Option<String>,
    pub created_at: Option<String>,
    #[serde(serialize_with = "serialize_ingestion_time")]
    pub ingestion_time: DateTime<Utc>,
}

impl EnrichedEvent {
    /// Partition key for this event: its type, or [`FALLBACK_PARTITION_KEY`].
    pub fn partition_key(&self) -> &str {
        self.event_type.as_deref().unwrap_or(FALLBACK_PARTITION_KEY)
    }

    /// `ingestion_time` in its wire format.
    pub fn ingestion_time_rfc3339(&self) -> String {
        format_timestamp(&self.ingestion_time)
    }

    /// JSON payload for the stream record.
    pub fn to_payload(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Enrich a feed record, stamping it with the current time.
pub fn enrich(raw: &RawEvent) -> EnrichedEvent {
    enrich_at(raw, Utc::now())
}

/// Enrich a feed record with an explicit ingestion time.
pub fn enrich_at(raw: &RawEvent, ingestion_time: DateTime<Utc>) -> EnrichedEvent {
    EnrichedEvent {
        event_id: raw.id.clone(),
        event_type: raw.event_type.clone(),
        repo_name: raw.repo.as_ref().and_then(|r| r.name.clone()),
        actor: raw.actor.as_ref().and_then(|a| a.login.clone()),
        created_at: raw.created_at.clone(),
        ingestion_time,
    }
}

/// Fixed-width UTC timestamp (microseconds, `Z` suffix), sortable as text.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn serialize_ingestion_time<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_timestamp(ts))
}
