use serde_json::Value;

use crate::error::{NdlError, RecordError, Result};
use crate::identifiers::IdentifierKind;
use crate::ndl::ParsedRecord;
use crate::normalize::collect_tags;
use crate::types::{BookRecord, RecordIdentifiers};

/// Subject vocabularies whose headings become tags, in output order.
const SUBJECT_VOCABULARIES: [&str; 3] = ["NDLSH", "NDLC", "NDL10"];

/// Parses the JSON export of a single bibliographic record.
///
/// The outer `Result` fails only for a body that is not JSON at all; a record
/// missing a required key is the inner `Err`.
pub fn parse_export(json: &str) -> Result<ParsedRecord> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| NdlError::Parse(format!("invalid export JSON: {e}")))?;
    Ok(record_from_json(&value))
}

pub fn record_from_json(v: &Value) -> ParsedRecord {
    let title = v
        .get("title")
        .and_then(Value::as_array)
        .and_then(|arr| arr.first())
        .and_then(|t| t.get("value"))
        .and_then(Value::as_str)
        .ok_or(RecordError::MissingField("title"))?
        .to_string();

    let authors = v
        .get("creator")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|item| item.get("name").and_then(Value::as_str))
                .map(ToOwned::to_owned)
                .collect::<Vec<_>>()
        })
        .filter(|names| !names.is_empty())
        .ok_or(RecordError::MissingField("creator"))?;

    let publisher = v
        .get("publisher")
        .and_then(Value::as_array)
        .and_then(|arr| arr.first())
        .and_then(|p| p.get("name"))
        .and_then(Value::as_str)
        .ok_or(RecordError::MissingField("publisher"))?
        .to_string();

    let pubdate = v
        .get("date")
        .and_then(|d| {
            d.as_str()
                .or_else(|| d.as_array().and_then(|arr| arr.first()).and_then(Value::as_str))
        })
        .ok_or(RecordError::MissingField("date"))?
        .to_string();

    let mut identifiers = RecordIdentifiers::default();
    if let Some(ids) = v.get("identifier") {
        for kind in IdentifierKind::ALL {
            let first = ids
                .get(kind.export_key())
                .and_then(Value::as_array)
                .and_then(|arr| arr.first())
                .and_then(Value::as_str)
                .unwrap_or_default();
            identifiers.set(kind, first.to_string());
        }
    }

    let subjects = SUBJECT_VOCABULARIES
        .iter()
        .filter_map(|vocab| v.get("subject")?.get(*vocab)?.as_array())
        .flatten()
        .filter_map(Value::as_str);

    Ok(BookRecord {
        title,
        authors,
        publisher,
        pubdate: Some(pubdate),
        description: String::new(),
        tags: collect_tags(subjects),
        identifiers,
    })
}
