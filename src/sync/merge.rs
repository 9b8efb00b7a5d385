//! DNS Record Merge
//!
//! Combines the primary's local DNS records with the records a replica
//! owns. A record is replica-owned when its text contains any entry of the
//! exclude list; those are kept from the replica, everything else comes
//! from the primary.

use std::borrow::Cow;

use serde_json::Value;

use crate::model::Object;

/// DNS keys holding record lists that are merged rather than overwritten
pub const MERGED_KEYS: [&str; 2] = ["hosts", "cnameRecords"];

/// Merge the record lists of a primary and a replica DNS section.
///
/// For each of [`MERGED_KEYS`] the result holds the primary's records that
/// match no exclude entry, followed by the replica's records that match
/// one. Order within each group is kept. Other keys of the primary section
/// are copied unchanged. Returns `None` when there is no primary section.
pub fn merge_dns_records(
    primary: Option<&Object>,
    replica: Option<&Object>,
    exclude: &[String],
) -> Option<Object> {
    let primary = primary?;
    let mut result = primary.clone();

    for key in MERGED_KEYS {
        let mut records = select_records(primary.get(key), exclude, false);
        if let Some(replica) = replica {
            records.extend(select_records(replica.get(key), exclude, true));
        }
        result.insert(key.to_string(), Value::Array(records));
    }

    Some(result)
}

/// Records of a list value whose exclusion state equals `excluded`.
/// Anything other than a list holds no records.
fn select_records(list: Option<&Value>, exclude: &[String], excluded: bool) -> Vec<Value> {
    match list {
        Some(Value::Array(records)) => records
            .iter()
            .filter(|record| is_excluded(record, exclude) == excluded)
            .cloned()
            .collect(),
        _ => Vec::new(),
    }
}

/// Whether a record's text contains any exclude entry
pub fn is_excluded(record: &Value, exclude: &[String]) -> bool {
    let text = record_text(record);
    exclude.iter().any(|entry| text.contains(entry.as_str()))
}

/// Text form of a record: strings as-is, anything else as JSON
fn record_text(record: &Value) -> Cow<'_, str> {
    match record {
        Value::String(s) => Cow::Borrowed(s),
        other => Cow::Owned(other.to_string()),
    }
}
