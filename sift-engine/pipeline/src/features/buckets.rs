use std::collections::BTreeMap;

use query_builder::ResultBucket;
use serde_json::{Map, Value};

use crate::error::UnwrapError;

/// Which of a bucket's identifying keys becomes its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BucketKey {
    /// The raw `key`.
    Raw,

    /// `key_as_string` when the engine provides it, used for dates
    /// and booleans.
    Formatted,
}

static BUCKET_FIELDS: &[&str] = &["key", "key_as_string", "doc_count", "from", "to"];

/// Parses an aggregate's buckets.
///
/// Buckets may be a list or a keyed map, bucket level sub aggregations
/// become sub buckets.
pub(crate) fn parse_buckets(raw: &Value, key: BucketKey) -> Result<Vec<ResultBucket>, UnwrapError> {
    let aggregate = raw
        .as_object()
        .ok_or(UnwrapError::Shape("aggregate is not an object"))?;

    match aggregate.get("buckets") {
        Some(Value::Array(buckets)) => buckets
            .iter()
            .map(|bucket| parse_bucket(bucket, None, key))
            .collect(),
        Some(Value::Object(keyed)) => keyed
            .iter()
            .map(|(name, bucket)| parse_bucket(bucket, Some(name), key))
            .collect(),
        Some(_) => Err(UnwrapError::Shape("buckets are neither a list nor a keyed map")),
        None => Err(UnwrapError::Shape("aggregate carries no buckets")),
    }
}

fn parse_bucket(
    raw: &Value,
    keyed_as: Option<&str>,
    key: BucketKey,
) -> Result<ResultBucket, UnwrapError> {
    let bucket = raw
        .as_object()
        .ok_or(UnwrapError::Shape("bucket is not an object"))?;

    let formatted = match key {
        BucketKey::Formatted => bucket.get("key_as_string"),
        BucketKey::Raw => None,
    };

    let value = formatted
        .or_else(|| bucket.get("key"))
        .cloned()
        .or_else(|| keyed_as.map(Value::from))
        .ok_or(UnwrapError::Shape("bucket has no key"))?;

    let hit_count = bucket
        .get("doc_count")
        .and_then(Value::as_u64)
        .ok_or(UnwrapError::Shape("bucket has no document count"))?;

    Ok(ResultBucket {
        value,
        hit_count,
        sub_buckets: parse_sub_buckets(bucket, key)?,
    })
}

fn parse_sub_buckets(
    bucket: &Map<String, Value>,
    key: BucketKey,
) -> Result<BTreeMap<String, Vec<ResultBucket>>, UnwrapError> {
    let mut sub_buckets = BTreeMap::new();

    for (name, child) in bucket {
        if BUCKET_FIELDS.contains(&name.as_str()) {
            continue;
        }

        if child.get("buckets").is_some() {
            sub_buckets.insert(name.clone(), parse_buckets(child, key)?);
        }
    }

    Ok(sub_buckets)
}
