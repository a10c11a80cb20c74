use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::params::Request;

/// A single aggregation entry, a value and the number of hits carrying it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultBucket {
    pub value: Value,

    pub hit_count: u64,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub sub_buckets: BTreeMap<String, Vec<ResultBucket>>,
}

impl ResultBucket {
    pub fn new(value: impl Into<Value>, hit_count: u64) -> Self {
        Self {
            value: value.into(),
            hit_count,
            sub_buckets: BTreeMap::new(),
        }
    }

    pub fn with_sub_buckets(mut self, name: impl Into<String>, buckets: Vec<ResultBucket>) -> Self {
        self.sub_buckets.insert(name.into(), buckets);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub offset: usize,
    pub page_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sorting {
    /// The sort option applied to this search.
    pub selected: String,

    /// Every option the caller can choose from.
    pub options: Vec<String>,
}

/// The caller facing outcome of a search.
///
/// The backend creates the result from the engine's response, after which
/// each feature fills in its own part on the way back up the chain. A
/// feature only ever writes the facet keyed by its own property.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResult {
    /// The total amount of documents matching the search.
    pub total_hit_count: u64,

    /// The retrieved documents.
    pub hits: Vec<Map<String, Value>>,

    /// Facet buckets keyed by facet name.
    pub aggregations: BTreeMap<String, Vec<ResultBucket>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sorting: Option<Sorting>,

    /// The amount of time taken to search in seconds.
    #[serde(rename = "time_taken", serialize_with = "as_secs")]
    pub duration: Duration,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<Request>,

    #[serde(skip)]
    raw_aggregations: Map<String, Value>,
}

impl SearchResult {
    pub fn new(
        total_hit_count: u64,
        hits: Vec<Map<String, Value>>,
        raw_aggregations: Map<String, Value>,
    ) -> Self {
        Self {
            total_hit_count,
            hits,
            raw_aggregations,
            ..Self::default()
        }
    }

    /// The engine's untouched aggregate for the given name.
    #[inline]
    pub fn raw_aggregation(&self, name: &str) -> Option<&Value> {
        self.raw_aggregations.get(name)
    }

    #[inline]
    pub fn raw_aggregations(&self) -> &Map<String, Value> {
        &self.raw_aggregations
    }

    /// Stores the buckets of a facet, replacing earlier ones.
    pub fn set_facet(&mut self, name: impl Into<String>, buckets: Vec<ResultBucket>) {
        self.aggregations.insert(name.into(), buckets);
    }

    #[inline]
    pub fn facet(&self, name: &str) -> Option<&[ResultBucket]> {
        self.aggregations.get(name).map(Vec::as_slice)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

fn as_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f32(duration.as_secs_f32())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn serializes_without_raw_aggregations() -> anyhow::Result<()> {
        let mut raw = Map::new();
        raw.insert("brand".to_string(), json!({ "buckets": [] }));

        let mut result = SearchResult::new(1, vec![Map::new()], raw);
        result.set_facet("brand", vec![ResultBucket::new("acme", 1)]);

        let rendered = serde_json::to_value(&result)?;
        assert_eq!(rendered["total_hit_count"], json!(1));
        assert_eq!(
            rendered["aggregations"]["brand"],
            json!([{ "value": "acme", "hit_count": 1 }])
        );
        assert!(rendered.get("raw_aggregations").is_none());
        assert!(rendered.get("pagination").is_none());
        assert!(result.raw_aggregation("brand").is_some());

        Ok(())
    }
}
