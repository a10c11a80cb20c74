use anyhow::{anyhow, Result};
use query_builder::SearchResult;
use serde::Deserialize;
use serde_json::{Map, Value};

/// The engine's `_search` response body.
#[derive(Debug, Default, Deserialize)]
pub struct RawResponse {
    #[serde(default)]
    pub took: u64,

    #[serde(default)]
    pub hits: RawHits,

    #[serde(default)]
    pub aggregations: Map<String, Value>,

    /// Only present on failed items of a multi search.
    #[serde(default)]
    pub error: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawHits {
    #[serde(default)]
    pub total: Option<RawTotal>,

    #[serde(default)]
    pub hits: Vec<RawHit>,
}

/// Older engines report a bare number, newer ones an object.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub enum RawTotal {
    Count(u64),
    Detailed { value: u64 },
}

impl RawTotal {
    #[inline]
    pub fn value(self) -> u64 {
        match self {
            RawTotal::Count(v) => v,
            RawTotal::Detailed { value } => value,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RawHit {
    #[serde(rename = "_source", default)]
    pub source: Map<String, Value>,

    /// Computed fields, each reported as a list of values.
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl RawHit {
    /// Folds computed fields into the source mapping.
    fn into_document(self) -> Map<String, Value> {
        let mut document = self.source;

        for (name, value) in self.fields {
            let value = match value {
                Value::Array(mut values) if values.len() == 1 => values.remove(0),
                other => other,
            };
            document.insert(name, value);
        }

        document
    }
}

impl RawResponse {
    pub fn into_result(self) -> Result<SearchResult> {
        if let Some(error) = self.error {
            return Err(anyhow!("search engine rejected the query: {}", error));
        }

        let total = self.hits.total.map(RawTotal::value).unwrap_or(0);
        let hits = self
            .hits
            .hits
            .into_iter()
            .map(RawHit::into_document)
            .collect();

        Ok(SearchResult::new(total, hits, self.aggregations))
    }
}

/// The engine's `_msearch` response body.
#[derive(Debug, Default, Deserialize)]
pub struct MultiRawResponse {
    #[serde(default)]
    pub responses: Vec<RawResponse>,
}

impl MultiRawResponse {
    pub fn into_results(self) -> Result<Vec<SearchResult>> {
        self.responses
            .into_iter()
            .enumerate()
            .map(|(idx, response)| {
                response
                    .into_result()
                    .map_err(|e| e.context(format!("multi search item {} failed", idx)))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_detailed_total_and_fields() -> Result<()> {
        let raw: RawResponse = serde_json::from_value(json!({
            "took": 3,
            "hits": {
                "total": { "value": 42, "relation": "eq" },
                "hits": [
                    {
                        "_id": "1",
                        "_source": { "title": "Widget" },
                        "fields": { "discounted": [9.0] },
                    }
                ]
            },
            "aggregations": { "brand": { "buckets": [] } }
        }))?;

        let result = raw.into_result()?;
        assert_eq!(result.total_hit_count, 42);
        assert_eq!(result.hits[0]["title"], json!("Widget"));
        assert_eq!(result.hits[0]["discounted"], json!(9.0));
        assert!(result.raw_aggregation("brand").is_some());

        Ok(())
    }

    #[test]
    fn decodes_numeric_total() -> Result<()> {
        let raw: RawResponse = serde_json::from_value(json!({
            "hits": { "total": 5, "hits": [] }
        }))?;

        assert_eq!(raw.into_result()?.total_hit_count, 5);
        Ok(())
    }

    #[test]
    fn multi_search_item_errors_surface() -> Result<()> {
        let raw: MultiRawResponse = serde_json::from_value(json!({
            "responses": [
                { "hits": { "total": 1, "hits": [] } },
                { "error": { "type": "index_not_found_exception" }, "status": 404 }
            ]
        }))?;

        let err = raw.into_results().unwrap_err();
        assert!(format!("{:#}", err).contains("multi search item 1 failed"));

        Ok(())
    }
}
