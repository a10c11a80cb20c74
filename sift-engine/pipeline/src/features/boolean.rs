use anyhow::Result;
use query_builder::{Aggregation, Clause, QueryBuilder, Request, ResultBucket, SearchResult};
use serde_json::Value;

use super::buckets::{parse_buckets, BucketKey};
use super::process_facet;
use crate::error::UnwrapError;
use crate::feature::{FacetFilter, Feature, Next};

/// Filters a boolean field from a flag parameter such as `in_stock=yes`.
///
/// This facet has no nested form, a nested wrapper skips it.
#[derive(Debug, Clone)]
pub struct BooleanFilter {
    property: String,
    field: String,
}

impl BooleanFilter {
    pub fn new(property: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            field: field.into(),
        }
    }
}

impl FacetFilter for BooleanFilter {
    fn property(&self) -> &str {
        &self.property
    }

    fn build_clause(&self, request: &Request) -> Option<Clause> {
        let flag = request.get(&self.property)?.bool_value()?;
        Some(Clause::term(&self.field, flag))
    }

    fn build_aggregation(&self) -> Aggregation {
        Aggregation::terms(&self.field).with_size(2)
    }

    fn unwrap_result(&self, raw: &Value) -> Result<Vec<ResultBucket>, UnwrapError> {
        parse_buckets(raw, BucketKey::Formatted)
    }
}

impl Feature for BooleanFilter {
    fn process(&self, query: &mut QueryBuilder, next: Next<'_>) -> Result<SearchResult> {
        process_facet(self, false, query, next)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn flag_parameter_becomes_term() {
        let filter = BooleanFilter::new("in_stock", "in_stock");

        let yes = Request::from_pairs(vec![("in_stock", vec!["yes"])]);
        assert_eq!(filter.build_clause(&yes), Some(Clause::term("in_stock", true)));

        let junk = Request::from_pairs(vec![("in_stock", vec!["sometimes"])]);
        assert_eq!(filter.build_clause(&junk), None);
    }

    #[test]
    fn buckets_use_string_keys() -> anyhow::Result<()> {
        let filter = BooleanFilter::new("in_stock", "in_stock");
        let raw = json!({
            "buckets": [ { "key": 1, "key_as_string": "true", "doc_count": 3 } ]
        });

        assert_eq!(filter.unwrap_result(&raw)?, vec![ResultBucket::new("true", 3)]);
        assert!(filter.as_facet().is_none());
        Ok(())
    }
}
