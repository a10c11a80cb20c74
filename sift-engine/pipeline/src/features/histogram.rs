use anyhow::Result;
use query_builder::{Aggregation, Clause, QueryBuilder, Request, ResultBucket, SearchResult};
use serde_json::Value;

use super::buckets::{parse_buckets, BucketKey};
use super::process_facet;
use crate::error::UnwrapError;
use crate::feature::{FacetFilter, Feature, Next};

/// Filters a numeric field by the `<property>.min` / `<property>.max`
/// parameters and buckets the hits in fixed width intervals.
#[derive(Debug, Clone)]
pub struct HistogramFilter {
    property: String,
    field: String,
    interval: f64,
    post_filter: bool,
}

impl HistogramFilter {
    pub fn new(property: impl Into<String>, field: impl Into<String>, interval: f64) -> Self {
        Self {
            property: property.into(),
            field: field.into(),
            interval,
            post_filter: false,
        }
    }

    pub fn disjunctive(mut self, enabled: bool) -> Self {
        self.post_filter = enabled;
        self
    }
}

impl FacetFilter for HistogramFilter {
    fn property(&self) -> &str {
        &self.property
    }

    /// Only bounds that parse as numbers are applied, a range with
    /// neither bound parseable contributes nothing.
    fn build_clause(&self, request: &Request) -> Option<Clause> {
        let param = request.get(&self.property)?;
        let (min, max) = (param.min(), param.max());

        if min.is_none() && max.is_none() {
            return None;
        }

        Some(Clause::Range {
            field: self.field.clone(),
            gte: min.map(Value::from),
            lte: max.map(Value::from),
            format: None,
        })
    }

    fn build_aggregation(&self) -> Aggregation {
        Aggregation::histogram(&self.field, self.interval)
    }

    fn unwrap_result(&self, raw: &Value) -> Result<Vec<ResultBucket>, UnwrapError> {
        parse_buckets(raw, BucketKey::Raw)
    }
}

impl Feature for HistogramFilter {
    fn process(&self, query: &mut QueryBuilder, next: Next<'_>) -> Result<SearchResult> {
        process_facet(self, self.post_filter, query, next)
    }

    fn as_facet(&self) -> Option<&dyn FacetFilter> {
        Some(self)
    }
}
