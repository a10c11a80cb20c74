use anyhow::Result;
use query_builder::{Aggregation, Clause, QueryBuilder, Request, ResultBucket, SearchResult};
use serde_json::Value;

use super::buckets::{parse_buckets, BucketKey};
use super::process_facet;
use crate::error::UnwrapError;
use crate::feature::{FacetFilter, Feature, Next};

/// Filters a field by the values of a request parameter and counts the
/// hits per distinct value.
///
/// Several values are combined with OR. When a missing label is
/// configured, that label selects documents without a value: an absent
/// field, an explicit null, an empty list or a list of only nulls.
#[derive(Debug, Clone)]
pub struct DynamicFilter {
    property: String,
    field: String,
    missing_label: Option<String>,
    size: usize,
    post_filter: bool,
}

impl DynamicFilter {
    pub fn new(property: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            field: field.into(),
            missing_label: None,
            size: Self::default_size(),
            post_filter: false,
        }
    }

    #[inline]
    pub fn default_size() -> usize {
        25
    }

    pub fn with_missing_label(mut self, label: impl Into<String>) -> Self {
        self.missing_label = Some(label.into());
        self
    }

    /// The maximum number of buckets returned.
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Applies the filter after aggregation so the facet keeps listing
    /// every value.
    pub fn disjunctive(mut self, enabled: bool) -> Self {
        self.post_filter = enabled;
        self
    }

    #[inline]
    pub fn field(&self) -> &str {
        &self.field
    }

    fn is_missing_label(&self, value: &str) -> bool {
        self.missing_label.as_deref() == Some(value)
    }
}

impl FacetFilter for DynamicFilter {
    fn property(&self) -> &str {
        &self.property
    }

    fn build_clause(&self, request: &Request) -> Option<Clause> {
        let param = request.get(&self.property)?;

        let mut alternatives: Vec<Clause> = Vec::with_capacity(param.values().len());
        for value in param.values() {
            let clause = if self.is_missing_label(value) {
                Clause::missing(&self.field)
            } else {
                Clause::term(&self.field, value.as_str())
            };

            if !alternatives.contains(&clause) {
                alternatives.push(clause);
            }
        }

        Clause::any_of(alternatives)
    }

    fn build_aggregation(&self) -> Aggregation {
        let agg = Aggregation::terms(&self.field).with_size(self.size);

        match self.missing_label.as_deref() {
            Some(label) => agg.with_missing(label),
            None => agg,
        }
    }

    fn unwrap_result(&self, raw: &Value) -> Result<Vec<ResultBucket>, UnwrapError> {
        parse_buckets(raw, BucketKey::Raw)
    }
}

impl Feature for DynamicFilter {
    fn process(&self, query: &mut QueryBuilder, next: Next<'_>) -> Result<SearchResult> {
        process_facet(self, self.post_filter, query, next)
    }

    fn as_facet(&self) -> Option<&dyn FacetFilter> {
        Some(self)
    }
}
