use anyhow::Result;
use query_builder::{Aggregation, Clause, QueryBuilder, Request, ResultBucket, SearchResult};
use serde_json::Value;

use crate::error::UnwrapError;

/// The remainder of the chain after the current feature.
pub type Continuation<'a> = dyn Fn(&mut QueryBuilder) -> Result<SearchResult> + 'a;

/// A handle to the rest of the chain.
///
/// Running it consumes the handle, so a feature can invoke the rest of
/// the chain at most once.
pub struct Next<'a> {
    continuation: &'a Continuation<'a>,
}

impl<'a> Next<'a> {
    pub fn new(continuation: &'a Continuation<'a>) -> Self {
        Self { continuation }
    }

    /// Hands the builder to the remaining features and the backend,
    /// returning their result.
    #[inline]
    pub fn run(self, query: &mut QueryBuilder) -> Result<SearchResult> {
        (self.continuation)(query)
    }
}

/// A unit of query building and result post processing.
///
/// `process` does its building before running `next` and its result
/// handling after `next` returns. Errors from `next` must be propagated.
///
/// Features are shared between concurrent requests and must not hold
/// mutable per call state.
pub trait Feature: Send + Sync {
    fn process(&self, query: &mut QueryBuilder, next: Next<'_>) -> Result<SearchResult>;

    /// The facet capability of this feature, if it can be nested.
    fn as_facet(&self) -> Option<&dyn FacetFilter> {
        None
    }
}

/// The pure building blocks of a filterable facet.
///
/// None of these touch the builder, this lets wrappers such as
/// [`crate::NestedFilter`] rearrange the pieces themselves.
pub trait FacetFilter: Send + Sync {
    /// The request parameter and aggregation name of this facet.
    fn property(&self) -> &str;

    /// The filter derived from the request, `None` when inactive.
    fn build_clause(&self, request: &Request) -> Option<Clause>;

    fn build_aggregation(&self) -> Aggregation;

    /// Turns the engine's raw aggregate for this facet into buckets.
    fn unwrap_result(&self, raw: &Value) -> Result<Vec<ResultBucket>, UnwrapError>;
}
