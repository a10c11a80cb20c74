use std::sync::Arc;

use anyhow::Result;
use query_builder::{Aggregation, Clause, QueryBuilder, Request, ResultBucket, SearchResult};
use serde_json::Value;

use crate::error::UnwrapError;
use crate::feature::{FacetFilter, Feature, Next};

static FILTER_SUFFIX: &str = "._filter";

/// Wraps facets over fields of nested documents.
///
/// The children's clauses are combined into a single nested query, each
/// child gets its own `nested -> filter -> aggregation` triple and the
/// triples are unwrapped back onto the children's facets once the rest of
/// the chain returns.
///
/// The hit query always requires every active clause. In disjunctive mode
/// each facet's aggregation is filtered by every clause except its own,
/// so a facet keeps listing the values the user could switch to.
///
/// Children without a facet capability are skipped in both phases.
pub struct NestedFilter {
    path: String,
    children: Vec<Arc<dyn Feature>>,
    disjunctive: bool,
}

impl NestedFilter {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            children: vec![],
            disjunctive: false,
        }
    }

    pub fn with_child(self, child: impl Feature + 'static) -> Self {
        self.with_child_arc(Arc::new(child))
    }

    pub fn with_child_arc(mut self, child: Arc<dyn Feature>) -> Self {
        self.children.push(child);
        self
    }

    pub fn disjunctive(mut self, enabled: bool) -> Self {
        self.disjunctive = enabled;
        self
    }

    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[inline]
    pub fn is_disjunctive(&self) -> bool {
        self.disjunctive
    }

    fn facets(&self) -> impl Iterator<Item = &dyn FacetFilter> {
        self.children.iter().filter_map(|child| child.as_facet())
    }

    /// The active clause of every facet keyed by its property, in child order.
    fn active_clauses(&self, request: &Request) -> Vec<(String, Clause)> {
        self.facets()
            .filter_map(|facet| {
                let clause = facet.build_clause(request)?;
                Some((facet.property().to_string(), clause))
            })
            .collect()
    }

    /// The nested hit query, `None` when no child is active.
    pub fn build_query(&self, request: &Request) -> Option<Clause> {
        let clauses: Vec<Clause> = self
            .active_clauses(request)
            .into_iter()
            .map(|(_, clause)| clause)
            .collect();

        if clauses.is_empty() {
            return None;
        }

        Some(Clause::nested(&self.path, Clause::all_of(clauses)))
    }

    /// The clauses restricting the aggregation of the facet `property`.
    pub fn build_filter_must_clauses(
        &self,
        property: &str,
        active: &[(String, Clause)],
    ) -> Vec<Clause> {
        active
            .iter()
            .filter(|(owner, _)| !(self.disjunctive && owner == property))
            .map(|(_, clause)| clause.clone())
            .collect()
    }

    /// One wrapped aggregation per facet child, keyed by its property.
    pub fn build_aggregations(&self, request: &Request) -> Vec<(String, Aggregation)> {
        let active = self.active_clauses(request);

        self.facets()
            .map(|facet| {
                let property = facet.property();
                let filter_must = self.build_filter_must_clauses(property, &active);

                let filtered = Aggregation::filter(Clause::all_of(filter_must))
                    .with_sub_aggregation(property, facet.build_aggregation());
                let wrapped = Aggregation::nested(&self.path)
                    .with_sub_aggregation(filter_name(property), filtered);

                (property.to_string(), wrapped)
            })
            .collect()
    }

    fn unwrap_facet(
        &self,
        facet: &dyn FacetFilter,
        result: &SearchResult,
    ) -> Result<Vec<ResultBucket>, UnwrapError> {
        let property = facet.property();
        let inner = filter_name(property);

        let raw = result
            .raw_aggregation(property)
            .ok_or_else(|| UnwrapError::Missing(property.to_string()))?;
        let filtered = raw.get(&inner).ok_or(UnwrapError::Missing(inner))?;
        let own = filtered
            .get(property)
            .ok_or_else(|| UnwrapError::Missing(property.to_string()))?;

        facet.unwrap_result(own)
    }
}

fn filter_name(property: &str) -> String {
    format!("{}{}", property, FILTER_SUFFIX)
}

impl Feature for NestedFilter {
    fn process(&self, query: &mut QueryBuilder, next: Next<'_>) -> Result<SearchResult> {
        if let Some(clause) = self.build_query(query.request()) {
            debug!(path = %self.path, "nested filter active");
            query.with(clause);
        }

        let aggregations = self.build_aggregations(query.request());
        for (name, aggregation) in aggregations {
            query.aggregation(name, aggregation);
        }

        let mut result = next.run(query)?;

        for facet in self.facets() {
            match self.unwrap_facet(facet, &result) {
                Ok(buckets) => result.set_facet(facet.property(), buckets),
                Err(e) => warn!(
                    path = %self.path,
                    property = facet.property(),
                    error = %e,
                    "omitting nested facet from result",
                ),
            }
        }

        Ok(result)
    }
}
