mod boolean;
mod buckets;
mod computed;
mod date;
mod fields;
mod filter;
mod fulltext;
mod histogram;
mod nested;
mod pagination;
mod sorting;

use anyhow::Result;
use query_builder::{QueryBuilder, SearchResult};

pub use self::boolean::BooleanFilter;
pub use self::computed::ComputedField;
pub use self::date::DateHistogramFilter;
pub use self::fields::FieldSelection;
pub use self::filter::DynamicFilter;
pub use self::fulltext::FullTextQuery;
pub use self::histogram::HistogramFilter;
pub use self::nested::NestedFilter;
pub use self::pagination::Paginator;
pub use self::sorting::{SortOption, Sorter};
use crate::error::UnwrapError;
use crate::feature::{FacetFilter, Next};

/// Runs a facet outside of any wrapper.
///
/// The clause restricts the hits directly, or only the post filter when
/// `post_filter` is set so the facet's own aggregation still sees every
/// value on its axis.
pub(crate) fn process_facet(
    facet: &dyn FacetFilter,
    post_filter: bool,
    query: &mut QueryBuilder,
    next: Next<'_>,
) -> Result<SearchResult> {
    let property = facet.property();

    if let Some(clause) = facet.build_clause(query.request()) {
        debug!(property, post_filter, "facet filter active");
        if post_filter {
            query.post_filter_with(clause);
        } else {
            query.with(clause);
        }
    }

    query.aggregation(property, facet.build_aggregation());

    let mut result = next.run(query)?;

    let buckets = result
        .raw_aggregation(property)
        .ok_or_else(|| UnwrapError::Missing(property.to_string()))
        .and_then(|raw| facet.unwrap_result(raw));

    match buckets {
        Ok(buckets) => result.set_facet(property, buckets),
        Err(e) => warn!(property, error = %e, "omitting facet from result"),
    }

    Ok(result)
}
