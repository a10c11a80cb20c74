mod aggregations;
mod builder;
mod clauses;
mod params;
mod results;
mod selection;

pub use aggregations::{Aggregation, AggregationKind};
pub use builder::QueryBuilder;
pub use clauses::{BoolClause, Clause};
pub use params::{Parameter, Request};
pub use results::{Pagination, ResultBucket, SearchResult, Sorting};
pub use selection::{Script, Selection, SortField, SortOrder};
