#[macro_use]
extern crate tracing;

mod backend;
mod chain;
mod endpoint;
mod error;
mod feature;
pub mod features;
mod response;

pub use backend::Backend;
pub use chain::Callchain;
pub use endpoint::{Endpoint, DEFAULT_MAX_BATCH_SIZE};
pub use error::{BatchError, UnwrapError};
pub use feature::{Continuation, FacetFilter, Feature, Next};
pub use features::{
    BooleanFilter,
    ComputedField,
    DateHistogramFilter,
    DynamicFilter,
    FieldSelection,
    FullTextQuery,
    HistogramFilter,
    NestedFilter,
    Paginator,
    SortOption,
    Sorter,
};
pub use response::{MultiRawResponse, RawHit, RawHits, RawResponse, RawTotal};
