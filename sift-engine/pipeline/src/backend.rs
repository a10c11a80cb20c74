use anyhow::Result;
use query_builder::{QueryBuilder, SearchResult};

/// The boundary to the search engine.
///
/// Implementations render the builder, perform the call and decode the
/// engine's response, typically through [`crate::RawResponse`].
pub trait Backend: Send + Sync {
    fn execute(&self, query: &QueryBuilder) -> Result<SearchResult>;

    /// Executes several searches, results correspond positionally to
    /// the given queries.
    ///
    /// Defaults to running them one after another.
    fn execute_multiple(&self, queries: &[QueryBuilder]) -> Result<Vec<SearchResult>> {
        queries.iter().map(|query| self.execute(query)).collect()
    }
}
