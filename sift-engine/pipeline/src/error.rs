use thiserror::Error;

/// A facet's raw aggregate could not be turned into buckets.
///
/// These never fail a search, the facet is left out of the result instead.
#[derive(Debug, Error)]
pub enum UnwrapError {
    #[error("no aggregate named {0:?} in the engine response")]
    Missing(String),

    #[error("unexpected aggregate shape: {0}")]
    Shape(&'static str),
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("backend returned {got} results for a batch of {expected} queries")]
    ResultCountMismatch { expected: usize, got: usize },

    #[error("the batch collector stopped before replying")]
    CollectorGone,

    #[error("batch worker for request {0} panicked")]
    WorkerPanicked(usize),

    #[error("batch execution failed: {0}")]
    Backend(String),
}
