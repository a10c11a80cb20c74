use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Error, Result};
use crossbeam::channel::{self, Receiver, Sender};
use query_builder::{QueryBuilder, Request, SearchResult};

use crate::backend::Backend;
use crate::chain::Callchain;
use crate::error::BatchError;
use crate::feature::Feature;

type Reply = Sender<Result<SearchResult>>;

/// The number of chains of a batch in flight at once by default.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 64;

enum BatchMessage {
    /// A chain reached its terminal continuation and waits for a reply.
    Ready {
        idx: usize,
        query: QueryBuilder,
        reply: Reply,
    },

    /// A chain returned, whether or not it reached the backend.
    Finished { idx: usize },
}

/// Reports a chain as finished even when it unwinds.
struct FinishedGuard<'a> {
    idx: usize,
    tx: &'a Sender<BatchMessage>,
}

impl Drop for FinishedGuard<'_> {
    fn drop(&mut self) {
        let _ = self.tx.send(BatchMessage::Finished { idx: self.idx });
    }
}

/// A fixed set of indices, a backend and the features applied to every
/// search made through it.
///
/// Endpoints hold no per call state and can be shared between threads.
pub struct Endpoint {
    indices: Vec<String>,
    backend: Arc<dyn Backend>,
    features: Vec<Arc<dyn Feature>>,
    max_batch_size: usize,
}

impl Endpoint {
    pub fn new(indices: Vec<String>, backend: Arc<dyn Backend>) -> Self {
        Self {
            indices,
            backend,
            features: vec![],
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }

    /// Caps the number of chains, and worker threads, a batch runs at
    /// once. Larger batches are split into consecutive backend calls.
    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size.max(1);
        self
    }

    /// Appends a feature, features run in the order they are registered.
    pub fn with_feature(mut self, feature: impl Feature + 'static) -> Self {
        self.features.push(Arc::new(feature));
        self
    }

    pub fn register(&mut self, feature: Arc<dyn Feature>) {
        self.features.push(feature);
    }

    #[inline]
    pub fn indices(&self) -> &[String] {
        &self.indices
    }

    #[inline]
    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    #[inline]
    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// Runs a single search through the feature chain.
    #[instrument(name = "endpoint-execute", skip_all, fields(indices = ?self.indices))]
    pub fn execute(&self, request: Request) -> Result<SearchResult> {
        let start = Instant::now();
        let mut query = QueryBuilder::new(request.clone(), self.indices.clone());

        let backend = &self.backend;
        let chain = Callchain::new(&self.features, |query: &mut QueryBuilder| {
            backend.execute(query)
        });

        let mut result = chain.run(&mut query).with_context(|| {
            format!("failed to execute search on indices {:?}", self.indices)
        })?;

        result.request = Some(request);
        result.duration = start.elapsed();
        debug!(
            hits = result.total_hit_count,
            took = ?result.duration,
            "search complete"
        );

        Ok(result)
    }

    /// Runs several searches, handing the engine calls to the backend
    /// in batches.
    ///
    /// Requests are processed in chunks of at most `max_batch_size`. Every
    /// request of a chunk gets its own chain on a scoped worker thread.
    /// Each chain blocks in its terminal continuation until the collector
    /// has gathered every chain that is going to reach the backend, made
    /// the batch call and replied. Results correspond positionally to the
    /// requests, the first failure fails the whole batch.
    #[instrument(
        name = "endpoint-execute-multiple",
        skip_all,
        fields(indices = ?self.indices, requests = requests.len())
    )]
    pub fn execute_multiple(&self, requests: Vec<Request>) -> Result<Vec<SearchResult>> {
        let mut results = Vec::with_capacity(requests.len());
        let mut remaining = requests.into_iter().peekable();

        while remaining.peek().is_some() {
            let chunk: Vec<Request> = remaining.by_ref().take(self.max_batch_size).collect();
            let offset = results.len();
            results.extend(self.execute_chunk(offset, chunk)?);
        }

        Ok(results)
    }

    fn execute_chunk(&self, offset: usize, requests: Vec<Request>) -> Result<Vec<SearchResult>> {
        let total = requests.len();
        let (tx, rx) = channel::unbounded();

        let outcomes = crossbeam::thread::scope(|scope| {
            let handles: Vec<_> = requests
                .into_iter()
                .enumerate()
                .map(|(idx, request)| {
                    let tx = tx.clone();
                    scope.spawn(move |_| self.run_batched(idx, request, tx))
                })
                .collect();

            drop(tx);
            self.collect_batch(total, &rx);

            handles
                .into_iter()
                .enumerate()
                .map(|(idx, handle)| {
                    handle
                        .join()
                        .unwrap_or_else(|_| Err(BatchError::WorkerPanicked(offset + idx).into()))
                })
                .collect::<Vec<_>>()
        })
        .map_err(|_| Error::msg("batch worker scope panicked"))?;

        outcomes
            .into_iter()
            .enumerate()
            .map(|(idx, outcome)| {
                outcome.with_context(|| format!("batch request {} failed", offset + idx))
            })
            .collect()
    }

    fn run_batched(
        &self,
        idx: usize,
        request: Request,
        tx: Sender<BatchMessage>,
    ) -> Result<SearchResult> {
        let start = Instant::now();
        let mut query = QueryBuilder::new(request.clone(), self.indices.clone());

        let submit = |query: &mut QueryBuilder| -> Result<SearchResult> {
            let (reply, response) = channel::bounded(1);
            tx.send(BatchMessage::Ready {
                idx,
                query: query.clone(),
                reply,
            })
            .map_err(|_| BatchError::CollectorGone)?;

            response.recv().map_err(|_| BatchError::CollectorGone)?
        };

        let outcome = {
            let _finished = FinishedGuard { idx, tx: &tx };
            Callchain::new(&self.features, submit).run(&mut query)
        };

        let mut result = outcome.with_context(|| {
            format!("failed to execute search on indices {:?}", self.indices)
        })?;
        result.request = Some(request);
        result.duration = start.elapsed();

        Ok(result)
    }

    /// Gathers the submitted queries, runs them as one backend call and
    /// replies to every waiting chain.
    fn collect_batch(&self, total: usize, rx: &Receiver<BatchMessage>) {
        let mut pending = total;
        let mut submitted = vec![false; total];
        let mut ready: Vec<(usize, QueryBuilder, Reply)> = Vec::with_capacity(total);

        while pending > 0 {
            match rx.recv() {
                Ok(BatchMessage::Ready { idx, query, reply }) => {
                    submitted[idx] = true;
                    ready.push((idx, query, reply));
                    pending -= 1;
                },
                Ok(BatchMessage::Finished { idx }) => {
                    if !submitted[idx] {
                        pending -= 1;
                    }
                },
                Err(_) => break,
            }
        }

        if ready.is_empty() {
            return;
        }

        ready.sort_by_key(|(idx, _, _)| *idx);
        let (queries, replies): (Vec<QueryBuilder>, Vec<Reply>) =
            ready.into_iter().map(|(_, query, reply)| (query, reply)).unzip();

        debug!(queries = queries.len(), "executing search batch");
        match self.backend.execute_multiple(&queries) {
            Ok(results) if results.len() == queries.len() => {
                for (reply, result) in replies.iter().zip(results) {
                    let _ = reply.send(Ok(result));
                }
            },
            Ok(results) => {
                let got = results.len();
                for reply in replies.iter() {
                    let _ = reply.send(Err(BatchError::ResultCountMismatch {
                        expected: queries.len(),
                        got,
                    }
                    .into()));
                }
            },
            Err(e) => {
                let message = format!("{:#}", e);
                for reply in replies.iter() {
                    let _ = reply.send(Err(BatchError::Backend(message.clone()).into()));
                }
            },
        }
    }
}
