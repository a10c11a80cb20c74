use std::collections::BTreeMap;
use std::sync::Arc;

use aexecutor::ExecutorPool;
use search_pipeline::Endpoint;

use crate::error::{Result, SiftError};

#[derive(Clone)]
pub struct State {
    pub log_search: bool,
    pub max_batch_size: usize,
    pub endpoints: Arc<BTreeMap<String, Arc<Endpoint>>>,
    pub executor: Arc<ExecutorPool>,
}

impl State {
    pub fn new(
        endpoints: BTreeMap<String, Arc<Endpoint>>,
        executor: ExecutorPool,
        log_search: bool,
        max_batch_size: usize,
    ) -> Self {
        Self {
            log_search,
            max_batch_size,
            endpoints: Arc::new(endpoints),
            executor: Arc::new(executor),
        }
    }

    pub fn endpoint(&self, name: &str) -> Result<Arc<Endpoint>> {
        self.endpoints
            .get(name)
            .cloned()
            .ok_or_else(|| SiftError::UnknownEndpoint(name.to_string()))
    }
}
