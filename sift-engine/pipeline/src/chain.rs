use std::sync::Arc;

use anyhow::Result;
use query_builder::{QueryBuilder, SearchResult};

use crate::feature::{Continuation, Feature, Next};

/// A composed chain of features ending in a terminal continuation.
///
/// The first registered feature is the outermost one: it builds first and
/// handles the result last. Chains borrow their features and are built
/// fresh for every request.
pub struct Callchain<'a> {
    entry: Box<Continuation<'a>>,
}

impl<'a> Callchain<'a> {
    pub fn new<T>(features: &'a [Arc<dyn Feature>], terminal: T) -> Self
    where
        T: Fn(&mut QueryBuilder) -> Result<SearchResult> + 'a,
    {
        let mut entry: Box<Continuation<'a>> = Box::new(terminal);

        for feature in features.iter().rev() {
            let next = entry;
            entry = Box::new(move |query: &mut QueryBuilder| {
                feature.process(query, Next::new(&*next))
            });
        }

        Self { entry }
    }

    #[inline]
    pub fn run(&self, query: &mut QueryBuilder) -> Result<SearchResult> {
        (self.entry)(query)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use anyhow::anyhow;
    use query_builder::{Clause, Request};

    use super::*;

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Feature for Recorder {
        fn process(&self, query: &mut QueryBuilder, next: Next<'_>) -> Result<SearchResult> {
            self.log.lock().unwrap().push(format!("build:{}", self.name));
            query.with(Clause::term("seen", self.name));

            let result = next.run(query)?;

            self.log.lock().unwrap().push(format!("handle:{}", self.name));
            Ok(result)
        }
    }

    struct Failing;

    impl Feature for Failing {
        fn process(&self, _query: &mut QueryBuilder, _next: Next<'_>) -> Result<SearchResult> {
            Err(anyhow!("refused"))
        }
    }

    fn recorders(log: &Arc<Mutex<Vec<String>>>) -> Vec<Arc<dyn Feature>> {
        ["f1", "f2", "f3"]
            .into_iter()
            .map(|name| {
                Arc::new(Recorder {
                    name,
                    log: log.clone(),
                }) as Arc<dyn Feature>
            })
            .collect()
    }

    #[test]
    fn builds_in_order_and_handles_in_reverse() -> Result<()> {
        let log = Arc::new(Mutex::new(vec![]));
        let features = recorders(&log);

        let terminal_log = log.clone();
        let chain = Callchain::new(&features, move |query: &mut QueryBuilder| {
            terminal_log.lock().unwrap().push(format!("terminal:{}", query.query().must.len()));
            Ok(SearchResult::default())
        });

        let mut query = QueryBuilder::new(Request::new(), vec![]);
        chain.run(&mut query)?;

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "build:f1",
                "build:f2",
                "build:f3",
                "terminal:3",
                "handle:f3",
                "handle:f2",
                "handle:f1",
            ]
        );

        Ok(())
    }

    #[test]
    fn empty_chain_runs_terminal() -> Result<()> {
        let chain = Callchain::new(&[], |_: &mut QueryBuilder| {
            Ok(SearchResult::new(7, vec![], Default::default()))
        });

        let mut query = QueryBuilder::new(Request::new(), vec![]);
        assert_eq!(chain.run(&mut query)?.total_hit_count, 7);

        Ok(())
    }

    #[test]
    fn errors_short_circuit() {
        let log = Arc::new(Mutex::new(vec![]));
        let mut features = recorders(&log);
        features.insert(1, Arc::new(Failing));

        let chain = Callchain::new(&features, |_: &mut QueryBuilder| {
            panic!("terminal must not be reached")
        });

        let mut query = QueryBuilder::new(Request::new(), vec![]);
        let err = chain.run(&mut query).unwrap_err();

        assert_eq!(err.to_string(), "refused");
        assert_eq!(*log.lock().unwrap(), vec!["build:f1"]);
    }
}
