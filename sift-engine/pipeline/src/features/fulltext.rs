use anyhow::Result;
use query_builder::{Clause, QueryBuilder, SearchResult};

use crate::feature::{Feature, Next};

/// Turns a free text parameter into a scored query.
///
/// The parameter is consumed, features registered later do not see it.
#[derive(Debug, Clone)]
pub struct FullTextQuery {
    param: String,
    fields: Vec<String>,
}

impl FullTextQuery {
    pub fn new(fields: Vec<String>) -> Self {
        Self {
            param: Self::default_param(),
            fields,
        }
    }

    #[inline]
    pub fn default_param() -> String {
        "q".to_string()
    }

    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.param = param.into();
        self
    }
}

impl Feature for FullTextQuery {
    fn process(&self, query: &mut QueryBuilder, next: Next<'_>) -> Result<SearchResult> {
        let text = query
            .request_mut()
            .del(&self.param)
            .and_then(|param| param.value().map(|v| v.trim().to_string()))
            .filter(|text| !text.is_empty());

        if let Some(text) = text {
            debug!(query = %text, "full text query active");
            query.with(Clause::MultiMatch {
                query: text,
                fields: self.fields.clone(),
            });
        }

        next.run(query)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use query_builder::Request;

    use super::*;
    use crate::chain::Callchain;

    #[test]
    fn consumes_parameter() -> Result<()> {
        let features: Vec<Arc<dyn Feature>> =
            vec![Arc::new(FullTextQuery::new(vec!["title^2".to_string(), "body".to_string()]))];

        let chain = Callchain::new(&features, |query: &mut QueryBuilder| {
            assert!(!query.request().contains("q"));
            assert!(query.request().contains("brand"));
            assert_eq!(
                query.query().must,
                vec![Clause::MultiMatch {
                    query: "red shoes".to_string(),
                    fields: vec!["title^2".to_string(), "body".to_string()],
                }]
            );
            Ok(SearchResult::default())
        });

        let request =
            Request::from_pairs(vec![("q", vec!["  red shoes "]), ("brand", vec!["acme"])]);
        let mut query = QueryBuilder::new(request, vec![]);
        chain.run(&mut query)?;

        Ok(())
    }

    #[test]
    fn blank_text_adds_nothing() -> Result<()> {
        let features: Vec<Arc<dyn Feature>> = vec![Arc::new(FullTextQuery::new(vec![]))];

        let chain = Callchain::new(&features, |query: &mut QueryBuilder| {
            assert!(query.query().is_empty());
            Ok(SearchResult::default())
        });

        let request = Request::from_pairs(vec![("q", vec!["   "])]);
        chain.run(&mut QueryBuilder::new(request, vec![]))?;

        Ok(())
    }
}
