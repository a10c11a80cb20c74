use anyhow::Result;
use query_builder::{QueryBuilder, SearchResult};

use crate::feature::{Feature, Next};

/// Restricts which source fields the hits carry.
#[derive(Debug, Clone, Default)]
pub struct FieldSelection {
    includes: Vec<String>,
    excludes: Vec<String>,
}

impl FieldSelection {
    pub fn new(includes: Vec<String>, excludes: Vec<String>) -> Self {
        Self { includes, excludes }
    }
}

impl Feature for FieldSelection {
    fn process(&self, query: &mut QueryBuilder, next: Next<'_>) -> Result<SearchResult> {
        let selection = query.selection();

        for field in self.includes.iter() {
            if !selection.includes.contains(field) {
                selection.includes.push(field.clone());
            }
        }

        for field in self.excludes.iter() {
            if !selection.excludes.contains(field) {
                selection.excludes.push(field.clone());
            }
        }

        next.run(query)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use query_builder::Request;
    use serde_json::{json, Value};

    use super::*;
    use crate::chain::Callchain;

    #[test]
    fn selections_accumulate_without_duplicates() -> Result<()> {
        let features: Vec<Arc<dyn Feature>> = vec![
            Arc::new(FieldSelection::new(vec!["title".to_string()], vec![])),
            Arc::new(FieldSelection::new(
                vec!["title".to_string(), "price".to_string()],
                vec!["internal".to_string()],
            )),
        ];
        let rendered = Mutex::new(Value::Null);

        let chain = Callchain::new(&features, |query: &mut QueryBuilder| {
            *rendered.lock().unwrap() = query.build();
            Ok(SearchResult::default())
        });
        chain.run(&mut QueryBuilder::new(Request::new(), vec![]))?;
        drop(chain);

        let body = rendered.into_inner().unwrap();
        assert_eq!(
            body["_source"],
            json!({ "includes": ["title", "price"], "excludes": ["internal"] })
        );

        Ok(())
    }
}
