use anyhow::Result;
use query_builder::{QueryBuilder, Script, SearchResult};

use crate::feature::{Feature, Next};

/// Adds a field computed by the engine from a script to every hit.
#[derive(Debug, Clone)]
pub struct ComputedField {
    name: String,
    script: Script,
}

impl ComputedField {
    pub fn new(name: impl Into<String>, script: Script) -> Self {
        Self {
            name: name.into(),
            script,
        }
    }
}

impl Feature for ComputedField {
    fn process(&self, query: &mut QueryBuilder, next: Next<'_>) -> Result<SearchResult> {
        query.script_field(&self.name, self.script.clone());
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
    fn registers_script_field() -> Result<()> {
        let features: Vec<Arc<dyn Feature>> = vec![Arc::new(ComputedField::new(
            "discounted",
            Script::new("doc['price'].value * 0.9"),
        ))];

        let chain = Callchain::new(&features, |query: &mut QueryBuilder| {
            let body = query.build();
            assert_eq!(
                body["script_fields"]["discounted"]["script"]["source"],
                "doc['price'].value * 0.9"
            );
            Ok(SearchResult::default())
        });

        chain.run(&mut QueryBuilder::new(Request::new(), vec![]))?;
        Ok(())
    }
}
