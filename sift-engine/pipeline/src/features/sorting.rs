use anyhow::Result;
use query_builder::{QueryBuilder, SearchResult, SortField, Sorting};

use crate::feature::{Feature, Next};

#[derive(Debug, Clone)]
pub struct SortOption {
    name: String,
    fields: Vec<SortField>,
}

impl SortOption {
    pub fn new(name: impl Into<String>, fields: Vec<SortField>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }
}

/// Applies one of a fixed set of named sort options.
///
/// Unknown or absent selections fall back to the default option. An
/// option without fields leaves the engine's relevance order untouched.
#[derive(Debug, Clone)]
pub struct Sorter {
    param: String,
    default: String,
    options: Vec<SortOption>,
}

impl Sorter {
    pub fn new(default: impl Into<String>) -> Self {
        Self {
            param: Self::default_param(),
            default: default.into(),
            options: vec![],
        }
    }

    #[inline]
    pub fn default_param() -> String {
        "sort".to_string()
    }

    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.param = param.into();
        self
    }

    pub fn with_option(mut self, option: SortOption) -> Self {
        self.options.push(option);
        self
    }

    fn find(&self, name: &str) -> Option<&SortOption> {
        self.options.iter().find(|option| option.name == name)
    }
}

impl Feature for Sorter {
    fn process(&self, query: &mut QueryBuilder, next: Next<'_>) -> Result<SearchResult> {
        let selected = query
            .request()
            .value(&self.param)
            .and_then(|name| self.find(name))
            .or_else(|| self.find(&self.default));

        let selected_name = match selected {
            Some(option) => {
                query.selection().sort = option.fields.clone();
                option.name.clone()
            },
            None => self.default.clone(),
        };

        let mut result = next.run(query)?;
        result.sorting = Some(Sorting {
            selected: selected_name,
            options: self.options.iter().map(|option| option.name.clone()).collect(),
        });

        Ok(result)
    }
}
