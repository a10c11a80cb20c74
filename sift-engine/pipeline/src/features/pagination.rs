use anyhow::Result;
use query_builder::{Pagination, QueryBuilder, SearchResult};

use crate::feature::{Feature, Next};

/// Pages through the hits with a 1-based page number and a page size.
#[derive(Debug, Clone)]
pub struct Paginator {
    page_param: String,
    size_param: String,
    default_page_size: usize,
    max_page_size: usize,
}

impl Default for Paginator {
    fn default() -> Self {
        Self {
            page_param: "page".to_string(),
            size_param: "per_page".to_string(),
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

impl Paginator {
    pub fn new(default_page_size: usize, max_page_size: usize) -> Self {
        Self {
            default_page_size,
            max_page_size,
            ..Self::default()
        }
    }

    pub fn with_params(
        mut self,
        page_param: impl Into<String>,
        size_param: impl Into<String>,
    ) -> Self {
        self.page_param = page_param.into();
        self.size_param = size_param.into();
        self
    }

    fn positive(raw: Option<&str>) -> Option<usize> {
        raw?.trim().parse::<usize>().ok().filter(|v| *v > 0)
    }
}

impl Feature for Paginator {
    fn process(&self, query: &mut QueryBuilder, next: Next<'_>) -> Result<SearchResult> {
        let request = query.request();
        let page = Self::positive(request.value(&self.page_param)).unwrap_or(1);
        let page_size = Self::positive(request.value(&self.size_param))
            .unwrap_or(self.default_page_size)
            .min(self.max_page_size);
        let offset = (page - 1).saturating_mul(page_size);

        let selection = query.selection();
        selection.size = Some(page_size);
        selection.from = Some(offset);

        let mut result = next.run(query)?;
        result.pagination = Some(Pagination { offset, page_size });

        Ok(result)
    }
}
